use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Quantity below which a warehouse stock event triggers a low stock warning.
const LOW_STOCK_WARNING: i32 = 10;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging a channel failure instead of propagating it.
    /// Used after a transaction commits, where the work itself already succeeded.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Failed to publish event: {}", e);
        }
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeleted(Uuid),
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),

    // Warehouse stock events
    WarehouseStockAdded {
        stock_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    WarehouseStockAdjusted {
        stock_id: Uuid,
        product_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },
    WarehouseStockDeleted(Uuid),

    // Distributor account events
    DistributorRegistered(Uuid),
    DistributorUpdated(Uuid),
    DistributorDeleted(Uuid),

    // Order lifecycle events
    OrderPlaced {
        order_id: Uuid,
        distributor_id: Uuid,
        item_count: usize,
    },
    OrderUpdated(Uuid),
    OrderCancelled(Uuid),
    OrderAccepted {
        order_id: Uuid,
        distributor_id: Uuid,
    },
    OrderRejected {
        order_id: Uuid,
        distributor_id: Uuid,
        reason: Option<String>,
    },
    /// Emitted once per accepted order after warehouse stock moved to the distributor.
    StockTransferred {
        order_id: Uuid,
        distributor_id: Uuid,
        line_count: usize,
        total_units: i32,
    },

    // Sale events
    SaleRecorded {
        sale_id: Uuid,
        distributor_id: Uuid,
        quantity: i32,
    },
    SaleUpdated {
        sale_id: Uuid,
        quantity_delta: i32,
    },
    SaleDeleted {
        sale_id: Uuid,
        restocked_quantity: i32,
    },

    // Return events
    ReturnSubmitted {
        return_id: Uuid,
        distributor_id: Uuid,
        quantity: i32,
    },
    ReturnApproved(Uuid),
    ReturnRejected(Uuid),

    // Messaging events
    MessagePosted {
        message_id: Uuid,
        order_id: Option<Uuid>,
        sender: String,
    },

    /// Generic event data
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
        }
    }
}

// Function to process incoming events. Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        match event {
            Event::OrderPlaced {
                order_id,
                distributor_id,
                item_count,
            } => {
                if let Err(e) = handle_order_placed(order_id, distributor_id, item_count).await {
                    error!(
                        "Failed to handle order placed event: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::OrderAccepted {
                order_id,
                distributor_id,
            } => {
                info!(
                    "Order {} accepted for distributor {}",
                    order_id, distributor_id
                );
            }
            Event::OrderRejected {
                order_id,
                distributor_id,
                reason,
            } => {
                info!(
                    "Order {} rejected for distributor {} (reason: {})",
                    order_id,
                    distributor_id,
                    reason.as_deref().unwrap_or("unspecified")
                );
            }
            Event::StockTransferred {
                order_id,
                distributor_id,
                line_count,
                total_units,
            } => {
                if let Err(e) =
                    handle_stock_transferred(order_id, distributor_id, line_count, total_units)
                        .await
                {
                    error!(
                        "Failed to handle stock transfer event: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::WarehouseStockAdjusted {
                stock_id,
                product_id,
                old_quantity,
                new_quantity,
            } => {
                if let Err(e) =
                    handle_warehouse_adjustment(stock_id, product_id, old_quantity, new_quantity)
                        .await
                {
                    error!(
                        "Failed to handle warehouse adjustment: product_id={}, error={}",
                        product_id, e
                    );
                }
            }
            Event::SaleRecorded {
                sale_id,
                distributor_id,
                quantity,
            } => {
                info!(
                    "Sale {} recorded by distributor {} for {} units",
                    sale_id, distributor_id, quantity
                );
            }
            Event::ReturnSubmitted {
                return_id,
                distributor_id,
                quantity,
            } => {
                info!(
                    "Return {} submitted by distributor {} for {} units",
                    return_id, distributor_id, quantity
                );
            }
            Event::ReturnApproved(return_id) => {
                info!("Return {} approved and restocked", return_id);
            }
            Event::ReturnRejected(return_id) => {
                info!("Return {} rejected, stock restored to distributor", return_id);
            }
            // Remaining events only need the generic log line above
            _ => {
                info!("No specific handler for event: {:?}", event);
            }
        }
    }

    warn!("Event processing loop has ended");
}

// Handler functions for specific events
async fn handle_order_placed(
    order_id: Uuid,
    distributor_id: Uuid,
    item_count: usize,
) -> Result<(), String> {
    // An order awaiting review is the admin's cue to check warehouse availability
    info!(
        "Order {} with {} line(s) placed by distributor {} and awaiting review",
        order_id, item_count, distributor_id
    );
    Ok(())
}

async fn handle_stock_transferred(
    order_id: Uuid,
    distributor_id: Uuid,
    line_count: usize,
    total_units: i32,
) -> Result<(), String> {
    info!(
        "Transferred {} unit(s) across {} line(s) to distributor {} for order {}",
        total_units, line_count, distributor_id, order_id
    );
    Ok(())
}

async fn handle_warehouse_adjustment(
    stock_id: Uuid,
    product_id: Uuid,
    old_quantity: i32,
    new_quantity: i32,
) -> Result<(), String> {
    info!(
        "Warehouse stock {} for product {} moved from {} to {}",
        stock_id, product_id, old_quantity, new_quantity
    );

    if new_quantity < LOW_STOCK_WARNING {
        warn!(
            "Low warehouse stock: product {} has only {} units remaining",
            product_id, new_quantity
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_sender_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        let order_id = Uuid::new_v4();
        sender
            .send(Event::OrderCancelled(order_id))
            .await
            .expect("send should succeed while receiver is alive");

        match rx.recv().await {
            Some(Event::OrderCancelled(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn event_sender_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::with_data("orphan".into())).await;
        assert!(result.is_err());
    }

    #[test]
    fn generic_event_carries_message() {
        let event = Event::with_data("inventory sweep".into());
        match event {
            Event::Generic { message, .. } => assert_eq!(message, "inventory sweep"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
