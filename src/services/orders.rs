use crate::{
    entities::{category, distributor, message, order, order_item, product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{distributor_stock::credit_stock, warehouse_stock::take_stock},
};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle of an order. Stored as a lowercase string on the row.
///
/// `pending` orders belong to the distributor: they can still be edited or
/// cancelled. A decision moves them to `accepted` or `rejected`; only a
/// rejected order can be reopened, because acceptance moves stock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, utoipa::ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

/// What the warehouse decides about a pending order. `pending` reopens a
/// rejected order for another review round.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, utoipa::ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderDecisionAction {
    Accept,
    Reject,
    Pending,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub product_id: Uuid,
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Quantity must be between 1 and 1,000,000"
    ))]
    pub quantity: i32,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateOrderInput {
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Quantity must be between 1 and 1,000,000"
    ))]
    pub quantity: i32,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderDecisionInput {
    pub action: OrderDecisionAction,
    /// Optional approved quantity. Only meaningful for an accept, and only
    /// downwards from what was requested.
    #[validate(range(min = 1, message = "Approved quantity must be at least 1"))]
    pub quantity: Option<i32>,
    #[validate(length(max = 1000, message = "Reason cannot exceed 1000 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub distributor_id: Option<Uuid>,
}

/// An order with its line items and conversation, as returned by detail
/// endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub messages: Vec<message::Model>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Human-facing order references look like `ORD-7K2F9QXZ`.
fn generate_order_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("ORD-{}", suffix.to_ascii_uppercase())
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Picks an order number not already taken. The space is large enough
    /// that one retry is already rare.
    async fn unique_order_number(&self) -> Result<String, ServiceError> {
        for _ in 0..5 {
            let candidate = generate_order_number();
            let taken = order::Entity::find()
                .filter(order::Column::OrderNumber.eq(candidate.clone()))
                .count(&*self.db)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
            warn!("Order number collision on {}, retrying", candidate);
        }
        Err(ServiceError::InternalError(
            "Could not allocate a unique order number".to_string(),
        ))
    }

    /// Places a pending order for one product. Pricing is snapshotted from
    /// the catalog at this moment; later catalog edits do not touch it.
    #[instrument(skip(self, input))]
    pub async fn create_order(
        &self,
        distributor_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<OrderDetail, ServiceError> {
        input.validate()?;

        let product = product::Entity::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;
        if !product.active {
            return Err(ServiceError::InvalidOperation(format!(
                "Product '{}' is no longer available for ordering",
                product.name
            )));
        }
        let category = category::Entity::find_by_id(product.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", product.category_id))
            })?;

        let order_number = self.unique_order_number().await?;
        let subtotal = product.unit_price * Decimal::from(input.quantity);
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number),
            distributor_id: Set(distributor_id),
            status: Set(OrderStatus::Pending.to_string()),
            total_amount: Set(subtotal),
            requested_quantity: Set(input.quantity),
            approved_quantity: Set(None),
            approved_total: Set(None),
            notes: Set(input.notes.clone()),
            decided_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        };
        let order = order_model.insert(&txn).await?;

        let item_model = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            category_name: Set(category.name),
            variant_size: Set(product.variant_size.clone()),
            unit_price: Set(product.unit_price),
            quantity: Set(input.quantity),
            subtotal: Set(subtotal),
            created_at: Set(now),
            ..Default::default()
        };
        let item = item_model.insert(&txn).await?;

        txn.commit().await?;

        info!(
            "Order {} placed by distributor {} for {} x {}",
            order.order_number, distributor_id, input.quantity, product.name
        );
        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id: order.id,
                distributor_id,
                item_count: 1,
            })
            .await;

        Ok(OrderDetail {
            order,
            items: vec![item],
            messages: Vec::new(),
        })
    }

    /// Lists orders, newest first. A distributor scope restricts the listing
    /// to that distributor regardless of the filter.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        scope: Option<Uuid>,
        filter: OrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let mut query = order::Entity::find().order_by_desc(order::Column::CreatedAt);

        if let Some(distributor_id) = scope.or(filter.distributor_id) {
            query = query.filter(order::Column::DistributorId.eq(distributor_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Loads one order with items and messages. A scoped lookup hides other
    /// distributors' orders behind a not-found answer.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<OrderDetail, ServiceError> {
        let order = self.load_scoped(order_id, scope).await?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let messages = message::Entity::find()
            .filter(message::Column::OrderId.eq(order.id))
            .order_by_asc(message::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(OrderDetail {
            order,
            items,
            messages,
        })
    }

    /// Changes the requested quantity of a pending order. Line pricing stays
    /// at the snapshot taken when the order was placed.
    #[instrument(skip(self, input))]
    pub async fn update_order(
        &self,
        distributor_id: Uuid,
        order_id: Uuid,
        input: UpdateOrderInput,
    ) -> Result<OrderDetail, ServiceError> {
        input.validate()?;

        let order = self.load_scoped(order_id, Some(distributor_id)).await?;
        self.ensure_pending(&order, "edited")?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;
        let item = items.into_iter().next().ok_or_else(|| {
            ServiceError::InternalError(format!("Order {} has no line item", order.id))
        })?;

        let new_subtotal = item.unit_price * Decimal::from(input.quantity);

        let txn = self.db.begin().await?;

        let mut item_model: order_item::ActiveModel = item.into();
        item_model.quantity = Set(input.quantity);
        item_model.subtotal = Set(new_subtotal);
        let item = item_model.update(&txn).await?;

        let mut order_model: order::ActiveModel = order.into();
        order_model.requested_quantity = Set(input.quantity);
        order_model.total_amount = Set(new_subtotal);
        if let Some(notes) = input.notes.clone() {
            order_model.notes = Set(Some(notes));
        }
        let order = order_model.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Order {} updated by distributor {}: quantity now {}",
            order.order_number, distributor_id, input.quantity
        );
        self.event_sender
            .send_or_log(Event::OrderUpdated(order.id))
            .await;

        Ok(OrderDetail {
            order,
            items: vec![item],
            messages: Vec::new(),
        })
    }

    /// Withdraws a pending order. Decided orders cannot be cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        distributor_id: Uuid,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self.load_scoped(order_id, Some(distributor_id)).await?;
        self.ensure_pending(&order, "cancelled")?;

        let mut model: order::ActiveModel = order.into();
        model.status = Set(OrderStatus::Cancelled.to_string());
        let order = model.update(&*self.db).await?;

        info!(
            "Order {} cancelled by distributor {}",
            order.order_number, distributor_id
        );
        self.event_sender
            .send_or_log(Event::OrderCancelled(order.id))
            .await;
        Ok(order)
    }

    /// Applies a warehouse decision to an order.
    ///
    /// Accepting is one transaction: warehouse stock is decremented, the
    /// distributor's stock is credited, the order and its line are updated
    /// and an accept notice is written. If any step fails, none of it
    /// happened. Rejecting records the reason; moving a rejected order back
    /// to pending clears the decision.
    #[instrument(skip(self, input))]
    pub async fn decide_order(
        &self,
        admin_id: Uuid,
        order_id: Uuid,
        input: OrderDecisionInput,
    ) -> Result<OrderDetail, ServiceError> {
        input.validate()?;

        let order = self.load_scoped(order_id, None).await?;

        match input.action {
            OrderDecisionAction::Accept => self.accept_order(admin_id, order, input).await,
            OrderDecisionAction::Reject => self.reject_order(admin_id, order, input).await,
            OrderDecisionAction::Pending => self.reopen_order(admin_id, order).await,
        }
    }

    async fn accept_order(
        &self,
        admin_id: Uuid,
        order: order::Model,
        input: OrderDecisionInput,
    ) -> Result<OrderDetail, ServiceError> {
        self.ensure_pending(&order, "accepted")?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::InternalError(format!(
                "Order {} has no line item",
                order.id
            )));
        }

        if let Some(quantity) = input.quantity {
            if items.len() > 1 {
                return Err(ServiceError::InvalidOperation(
                    "A quantity override only applies to single-line orders".to_string(),
                ));
            }
            if quantity > order.requested_quantity {
                return Err(ServiceError::ValidationError(format!(
                    "Approved quantity {} exceeds the requested {}",
                    quantity, order.requested_quantity
                )));
            }
        }

        let distributor_id = order.distributor_id;
        let order_number = order.order_number.clone();
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let mut approved_units: i32 = 0;
        let mut approved_total = Decimal::ZERO;
        let mut updated_items = Vec::with_capacity(items.len());

        for item in items {
            let quantity = input.quantity.unwrap_or(item.quantity);

            take_stock(&txn, item.product_id, &item.variant_size, quantity).await?;
            credit_stock(
                &txn,
                distributor_id,
                item.product_id,
                &item.variant_size,
                quantity,
                item.unit_price,
            )
            .await?;

            let subtotal = item.unit_price * Decimal::from(quantity);
            approved_units += quantity;
            approved_total += subtotal;

            let mut item_model: order_item::ActiveModel = item.into();
            item_model.quantity = Set(quantity);
            item_model.subtotal = Set(subtotal);
            updated_items.push(item_model.update(&txn).await?);
        }

        let mut order_model: order::ActiveModel = order.into();
        order_model.status = Set(OrderStatus::Accepted.to_string());
        order_model.approved_quantity = Set(Some(approved_units));
        order_model.approved_total = Set(Some(approved_total));
        order_model.decided_at = Set(Some(now));
        let order = order_model.update(&txn).await?;

        let mut body = format!(
            "Order {} accepted: {} unit(s) transferred to your stock.",
            order_number, approved_units
        );
        if let Some(reason) = input.reason.as_deref().filter(|r| !r.trim().is_empty()) {
            body.push_str(&format!(" {}", reason.trim()));
        }
        let notice = self
            .write_notice(&txn, &order, admin_id, super::messages::MessageType::Accept, body)
            .await?;

        txn.commit().await?;

        info!(
            "Order {} accepted by admin {}: {} unit(s) to distributor {}",
            order.order_number, admin_id, approved_units, distributor_id
        );
        self.event_sender
            .send_or_log(Event::OrderAccepted {
                order_id: order.id,
                distributor_id,
            })
            .await;
        self.event_sender
            .send_or_log(Event::StockTransferred {
                order_id: order.id,
                distributor_id,
                line_count: updated_items.len(),
                total_units: approved_units,
            })
            .await;

        Ok(OrderDetail {
            order,
            items: updated_items,
            messages: vec![notice],
        })
    }

    async fn reject_order(
        &self,
        admin_id: Uuid,
        order: order::Model,
        input: OrderDecisionInput,
    ) -> Result<OrderDetail, ServiceError> {
        self.ensure_pending(&order, "rejected")?;

        let distributor_id = order.distributor_id;
        let order_number = order.order_number.clone();
        let reason = input
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let txn = self.db.begin().await?;

        let mut order_model: order::ActiveModel = order.into();
        order_model.status = Set(OrderStatus::Rejected.to_string());
        order_model.decided_at = Set(Some(Utc::now()));
        let order = order_model.update(&txn).await?;

        let body = match &reason {
            Some(reason) => format!("Order {} rejected. Reason: {}", order_number, reason),
            None => format!("Order {} rejected.", order_number),
        };
        let notice = self
            .write_notice(&txn, &order, admin_id, super::messages::MessageType::Reject, body)
            .await?;

        txn.commit().await?;

        info!(
            "Order {} rejected by admin {} (reason: {})",
            order.order_number,
            admin_id,
            reason.as_deref().unwrap_or("unspecified")
        );
        self.event_sender
            .send_or_log(Event::OrderRejected {
                order_id: order.id,
                distributor_id,
                reason,
            })
            .await;

        Ok(OrderDetail {
            order,
            items: Vec::new(),
            messages: vec![notice],
        })
    }

    /// Reopens a rejected order for another look. An accepted order cannot
    /// come back because its stock has already been transferred.
    async fn reopen_order(
        &self,
        admin_id: Uuid,
        order: order::Model,
    ) -> Result<OrderDetail, ServiceError> {
        match self.status_of(&order)? {
            OrderStatus::Rejected => {}
            OrderStatus::Accepted => {
                return Err(ServiceError::InvalidOperation(format!(
                    "Order {} cannot return to pending: its stock has already been transferred",
                    order.order_number
                )))
            }
            status => {
                return Err(ServiceError::InvalidOperation(format!(
                    "Only rejected orders can return to pending, order {} is {}",
                    order.order_number, status
                )))
            }
        }

        let order_number = order.order_number.clone();

        let txn = self.db.begin().await?;

        let mut order_model: order::ActiveModel = order.into();
        order_model.status = Set(OrderStatus::Pending.to_string());
        order_model.decided_at = Set(None);
        order_model.approved_quantity = Set(None);
        order_model.approved_total = Set(None);
        let order = order_model.update(&txn).await?;

        let body = format!("Order {} moved back to pending review.", order_number);
        let notice = self
            .write_notice(&txn, &order, admin_id, super::messages::MessageType::Info, body)
            .await?;

        txn.commit().await?;

        info!(
            "Order {} reopened by admin {}",
            order.order_number, admin_id
        );
        self.event_sender
            .send_or_log(Event::OrderUpdated(order.id))
            .await;

        Ok(OrderDetail {
            order,
            items: Vec::new(),
            messages: vec![notice],
        })
    }

    /// Admin view across distributors with reference data for each order.
    #[instrument(skip(self))]
    pub async fn list_orders_with_distributor(
        &self,
        filter: OrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<(order::Model, Option<distributor::Model>)>, u64), ServiceError> {
        let mut query = order::Entity::find()
            .find_also_related(distributor::Entity)
            .order_by_desc(order::Column::CreatedAt);

        if let Some(distributor_id) = filter.distributor_id {
            query = query.filter(order::Column::DistributorId.eq(distributor_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }

    async fn load_scoped(
        &self,
        order_id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if let Some(distributor_id) = scope {
            if order.distributor_id != distributor_id {
                return Err(ServiceError::NotFound(format!(
                    "Order {} not found",
                    order_id
                )));
            }
        }
        Ok(order)
    }

    fn status_of(&self, order: &order::Model) -> Result<OrderStatus, ServiceError> {
        order
            .status
            .parse()
            .map_err(|_| ServiceError::InvalidStatus(format!("Unknown status '{}'", order.status)))
    }

    fn ensure_pending(&self, order: &order::Model, verb: &str) -> Result<(), ServiceError> {
        let status = self.status_of(order)?;
        if status != OrderStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Only pending orders can be {}, order {} is {}",
                verb, order.order_number, status
            )));
        }
        Ok(())
    }

    async fn write_notice<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        order: &order::Model,
        admin_id: Uuid,
        message_type: super::messages::MessageType,
        body: String,
    ) -> Result<message::Model, ServiceError> {
        let model = message::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            distributor_id: Set(order.distributor_id),
            admin_id: Set(Some(admin_id)),
            body: Set(body),
            message_type: Set(message_type.to_string()),
            sender: Set(super::messages::MessageSender::Admin.to_string()),
            is_read: Set(false),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(conn).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_carry_the_prefix_and_length() {
        for _ in 0..20 {
            let number = generate_order_number();
            assert!(number.starts_with("ORD-"));
            assert_eq!(number.len(), 12);
            assert!(number[4..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn statuses_round_trip_through_strings() {
        assert_eq!(OrderStatus::Pending.to_string(), "pending");
        assert_eq!(OrderStatus::Accepted.to_string(), "accepted");
        assert_eq!("rejected".parse::<OrderStatus>(), Ok(OrderStatus::Rejected));
        assert_eq!(
            "cancelled".parse::<OrderStatus>(),
            Ok(OrderStatus::Cancelled)
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn decision_actions_parse_from_lowercase() {
        assert_eq!(
            "accept".parse::<OrderDecisionAction>(),
            Ok(OrderDecisionAction::Accept)
        );
        assert_eq!(
            "reject".parse::<OrderDecisionAction>(),
            Ok(OrderDecisionAction::Reject)
        );
        assert_eq!(
            "pending".parse::<OrderDecisionAction>(),
            Ok(OrderDecisionAction::Pending)
        );
        assert!("approve".parse::<OrderDecisionAction>().is_err());
    }

    #[test]
    fn quantity_overrides_are_validated() {
        let input = OrderDecisionInput {
            action: OrderDecisionAction::Accept,
            quantity: Some(0),
            reason: None,
        };
        assert!(input.validate().is_err());

        let input = OrderDecisionInput {
            action: OrderDecisionAction::Accept,
            quantity: Some(25),
            reason: None,
        };
        assert!(input.validate().is_ok());
    }
}
