use crate::{
    entities::{distributor_stock, product, stock_return},
    errors::ServiceError,
    events::{Event, EventSender},
    services::warehouse_stock::put_stock,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Stored as a lowercase string on the row. Pending returns hold their
/// quantity in limbo until the warehouse decides.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, utoipa::ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, utoipa::ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReturnDecisionAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReturnInput {
    pub stock_id: Uuid,
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Quantity must be between 1 and 1,000,000"
    ))]
    pub quantity: i32,
    #[validate(length(
        min = 1,
        max = 1000,
        message = "A reason between 1 and 1000 characters is required"
    ))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReturnDecisionInput {
    pub action: ReturnDecisionAction,
    #[validate(length(max = 1000, message = "Note cannot exceed 1000 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReturnFilter {
    pub status: Option<ReturnStatus>,
    pub distributor_id: Option<Uuid>,
}

/// A return joined with its product for display.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnRow {
    #[serde(flatten)]
    pub stock_return: stock_return::Model,
    pub product_name: Option<String>,
}

#[derive(Clone)]
pub struct ReturnService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ReturnService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Files a return request. The quantity leaves the distributor's stock
    /// row in the same transaction, so it can no longer be sold while the
    /// request is pending.
    #[instrument(skip(self, input))]
    pub async fn create_return(
        &self,
        distributor_id: Uuid,
        input: CreateReturnInput,
    ) -> Result<stock_return::Model, ServiceError> {
        input.validate()?;

        let stock = distributor_stock::Entity::find_by_id(input.stock_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Stock row {} not found", input.stock_id))
            })?;
        if stock.distributor_id != distributor_id {
            return Err(ServiceError::NotFound(format!(
                "Stock row {} not found",
                input.stock_id
            )));
        }
        if stock.quantity < input.quantity {
            return Err(ServiceError::insufficient_stock(
                stock.quantity,
                input.quantity,
            ));
        }

        let remaining = stock.quantity - input.quantity;
        let txn = self.db.begin().await?;

        let mut stock_model: distributor_stock::ActiveModel = stock.clone().into();
        stock_model.quantity = Set(remaining);
        stock_model.last_updated = Set(Utc::now());
        stock_model.update(&txn).await?;

        let return_model = stock_return::ActiveModel {
            id: Set(Uuid::new_v4()),
            distributor_id: Set(distributor_id),
            stock_id: Set(stock.id),
            product_id: Set(stock.product_id),
            variant_size: Set(stock.variant_size.clone()),
            quantity_returned: Set(input.quantity),
            reason: Set(input.reason.trim().to_string()),
            status: Set(ReturnStatus::Pending.to_string()),
            decision_note: Set(None),
            decided_at: Set(None),
            ..Default::default()
        };
        let stock_return = return_model.insert(&txn).await?;

        txn.commit().await?;

        info!(
            "Return {} filed by distributor {}: {} unit(s) of product {}",
            stock_return.id, distributor_id, input.quantity, stock.product_id
        );
        self.event_sender
            .send_or_log(Event::ReturnSubmitted {
                return_id: stock_return.id,
                distributor_id,
                quantity: input.quantity,
            })
            .await;
        Ok(stock_return)
    }

    /// Lists returns, newest first. A distributor scope restricts the listing
    /// to that distributor regardless of the filter.
    #[instrument(skip(self))]
    pub async fn list_returns(
        &self,
        scope: Option<Uuid>,
        filter: ReturnFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ReturnRow>, u64), ServiceError> {
        let mut query = stock_return::Entity::find()
            .find_also_related(product::Entity)
            .order_by_desc(stock_return::Column::CreatedAt);

        if let Some(distributor_id) = scope.or(filter.distributor_id) {
            query = query.filter(stock_return::Column::DistributorId.eq(distributor_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(stock_return::Column::Status.eq(status.to_string()));
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await?
            .into_iter()
            .map(|(stock_return, product)| ReturnRow {
                stock_return,
                product_name: product.map(|p| p.name),
            })
            .collect();
        Ok((rows, total))
    }

    #[instrument(skip(self))]
    pub async fn get_return(
        &self,
        return_id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<ReturnRow, ServiceError> {
        let (stock_return, product) = stock_return::Entity::find_by_id(return_id)
            .find_also_related(product::Entity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", return_id)))?;

        if let Some(distributor_id) = scope {
            if stock_return.distributor_id != distributor_id {
                return Err(ServiceError::NotFound(format!(
                    "Return {} not found",
                    return_id
                )));
            }
        }

        Ok(ReturnRow {
            stock_return,
            product_name: product.map(|p| p.name),
        })
    }

    /// Decides a pending return.
    ///
    /// Approval moves the held quantity into the warehouse row for the
    /// product+variant; rejection puts it back on the distributor's stock
    /// row. Either way the decision is stamped in the same transaction as
    /// the stock movement.
    #[instrument(skip(self, input))]
    pub async fn decide_return(
        &self,
        return_id: Uuid,
        input: ReturnDecisionInput,
    ) -> Result<stock_return::Model, ServiceError> {
        input.validate()?;

        let stock_return = stock_return::Entity::find_by_id(return_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", return_id)))?;

        let status: ReturnStatus = stock_return.status.parse().map_err(|_| {
            ServiceError::InvalidStatus(format!("Unknown status '{}'", stock_return.status))
        })?;
        if status != ReturnStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Return {} has already been {}",
                return_id, status
            )));
        }

        let quantity = stock_return.quantity_returned;
        let note = input
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let txn = self.db.begin().await?;

        match input.action {
            ReturnDecisionAction::Approve => {
                let unit_price = match distributor_stock::Entity::find_by_id(stock_return.stock_id)
                    .one(&txn)
                    .await?
                {
                    Some(stock) => stock.unit_price,
                    None => {
                        product::Entity::find_by_id(stock_return.product_id)
                            .one(&txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Product {} not found",
                                    stock_return.product_id
                                ))
                            })?
                            .unit_price
                    }
                };
                put_stock(
                    &txn,
                    stock_return.product_id,
                    &stock_return.variant_size,
                    quantity,
                    unit_price,
                )
                .await?;
            }
            ReturnDecisionAction::Reject => {
                if let Some(stock) = distributor_stock::Entity::find_by_id(stock_return.stock_id)
                    .one(&txn)
                    .await?
                {
                    let restored = stock.quantity + quantity;
                    let mut stock_model: distributor_stock::ActiveModel = stock.into();
                    stock_model.quantity = Set(restored);
                    stock_model.last_updated = Set(Utc::now());
                    stock_model.update(&txn).await?;
                }
            }
        }

        let decided = match input.action {
            ReturnDecisionAction::Approve => ReturnStatus::Approved,
            ReturnDecisionAction::Reject => ReturnStatus::Rejected,
        };
        let mut return_model: stock_return::ActiveModel = stock_return.into();
        return_model.status = Set(decided.to_string());
        return_model.decision_note = Set(note);
        return_model.decided_at = Set(Some(Utc::now()));
        let stock_return = return_model.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Return {} {} ({} unit(s) of product {})",
            stock_return.id, decided, quantity, stock_return.product_id
        );
        let event = match decided {
            ReturnStatus::Approved => Event::ReturnApproved(stock_return.id),
            _ => Event::ReturnRejected(stock_return.id),
        };
        self.event_sender.send_or_log(event).await;
        Ok(stock_return)
    }
}
