use crate::{
    entities::{distributor_stock, product, sale},
    errors::ServiceError,
    events::{Event, EventSender},
    services::distributors::CONTACT_NO_RE,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Stored as a lowercase string on the row. A sale starts `completed`;
/// `pending` and `cancelled` are bookkeeping states the distributor can set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, utoipa::ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Pending,
    Cancelled,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSaleInput {
    pub stock_id: Uuid,
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Quantity must be between 1 and 1,000,000"
    ))]
    pub quantity: i32,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Customer name must be between 1 and 255 characters"
    ))]
    pub customer_name: String,
    #[validate(regex = "CONTACT_NO_RE")]
    pub customer_contact: Option<String>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
    pub status: Option<SaleStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSaleInput {
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Quantity must be between 1 and 1,000,000"
    ))]
    pub quantity: Option<i32>,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Customer name must be between 1 and 255 characters"
    ))]
    pub customer_name: Option<String>,
    #[validate(regex = "CONTACT_NO_RE")]
    pub customer_contact: Option<String>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
    pub status: Option<SaleStatus>,
    pub sold_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleFilter {
    pub search: Option<String>,
    pub status: Option<SaleStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesStats {
    pub count: usize,
    pub revenue: Decimal,
    pub units: i64,
    pub completed: usize,
}

#[derive(Clone)]
pub struct SaleService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl SaleService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Records a sale and draws the quantity from the distributor's stock row
    /// in the same transaction.
    #[instrument(skip(self, input))]
    pub async fn create_sale(
        &self,
        distributor_id: Uuid,
        input: CreateSaleInput,
    ) -> Result<sale::Model, ServiceError> {
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

        let product = product::Entity::find_by_id(stock.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", stock.product_id))
            })?;

        let unit_price = stock.unit_price;
        let total_amount = unit_price * Decimal::from(input.quantity);
        let remaining = stock.quantity - input.quantity;

        let txn = self.db.begin().await?;

        let mut stock_model: distributor_stock::ActiveModel = stock.clone().into();
        stock_model.quantity = Set(remaining);
        stock_model.last_updated = Set(Utc::now());
        stock_model.update(&txn).await?;

        let sale_model = sale::ActiveModel {
            id: Set(Uuid::new_v4()),
            distributor_id: Set(distributor_id),
            stock_id: Set(stock.id),
            product_id: Set(stock.product_id),
            product_name: Set(product.name),
            variant_size: Set(stock.variant_size.clone()),
            quantity_sold: Set(input.quantity),
            unit_price: Set(unit_price),
            total_amount: Set(total_amount),
            customer_name: Set(input.customer_name.trim().to_string()),
            customer_contact: Set(input.customer_contact.clone()),
            notes: Set(input.notes.clone()),
            status: Set(input.status.unwrap_or(SaleStatus::Completed).to_string()),
            sold_at: Set(input.sold_at.unwrap_or_else(Utc::now)),
            ..Default::default()
        };
        let sale = sale_model.insert(&txn).await?;

        txn.commit().await?;

        info!(
            "Sale {} recorded by distributor {}: {} x {} ({} left in stock)",
            sale.id, distributor_id, sale.quantity_sold, sale.product_name, remaining
        );
        self.event_sender
            .send_or_log(Event::SaleRecorded {
                sale_id: sale.id,
                distributor_id,
                quantity: sale.quantity_sold,
            })
            .await;
        Ok(sale)
    }

    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        distributor_id: Uuid,
        filter: SaleFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<sale::Model>, u64), ServiceError> {
        let paginator = self
            .filtered(distributor_id, &filter)
            .order_by_desc(sale::Column::SoldAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((sales, total))
    }

    #[instrument(skip(self))]
    pub async fn get_sale(
        &self,
        distributor_id: Uuid,
        sale_id: Uuid,
    ) -> Result<sale::Model, ServiceError> {
        self.load_scoped(distributor_id, sale_id).await
    }

    /// Totals over the filtered sales, computed the same way the listing is
    /// filtered so the two always agree.
    #[instrument(skip(self))]
    pub async fn sales_stats(
        &self,
        distributor_id: Uuid,
        filter: SaleFilter,
    ) -> Result<SalesStats, ServiceError> {
        let rows = self.filtered(distributor_id, &filter).all(&*self.db).await?;

        let completed_label = SaleStatus::Completed.to_string();
        let mut revenue = Decimal::ZERO;
        let mut units: i64 = 0;
        let mut completed = 0usize;
        for row in &rows {
            revenue += row.total_amount;
            units += i64::from(row.quantity_sold);
            if row.status == completed_label {
                completed += 1;
            }
        }

        Ok(SalesStats {
            count: rows.len(),
            revenue,
            units,
            completed,
        })
    }

    /// Edits a sale. A quantity change moves only the difference against the
    /// stock row the sale drew from, in the same transaction as the edit.
    #[instrument(skip(self, input))]
    pub async fn update_sale(
        &self,
        distributor_id: Uuid,
        sale_id: Uuid,
        input: UpdateSaleInput,
    ) -> Result<sale::Model, ServiceError> {
        input.validate()?;

        let sale = self.load_scoped(distributor_id, sale_id).await?;

        let mut quantity_delta: i32 = 0;
        let txn = self.db.begin().await?;

        if let Some(new_quantity) = input.quantity {
            quantity_delta = new_quantity - sale.quantity_sold;
            if quantity_delta != 0 {
                let stock = distributor_stock::Entity::find_by_id(sale.stock_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InvalidOperation(
                            "The stock row this sale drew from no longer exists".to_string(),
                        )
                    })?;
                if quantity_delta > 0 && stock.quantity < quantity_delta {
                    return Err(ServiceError::insufficient_stock(
                        stock.quantity,
                        quantity_delta,
                    ));
                }
                let corrected = stock.quantity - quantity_delta;
                let mut stock_model: distributor_stock::ActiveModel = stock.into();
                stock_model.quantity = Set(corrected);
                stock_model.last_updated = Set(Utc::now());
                stock_model.update(&txn).await?;
            }
        }

        let unit_price = sale.unit_price;
        let mut sale_model: sale::ActiveModel = sale.into();
        if let Some(quantity) = input.quantity {
            sale_model.quantity_sold = Set(quantity);
            sale_model.total_amount = Set(unit_price * Decimal::from(quantity));
        }
        if let Some(customer_name) = input.customer_name {
            sale_model.customer_name = Set(customer_name.trim().to_string());
        }
        if let Some(customer_contact) = input.customer_contact {
            sale_model.customer_contact = Set(Some(customer_contact));
        }
        if let Some(notes) = input.notes {
            sale_model.notes = Set(Some(notes));
        }
        if let Some(status) = input.status {
            sale_model.status = Set(status.to_string());
        }
        if let Some(sold_at) = input.sold_at {
            sale_model.sold_at = Set(sold_at);
        }
        let sale = sale_model.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Sale {} updated by distributor {} (quantity delta {})",
            sale.id, distributor_id, quantity_delta
        );
        self.event_sender
            .send_or_log(Event::SaleUpdated {
                sale_id: sale.id,
                quantity_delta,
            })
            .await;
        Ok(sale)
    }

    /// Removes a sale record and returns the full sold quantity to the stock
    /// row it came from.
    #[instrument(skip(self))]
    pub async fn delete_sale(
        &self,
        distributor_id: Uuid,
        sale_id: Uuid,
    ) -> Result<(), ServiceError> {
        let sale = self.load_scoped(distributor_id, sale_id).await?;
        let restocked = sale.quantity_sold;

        let txn = self.db.begin().await?;

        if let Some(stock) = distributor_stock::Entity::find_by_id(sale.stock_id)
            .one(&txn)
            .await?
        {
            let restored = stock.quantity + restocked;
            let mut stock_model: distributor_stock::ActiveModel = stock.into();
            stock_model.quantity = Set(restored);
            stock_model.last_updated = Set(Utc::now());
            stock_model.update(&txn).await?;
        }

        let sale_id = sale.id;
        sale.delete(&txn).await?;

        txn.commit().await?;

        info!(
            "Sale {} deleted by distributor {}, {} unit(s) restocked",
            sale_id, distributor_id, restocked
        );
        self.event_sender
            .send_or_log(Event::SaleDeleted {
                sale_id,
                restocked_quantity: restocked,
            })
            .await;
        Ok(())
    }

    fn filtered(&self, distributor_id: Uuid, filter: &SaleFilter) -> sea_orm::Select<sale::Entity> {
        let mut query =
            sale::Entity::find().filter(sale::Column::DistributorId.eq(distributor_id));

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(sale::Column::ProductName.contains(term))
                    .add(sale::Column::CustomerName.contains(term)),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(sale::Column::Status.eq(status.to_string()));
        }
        if let Some(from) = filter.from {
            query = query.filter(sale::Column::SoldAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(sale::Column::SoldAt.lte(to));
        }
        query
    }

    async fn load_scoped(
        &self,
        distributor_id: Uuid,
        sale_id: Uuid,
    ) -> Result<sale::Model, ServiceError> {
        let sale = sale::Entity::find_by_id(sale_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))?;
        if sale.distributor_id != distributor_id {
            return Err(ServiceError::NotFound(format!(
                "Sale {} not found",
                sale_id
            )));
        }
        Ok(sale)
    }
}
