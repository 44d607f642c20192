use crate::{
    config::AppConfig,
    entities::{distributor_stock, product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Service for the stock a distributor holds locally.
///
/// Rows are created by accepted orders; distributors can only inspect
/// and correct their own rows.
#[derive(Clone)]
pub struct DistributorStockService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

/// A distributor stock row joined with its product for display.
#[derive(Debug, Clone, Serialize)]
pub struct DistributorStockRow {
    #[serde(flatten)]
    pub stock: distributor_stock::Model,
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MyStockStats {
    pub distinct_products: usize,
    pub total_quantity: i64,
    pub total_value: Decimal,
    pub low_stock_count: usize,
    pub low_stock_threshold: i32,
}

/// Availability probe result for one product+variant.
#[derive(Debug, Clone, Serialize)]
pub struct StockAvailability {
    pub in_stock: bool,
    pub quantity: i32,
    pub stock_id: Option<Uuid>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetQuantityInput {
    pub quantity: i32,
}

impl DistributorStockService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_stock(
        &self,
        distributor_id: Uuid,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<DistributorStockRow>, u64), ServiceError> {
        let mut query = distributor_stock::Entity::find()
            .find_also_related(product::Entity)
            .filter(distributor_stock::Column::DistributorId.eq(distributor_id))
            .order_by_desc(distributor_stock::Column::LastUpdated);

        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            let term = term.trim().to_string();
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(term.clone()))
                    .add(distributor_stock::Column::VariantSize.contains(term)),
            );
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await?
            .into_iter()
            .map(|(stock, product)| DistributorStockRow {
                stock,
                product_name: product.map(|p| p.name),
            })
            .collect();
        Ok((rows, total))
    }

    #[instrument(skip(self))]
    pub async fn get_stock(
        &self,
        distributor_id: Uuid,
        stock_id: Uuid,
    ) -> Result<DistributorStockRow, ServiceError> {
        let (stock, product) = distributor_stock::Entity::find_by_id(stock_id)
            .find_also_related(product::Entity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock row {} not found", stock_id)))?;

        if stock.distributor_id != distributor_id {
            return Err(ServiceError::NotFound(format!(
                "Stock row {} not found",
                stock_id
            )));
        }

        Ok(DistributorStockRow {
            stock,
            product_name: product.map(|p| p.name),
        })
    }

    /// Stock overview used on the distributor dashboard.
    #[instrument(skip(self))]
    pub async fn stats(&self, distributor_id: Uuid) -> Result<MyStockStats, ServiceError> {
        let rows = distributor_stock::Entity::find()
            .filter(distributor_stock::Column::DistributorId.eq(distributor_id))
            .all(&*self.db)
            .await?;

        let threshold = self.config.low_stock_threshold;
        let mut products: HashSet<Uuid> = HashSet::new();
        let mut total_quantity: i64 = 0;
        let mut total_value = Decimal::ZERO;
        let mut low_stock_count = 0usize;

        for row in &rows {
            products.insert(row.product_id);
            total_quantity += i64::from(row.quantity);
            total_value += row.unit_price * Decimal::from(row.quantity);
            if row.quantity <= threshold {
                low_stock_count += 1;
            }
        }

        Ok(MyStockStats {
            distinct_products: products.len(),
            total_quantity,
            total_value,
            low_stock_count,
            low_stock_threshold: threshold,
        })
    }

    /// Manual stock correction. The quantity is set, not adjusted.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        distributor_id: Uuid,
        stock_id: Uuid,
        input: SetQuantityInput,
    ) -> Result<distributor_stock::Model, ServiceError> {
        if input.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity cannot be negative".to_string(),
            ));
        }

        let row = distributor_stock::Entity::find_by_id(stock_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock row {} not found", stock_id)))?;
        if row.distributor_id != distributor_id {
            return Err(ServiceError::NotFound(format!(
                "Stock row {} not found",
                stock_id
            )));
        }

        let old_quantity = row.quantity;
        let mut model: distributor_stock::ActiveModel = row.into();
        model.quantity = Set(input.quantity);
        model.last_updated = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        info!(
            "Distributor {} corrected stock {} from {} to {}",
            distributor_id, stock_id, old_quantity, updated.quantity
        );
        self.event_sender
            .send_or_log(Event::with_data(format!(
                "distributor stock {} corrected to {}",
                stock_id, updated.quantity
            )))
            .await;
        Ok(updated)
    }

    /// Availability probe for the sale form: does this distributor hold the
    /// product in the given variant, and how much?
    #[instrument(skip(self))]
    pub async fn availability(
        &self,
        distributor_id: Uuid,
        product_id: Uuid,
        variant_size: &str,
    ) -> Result<StockAvailability, ServiceError> {
        let row = distributor_stock::Entity::find()
            .filter(distributor_stock::Column::DistributorId.eq(distributor_id))
            .filter(distributor_stock::Column::ProductId.eq(product_id))
            .filter(distributor_stock::Column::VariantSize.eq(variant_size))
            .one(&*self.db)
            .await?;

        Ok(match row {
            Some(row) => StockAvailability {
                in_stock: row.quantity > 0,
                quantity: row.quantity,
                stock_id: Some(row.id),
                unit_price: Some(row.unit_price),
            },
            None => StockAvailability {
                in_stock: false,
                quantity: 0,
                stock_id: None,
                unit_price: None,
            },
        })
    }
}

/// Credits transferred units to a distributor's stock row, creating the
/// product+variant row on first transfer. The unit price follows the most
/// recent transfer.
pub(crate) async fn credit_stock<C: ConnectionTrait>(
    conn: &C,
    distributor_id: Uuid,
    product_id: Uuid,
    variant_size: &str,
    quantity: i32,
    unit_price: Decimal,
) -> Result<distributor_stock::Model, ServiceError> {
    let existing = distributor_stock::Entity::find()
        .filter(distributor_stock::Column::DistributorId.eq(distributor_id))
        .filter(distributor_stock::Column::ProductId.eq(product_id))
        .filter(distributor_stock::Column::VariantSize.eq(variant_size))
        .one(conn)
        .await?;

    match existing {
        Some(row) => {
            let new_quantity = row.quantity + quantity;
            let mut model: distributor_stock::ActiveModel = row.into();
            model.quantity = Set(new_quantity);
            model.unit_price = Set(unit_price);
            model.last_updated = Set(Utc::now());
            Ok(model.update(conn).await?)
        }
        None => {
            let model = distributor_stock::ActiveModel {
                id: Set(Uuid::new_v4()),
                distributor_id: Set(distributor_id),
                product_id: Set(product_id),
                variant_size: Set(variant_size.to_string()),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                last_updated: Set(Utc::now()),
            };
            Ok(model.insert(conn).await?)
        }
    }
}
