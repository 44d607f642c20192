use crate::{
    entities::{category, product, warehouse_stock},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    JoinType, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Service for the central warehouse inventory.
///
/// The warehouse keeps one stock row per product and variant size. Adding
/// stock for an existing combination tops the row up instead of creating a
/// duplicate.
#[derive(Clone)]
pub struct WarehouseStockService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct AddStockInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1_000_000))]
    pub quantity: i32,
    /// Defaults to the product's unit price when omitted.
    pub unit_price: Option<Decimal>,
    /// Defaults to the product's variant size when omitted.
    #[validate(length(min = 1, max = 40))]
    pub variant_size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateStockInput {
    #[validate(range(min = 0, max = 1_000_000))]
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    #[validate(length(min = 1, max = 40))]
    pub variant_size: Option<String>,
}

/// A stock row joined with its product for display and search.
#[derive(Debug, Clone, Serialize)]
pub struct WarehouseStockRow {
    #[serde(flatten)]
    pub stock: warehouse_stock::Model,
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ProductStockTotal {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

/// Warehouse-wide stock overview.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct StockSummary {
    pub products: Vec<ProductStockTotal>,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

impl WarehouseStockService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Lists stock rows with their products, searchable across product name,
    /// category name and variant size.
    #[instrument(skip(self))]
    pub async fn list_stock(
        &self,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<WarehouseStockRow>, u64), ServiceError> {
        let mut query = warehouse_stock::Entity::find()
            .find_also_related(product::Entity)
            .join(JoinType::LeftJoin, product::Relation::Category.def())
            .order_by_desc(warehouse_stock::Column::AddedAt);

        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            let term = term.trim().to_string();
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(term.clone()))
                    .add(category::Column::Name.contains(term.clone()))
                    .add(warehouse_stock::Column::VariantSize.contains(term)),
            );
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await?
            .into_iter()
            .map(|(stock, product)| WarehouseStockRow {
                stock,
                product_name: product.map(|p| p.name),
            })
            .collect();
        Ok((rows, total))
    }

    #[instrument(skip(self))]
    pub async fn get_stock(&self, id: Uuid) -> Result<WarehouseStockRow, ServiceError> {
        let (stock, product) = warehouse_stock::Entity::find_by_id(id)
            .find_also_related(product::Entity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock row {} not found", id)))?;
        Ok(WarehouseStockRow {
            stock,
            product_name: product.map(|p| p.name),
        })
    }

    /// Adds stock. Tops up the existing row for the product+variant when one
    /// exists, otherwise creates it. Price and variant default from the
    /// product.
    #[instrument(skip(self))]
    pub async fn add_stock(
        &self,
        input: AddStockInput,
    ) -> Result<warehouse_stock::Model, ServiceError> {
        input.validate()?;

        let product = product::Entity::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let unit_price = input.unit_price.unwrap_or(product.unit_price);
        if unit_price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit_price must be positive".to_string(),
            ));
        }
        let variant_size = input
            .variant_size
            .unwrap_or_else(|| product.variant_size.clone());

        let existing = warehouse_stock::Entity::find()
            .filter(warehouse_stock::Column::ProductId.eq(input.product_id))
            .filter(warehouse_stock::Column::VariantSize.eq(variant_size.clone()))
            .one(&*self.db)
            .await?;

        let saved = match existing {
            Some(row) => {
                let old_quantity = row.quantity;
                let mut model: warehouse_stock::ActiveModel = row.into();
                model.quantity = Set(old_quantity + input.quantity);
                model.unit_price = Set(unit_price);
                model.updated_at = Set(Some(Utc::now()));
                let updated = model.update(&*self.db).await?;
                self.event_sender
                    .send_or_log(Event::WarehouseStockAdjusted {
                        stock_id: updated.id,
                        product_id: updated.product_id,
                        old_quantity,
                        new_quantity: updated.quantity,
                    })
                    .await;
                updated
            }
            None => {
                let model = warehouse_stock::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(input.product_id),
                    quantity: Set(input.quantity),
                    unit_price: Set(unit_price),
                    variant_size: Set(variant_size),
                    added_at: Set(Utc::now()),
                    updated_at: Set(None),
                };
                let created = model.insert(&*self.db).await?;
                self.event_sender
                    .send_or_log(Event::WarehouseStockAdded {
                        stock_id: created.id,
                        product_id: created.product_id,
                        quantity: created.quantity,
                    })
                    .await;
                created
            }
        };

        info!(
            "Warehouse stock for product {} now at {}",
            saved.product_id, saved.quantity
        );
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn update_stock(
        &self,
        id: Uuid,
        input: UpdateStockInput,
    ) -> Result<warehouse_stock::Model, ServiceError> {
        input.validate()?;

        let existing = warehouse_stock::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock row {} not found", id)))?;
        let old_quantity = existing.quantity;
        let product_id = existing.product_id;

        if let Some(price) = input.unit_price {
            if price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "unit_price must be positive".to_string(),
                ));
            }
        }

        // Moving the row onto another variant must not collide with an
        // existing product+variant row
        if let Some(variant) = &input.variant_size {
            if *variant != existing.variant_size {
                let collision = warehouse_stock::Entity::find()
                    .filter(warehouse_stock::Column::ProductId.eq(product_id))
                    .filter(warehouse_stock::Column::VariantSize.eq(variant.clone()))
                    .filter(warehouse_stock::Column::Id.ne(id))
                    .one(&*self.db)
                    .await?;
                if collision.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "A stock row for variant '{}' already exists",
                        variant
                    )));
                }
            }
        }

        let mut model: warehouse_stock::ActiveModel = existing.into();
        if let Some(quantity) = input.quantity {
            model.quantity = Set(quantity);
        }
        if let Some(price) = input.unit_price {
            model.unit_price = Set(price);
        }
        if let Some(variant) = input.variant_size {
            model.variant_size = Set(variant);
        }
        model.updated_at = Set(Some(Utc::now()));

        let updated = model.update(&*self.db).await?;
        if updated.quantity != old_quantity {
            self.event_sender
                .send_or_log(Event::WarehouseStockAdjusted {
                    stock_id: updated.id,
                    product_id,
                    old_quantity,
                    new_quantity: updated.quantity,
                })
                .await;
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_stock(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = warehouse_stock::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock row {} not found", id)))?;

        existing.delete(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::WarehouseStockDeleted(id))
            .await;
        info!("Deleted warehouse stock row: {}", id);
        Ok(())
    }

    /// Per-product quantity and value totals plus grand totals.
    #[instrument(skip(self))]
    pub async fn stock_summary(&self) -> Result<StockSummary, ServiceError> {
        let rows = warehouse_stock::Entity::find()
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        let mut by_product: BTreeMap<Uuid, ProductStockTotal> = BTreeMap::new();
        let mut total_quantity: i64 = 0;
        let mut total_value = Decimal::ZERO;

        for (stock, product) in rows {
            let value = stock.unit_price * Decimal::from(stock.quantity);
            total_quantity += i64::from(stock.quantity);
            total_value += value;

            let entry = by_product
                .entry(stock.product_id)
                .or_insert_with(|| ProductStockTotal {
                    product_id: stock.product_id,
                    product_name: product
                        .map(|p| p.name)
                        .unwrap_or_else(|| "unknown".to_string()),
                    total_quantity: 0,
                    total_value: Decimal::ZERO,
                });
            entry.total_quantity += i64::from(stock.quantity);
            entry.total_value += value;
        }

        let mut products: Vec<ProductStockTotal> = by_product.into_values().collect();
        products.sort_by(|a, b| a.product_name.cmp(&b.product_name));

        Ok(StockSummary {
            products,
            total_quantity,
            total_value,
        })
    }
}

/// Takes `quantity` units out of the warehouse row for a product+variant.
/// Fails with an insufficient-stock error naming available vs requested.
pub(crate) async fn take_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    variant_size: &str,
    quantity: i32,
) -> Result<warehouse_stock::Model, ServiceError> {
    let row = warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::ProductId.eq(product_id))
        .filter(warehouse_stock::Column::VariantSize.eq(variant_size))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "No warehouse stock for product {} ({})",
                product_id, variant_size
            ))
        })?;

    if row.quantity < quantity {
        return Err(ServiceError::insufficient_stock(row.quantity, quantity));
    }

    let remaining = row.quantity - quantity;
    let mut model: warehouse_stock::ActiveModel = row.into();
    model.quantity = Set(remaining);
    model.updated_at = Set(Some(Utc::now()));
    Ok(model.update(conn).await?)
}

/// Puts `quantity` units back into the warehouse row for a product+variant,
/// creating the row when the combination no longer exists.
pub(crate) async fn put_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    variant_size: &str,
    quantity: i32,
    unit_price: Decimal,
) -> Result<warehouse_stock::Model, ServiceError> {
    let existing = warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::ProductId.eq(product_id))
        .filter(warehouse_stock::Column::VariantSize.eq(variant_size))
        .one(conn)
        .await?;

    match existing {
        Some(row) => {
            let new_quantity = row.quantity + quantity;
            let mut model: warehouse_stock::ActiveModel = row.into();
            model.quantity = Set(new_quantity);
            model.updated_at = Set(Some(Utc::now()));
            Ok(model.update(conn).await?)
        }
        None => {
            let model = warehouse_stock::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                variant_size: Set(variant_size.to_string()),
                added_at: Set(Utc::now()),
                updated_at: Set(None),
            };
            Ok(model.insert(conn).await?)
        }
    }
}
