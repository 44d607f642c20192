use crate::{
    entities::{category, distributor_stock, order_item, product, warehouse_stock},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Service for managing the product catalog.
///
/// Products belong to a category and carry the pricing and variant
/// information that order items and stock rows snapshot at write time.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category_id: Uuid,
    pub unit_price: Decimal,
    #[validate(length(min = 1, max = 40))]
    pub variant_size: String,
    #[validate(range(min = 1, max = 3650))]
    pub shelf_life_days: i32,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit_price: Option<Decimal>,
    #[validate(length(min = 1, max = 40))]
    pub variant_size: Option<String>,
    #[validate(range(min = 1, max = 3650))]
    pub shelf_life_days: Option<i32>,
    /// When omitted the stored image URL is kept.
    #[validate(url)]
    pub image_url: Option<String>,
    pub active: Option<bool>,
}

/// List filters for the catalog.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = product::Entity::find().order_by_desc(product::Column::CreatedAt);

        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(product::Column::Name.contains(search.trim()));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Products of one category, for order-form pickers.
    #[instrument(skip(self))]
    pub async fn products_by_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let items = product::Entity::find()
            .filter(product::Column::CategoryId.eq(category_id))
            .filter(product::Column::Active.eq(true))
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;

        if input.unit_price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit_price must be positive".to_string(),
            ));
        }

        // The category must exist before a product can point at it
        category::Entity::find_by_id(input.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", input.category_id))
            })?;

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            category_id: Set(input.category_id),
            unit_price: Set(input.unit_price),
            variant_size: Set(input.variant_size),
            shelf_life_days: Set(input.shelf_life_days),
            image_url: Set(input.image_url),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;
        info!("Created product: {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;

        let existing = self.get_product(id).await?;

        if let Some(price) = input.unit_price {
            if price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "unit_price must be positive".to_string(),
                ));
            }
        }
        if let Some(category_id) = input.category_id {
            category::Entity::find_by_id(category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", category_id))
                })?;
        }

        let mut model: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(category_id) = input.category_id {
            model.category_id = Set(category_id);
        }
        if let Some(price) = input.unit_price {
            model.unit_price = Set(price);
        }
        if let Some(variant) = input.variant_size {
            model.variant_size = Set(variant);
        }
        if let Some(days) = input.shelf_life_days {
            model.shelf_life_days = Set(days);
        }
        if let Some(url) = input.image_url {
            model.image_url = Set(Some(url));
        }
        if let Some(active) = input.active {
            model.active = Set(active);
        }
        model.updated_at = Set(Some(Utc::now()));

        let updated = model.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id))
            .await;
        Ok(updated)
    }

    /// Deletes a product. Refused while stock rows or order lines reference it.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_product(id).await?;

        let warehouse_refs = warehouse_stock::Entity::find()
            .filter(warehouse_stock::Column::ProductId.eq(id))
            .count(&*self.db)
            .await?;
        if warehouse_refs > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product '{}' still has warehouse stock",
                existing.name
            )));
        }

        let distributor_refs = distributor_stock::Entity::find()
            .filter(distributor_stock::Column::ProductId.eq(id))
            .count(&*self.db)
            .await?;
        if distributor_refs > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product '{}' is still held by distributors",
                existing.name
            )));
        }

        let order_refs = order_item::Entity::find()
            .filter(order_item::Column::ProductId.eq(id))
            .count(&*self.db)
            .await?;
        if order_refs > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product '{}' appears on existing orders",
                existing.name
            )));
        }

        existing.delete(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductDeleted(id))
            .await;
        info!("Deleted product: {}", id);
        Ok(())
    }
}
