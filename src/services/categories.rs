use crate::{
    entities::{category, product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Service for managing product categories.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub description: Option<String>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Lists categories, newest first.
    #[instrument(skip(self))]
    pub async fn list_categories(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<category::Model>, u64), ServiceError> {
        let paginator = category::Entity::find()
            .order_by_desc(category::Column::CreatedAt)
            .paginate(&*self.db, limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    /// Creates a category. Names are unique across the catalog.
    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;

        let duplicate = category::Entity::find()
            .filter(category::Column::Name.eq(input.name.clone()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' already exists",
                input.name
            )));
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CategoryCreated(created.id))
            .await;
        info!("Created category: {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;

        let existing = self.get_category(id).await?;

        if let Some(new_name) = &input.name {
            if *new_name != existing.name {
                let duplicate = category::Entity::find()
                    .filter(category::Column::Name.eq(new_name.clone()))
                    .filter(category::Column::Id.ne(id))
                    .one(&*self.db)
                    .await?;
                if duplicate.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Category '{}' already exists",
                        new_name
                    )));
                }
            }
        }

        let mut model: category::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        model.updated_at = Set(Some(Utc::now()));

        let updated = model.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CategoryUpdated(updated.id))
            .await;
        Ok(updated)
    }

    /// Deletes a category. Refused while products still reference it.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_category(id).await?;

        let product_count = product::Entity::find()
            .filter(product::Column::CategoryId.eq(id))
            .count(&*self.db)
            .await?;
        if product_count > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' still has {} product(s)",
                existing.name, product_count
            )));
        }

        existing.delete(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CategoryDeleted(id))
            .await;
        info!("Deleted category: {}", id);
        Ok(())
    }
}
