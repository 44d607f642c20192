use crate::{
    auth::hash_password,
    entities::{distributor, order, sale, stock_return},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    /// Phone numbers: digits with optional spacing and punctuation.
    pub static ref CONTACT_NO_RE: Regex = Regex::new(r"^[\d\s\+\-\(\)]{7,20}$").unwrap();
}

/// Service for managing distributor accounts (admin side).
#[derive(Clone)]
pub struct DistributorService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDistributorInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 80))]
    pub district: String,
    #[validate(length(min = 1, max = 80))]
    pub province: String,
    #[validate(length(min = 1, max = 120))]
    pub owner_name: String,
    #[validate(regex = "CONTACT_NO_RE")]
    pub contact_no: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateDistributorInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub district: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub province: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub owner_name: Option<String>,
    #[validate(regex = "CONTACT_NO_RE")]
    pub contact_no: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    /// Password is re-hashed only when provided.
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub active: Option<bool>,
}

impl DistributorService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Lists distributors, searchable by name, district or email.
    #[instrument(skip(self))]
    pub async fn list_distributors(
        &self,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<distributor::Model>, u64), ServiceError> {
        let mut query =
            distributor::Entity::find().order_by_desc(distributor::Column::CreatedAt);

        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            let term = term.trim().to_string();
            query = query.filter(
                Condition::any()
                    .add(distributor::Column::Name.contains(term.clone()))
                    .add(distributor::Column::District.contains(term.clone()))
                    .add(distributor::Column::Email.contains(term)),
            );
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn get_distributor(&self, id: Uuid) -> Result<distributor::Model, ServiceError> {
        distributor::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Distributor {} not found", id)))
    }

    /// Creates a distributor account. Emails are unique; the password is
    /// stored as an Argon2 hash.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_distributor(
        &self,
        input: CreateDistributorInput,
    ) -> Result<distributor::Model, ServiceError> {
        input.validate()?;

        let duplicate = distributor::Entity::find()
            .filter(distributor::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Distributor with email {} already exists",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password)?;
        let model = distributor::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            district: Set(input.district),
            province: Set(input.province),
            owner_name: Set(input.owner_name),
            contact_no: Set(input.contact_no),
            address: Set(input.address),
            email: Set(input.email),
            password_hash: Set(password_hash),
            image_url: Set(input.image_url),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::DistributorRegistered(created.id))
            .await;
        info!("Created distributor account: {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_distributor(
        &self,
        id: Uuid,
        input: UpdateDistributorInput,
    ) -> Result<distributor::Model, ServiceError> {
        input.validate()?;

        let existing = self.get_distributor(id).await?;

        if let Some(new_email) = &input.email {
            if *new_email != existing.email {
                let duplicate = distributor::Entity::find()
                    .filter(distributor::Column::Email.eq(new_email.clone()))
                    .filter(distributor::Column::Id.ne(id))
                    .one(&*self.db)
                    .await?;
                if duplicate.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Distributor with email {} already exists",
                        new_email
                    )));
                }
            }
        }

        let mut model: distributor::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(district) = input.district {
            model.district = Set(district);
        }
        if let Some(province) = input.province {
            model.province = Set(province);
        }
        if let Some(owner_name) = input.owner_name {
            model.owner_name = Set(owner_name);
        }
        if let Some(contact_no) = input.contact_no {
            model.contact_no = Set(contact_no);
        }
        if let Some(address) = input.address {
            model.address = Set(Some(address));
        }
        if let Some(email) = input.email {
            model.email = Set(email);
        }
        if let Some(password) = input.password {
            model.password_hash = Set(hash_password(&password)?);
        }
        if let Some(image_url) = input.image_url {
            model.image_url = Set(Some(image_url));
        }
        if let Some(active) = input.active {
            model.active = Set(active);
        }
        model.updated_at = Set(Some(Utc::now()));

        let updated = model.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::DistributorUpdated(updated.id))
            .await;
        Ok(updated)
    }

    /// Deletes a distributor. Refused while orders, sales or returns still
    /// reference the account; held stock rows are removed with it.
    #[instrument(skip(self))]
    pub async fn delete_distributor(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_distributor(id).await?;

        let order_count = order::Entity::find()
            .filter(order::Column::DistributorId.eq(id))
            .count(&*self.db)
            .await?;
        if order_count > 0 {
            return Err(ServiceError::Conflict(format!(
                "Distributor '{}' has {} order(s) on record",
                existing.name, order_count
            )));
        }

        let sale_count = sale::Entity::find()
            .filter(sale::Column::DistributorId.eq(id))
            .count(&*self.db)
            .await?;
        if sale_count > 0 {
            return Err(ServiceError::Conflict(format!(
                "Distributor '{}' has {} recorded sale(s)",
                existing.name, sale_count
            )));
        }

        let return_count = stock_return::Entity::find()
            .filter(stock_return::Column::DistributorId.eq(id))
            .count(&*self.db)
            .await?;
        if return_count > 0 {
            return Err(ServiceError::Conflict(format!(
                "Distributor '{}' has {} return(s) on record",
                existing.name, return_count
            )));
        }

        existing.delete(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::DistributorDeleted(id))
            .await;
        info!("Deleted distributor account: {}", id);
        Ok(())
    }
}
