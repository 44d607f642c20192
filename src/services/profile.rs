use crate::{
    auth::{hash_password, verify_password},
    entities::distributor,
    errors::ServiceError,
    events::{Event, EventSender},
    services::distributors::CONTACT_NO_RE,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Self-service account management for the signed-in distributor.
///
/// The email stays fixed here; it is the login identity and only the
/// warehouse can change it through distributor administration.
#[derive(Clone)]
pub struct ProfileService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub district: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub province: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub owner_name: Option<String>,
    #[validate(regex = "CONTACT_NO_RE")]
    pub contact_no: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordInput {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "New password must be between 8 and 128 characters"
    ))]
    pub new_password: String,
}

impl ProfileService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn get_profile(
        &self,
        distributor_id: Uuid,
    ) -> Result<distributor::Model, ServiceError> {
        self.load(distributor_id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        distributor_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<distributor::Model, ServiceError> {
        input.validate()?;

        let existing = self.load(distributor_id).await?;
        let mut model: distributor::ActiveModel = existing.into();

        if let Some(name) = input.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(district) = input.district {
            model.district = Set(district.trim().to_string());
        }
        if let Some(province) = input.province {
            model.province = Set(province.trim().to_string());
        }
        if let Some(owner_name) = input.owner_name {
            model.owner_name = Set(owner_name.trim().to_string());
        }
        if let Some(contact_no) = input.contact_no {
            model.contact_no = Set(contact_no);
        }
        if let Some(address) = input.address {
            model.address = Set(Some(address));
        }
        if let Some(image_url) = input.image_url {
            model.image_url = Set(Some(image_url));
        }
        model.updated_at = Set(Some(Utc::now()));

        let updated = model.update(&*self.db).await?;

        info!("Distributor {} updated their profile", distributor_id);
        self.event_sender
            .send_or_log(Event::DistributorUpdated(updated.id))
            .await;
        Ok(updated)
    }

    /// Replaces the password after the current one is verified.
    #[instrument(skip(self, input))]
    pub async fn change_password(
        &self,
        distributor_id: Uuid,
        input: ChangePasswordInput,
    ) -> Result<(), ServiceError> {
        input.validate()?;

        let existing = self.load(distributor_id).await?;
        if !verify_password(&input.current_password, &existing.password_hash) {
            return Err(ServiceError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let new_hash =
            hash_password(&input.new_password).map_err(|e| ServiceError::HashError(e.to_string()))?;

        let mut model: distributor::ActiveModel = existing.into();
        model.password_hash = Set(new_hash);
        model.updated_at = Set(Some(Utc::now()));
        model.update(&*self.db).await?;

        info!("Distributor {} changed their password", distributor_id);
        Ok(())
    }

    async fn load(&self, distributor_id: Uuid) -> Result<distributor::Model, ServiceError> {
        distributor::Entity::find_by_id(distributor_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Distributor {} not found", distributor_id))
            })
    }
}
