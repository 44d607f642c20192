use crate::{
    entities::{message, order},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::instrument;
use uuid::Uuid;

/// Kind of message attached to an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, utoipa::ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Recorded automatically when an order is accepted
    Accept,
    /// Recorded automatically when an order is rejected
    Reject,
    Question,
    Info,
}

/// Which side of the conversation wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    Admin,
    Distributor,
}

/// The authenticated author of a message.
#[derive(Debug, Clone, Copy)]
pub enum MessageAuthor {
    Admin(Uuid),
    Distributor(Uuid),
}

impl MessageAuthor {
    fn sender(&self) -> MessageSender {
        match self {
            MessageAuthor::Admin(_) => MessageSender::Admin,
            MessageAuthor::Distributor(_) => MessageSender::Distributor,
        }
    }
}

/// Service for order-scoped messaging between the warehouse and distributors.
#[derive(Clone)]
pub struct MessageService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl MessageService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Loads the order and checks the author may touch its conversation.
    async fn authorize(
        &self,
        author: MessageAuthor,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if let MessageAuthor::Distributor(distributor_id) = author {
            if order.distributor_id != distributor_id {
                // Hide other tenants' orders entirely
                return Err(ServiceError::NotFound(format!(
                    "Order {} not found",
                    order_id
                )));
            }
        }
        Ok(order)
    }

    /// Posts a question/info message on an order. Accept and reject notices
    /// are written by the order decision flow, not through here.
    #[instrument(skip(self, body))]
    pub async fn post_message(
        &self,
        author: MessageAuthor,
        order_id: Uuid,
        body: String,
        message_type: MessageType,
    ) -> Result<message::Model, ServiceError> {
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.len() > 2000 {
            return Err(ServiceError::ValidationError(
                "Message body must be between 1 and 2000 characters".to_string(),
            ));
        }
        if matches!(message_type, MessageType::Accept | MessageType::Reject) {
            return Err(ServiceError::InvalidOperation(
                "Accept and reject notices are recorded by the order decision".to_string(),
            ));
        }

        let order = self.authorize(author, order_id).await?;

        let admin_id = match author {
            MessageAuthor::Admin(id) => Some(id),
            MessageAuthor::Distributor(_) => None,
        };

        let model = message::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            distributor_id: Set(order.distributor_id),
            admin_id: Set(admin_id),
            body: Set(trimmed.to_string()),
            message_type: Set(message_type.to_string()),
            sender: Set(author.sender().to_string()),
            is_read: Set(false),
            created_at: Set(Utc::now()),
        };

        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::MessagePosted {
                message_id: created.id,
                order_id: Some(order.id),
                sender: created.sender.clone(),
            })
            .await;
        Ok(created)
    }

    /// Lists an order's conversation, oldest first.
    #[instrument(skip(self))]
    pub async fn list_messages(
        &self,
        author: MessageAuthor,
        order_id: Uuid,
    ) -> Result<Vec<message::Model>, ServiceError> {
        self.authorize(author, order_id).await?;

        let messages = message::Entity::find()
            .filter(message::Column::OrderId.eq(order_id))
            .order_by_asc(message::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(messages)
    }

    /// Marks the counterparty's messages on an order as read.
    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        author: MessageAuthor,
        order_id: Uuid,
    ) -> Result<u64, ServiceError> {
        self.authorize(author, order_id).await?;

        let counterparty = match author {
            MessageAuthor::Admin(_) => MessageSender::Distributor,
            MessageAuthor::Distributor(_) => MessageSender::Admin,
        };

        let result = message::Entity::update_many()
            .col_expr(message::Column::IsRead, Expr::value(true))
            .filter(message::Column::OrderId.eq(order_id))
            .filter(message::Column::Sender.eq(counterparty.to_string()))
            .filter(message::Column::IsRead.eq(false))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Unread admin messages across all of a distributor's orders.
    #[instrument(skip(self))]
    pub async fn unread_count(&self, distributor_id: Uuid) -> Result<u64, ServiceError> {
        let count = message::Entity::find()
            .filter(message::Column::DistributorId.eq(distributor_id))
            .filter(message::Column::Sender.eq(MessageSender::Admin.to_string()))
            .filter(message::Column::IsRead.eq(false))
            .count(&*self.db)
            .await?;
        Ok(count)
    }
}
