use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

pub type DbPool = PgPool;

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct MessageRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
}

/// A notification waiting in the outbox to be published.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub message_id: Uuid,
    pub payload: serde_json::Value,
}

// ============================================================================
// Pool
// ============================================================================

pub async fn create_pool(config: &Config) -> Result<DbPool> {
    info!(
        max_connections = config.db.max_connections,
        "Connecting to PostgreSQL..."
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .acquire_timeout(Duration::from_secs(config.db.acquire_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!("PostgreSQL connection established");
    Ok(pool)
}

// ============================================================================
// Store trait
// ============================================================================

/// Persistent storage for messages and the notification outbox.
///
/// The database is the sole source of truth; caches are derived from it
/// and may be dropped at any time.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a message and its outbox notification in one transaction.
    async fn insert_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
        sender_username: &str,
    ) -> Result<MessageRecord, AppError>;

    /// Full history between two users, both directions, oldest first.
    async fn get_messages(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Vec<MessageRecord>, AppError>;

    async fn get_message(&self, id: Uuid) -> Result<Option<MessageRecord>, AppError>;

    /// Replace message content. Returns the updated record, or None if
    /// the message does not exist.
    async fn update_message_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<Option<MessageRecord>, AppError>;

    /// Returns true if a row was deleted.
    async fn delete_message(&self, id: Uuid) -> Result<bool, AppError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, AppError>;

    /// Oldest undispatched outbox rows, up to `limit`.
    async fn pending_notifications(&self, limit: i64) -> Result<Vec<OutboxRecord>, AppError>;

    async fn mark_notification_dispatched(&self, id: Uuid) -> Result<(), AppError>;
}

// ============================================================================
// Postgres implementation
// ============================================================================

#[derive(Clone)]
pub struct PgMessageStore {
    pool: DbPool,
}

impl PgMessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
        sender_username: &str,
    ) -> Result<MessageRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let message: MessageRecord = sqlx::query_as(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sender_id, receiver_id, content, sent_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        // Outbox row in the same transaction: either the message and its
        // notification both exist, or neither does.
        let payload = crate::kafka::NotificationPayload::new_message(sender_username, &message);
        let payload_json = serde_json::to_value(&payload)?;

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (id, message_id, payload)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.id)
        .bind(payload_json)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(message)
    }

    async fn get_messages(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Vec<MessageRecord>, AppError> {
        let messages = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, content, sent_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY sent_at ASC, id ASC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn get_message(&self, id: Uuid) -> Result<Option<MessageRecord>, AppError> {
        let message = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, content, sent_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    async fn update_message_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<Option<MessageRecord>, AppError> {
        let message = sqlx::query_as(
            r#"
            UPDATE messages
            SET content = $2
            WHERE id = $1
            RETURNING id, sender_id, receiver_id, content, sent_at
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    async fn delete_message(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, username
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn pending_notifications(&self, limit: i64) -> Result<Vec<OutboxRecord>, AppError> {
        let rows = sqlx::query_as(
            r#"
            SELECT id, message_id, payload
            FROM notification_outbox
            WHERE dispatched_at IS NULL
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn mark_notification_dispatched(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET dispatched_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
