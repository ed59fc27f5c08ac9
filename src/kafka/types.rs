use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::MessageRecord;

const NOTIFICATION_TITLE: &str = "New Notification";

/// Notification event published to the broker for every sent message.
///
/// This structure is serialized to JSON, stored durably in the notification
/// outbox, and later written to Kafka with `receiver_id` as partition key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPayload {
    /// Event category shown to the downstream consumer
    pub title: String,

    /// Display name of the sender
    pub sender_username: String,

    /// Recipient user id; also the Kafka partition key
    pub receiver_id: String,

    /// Message body as sent
    pub content: String,

    /// Server-assigned send timestamp
    pub sent_at: DateTime<Utc>,
}

impl NotificationPayload {
    pub fn new_message(sender_username: &str, message: &MessageRecord) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            sender_username: sender_username.to_string(),
            receiver_id: message.receiver_id.to_string(),
            content: message.content.clone(),
            sent_at: message.sent_at,
        }
    }

    /// Validate the payload before publishing
    pub fn validate(&self) -> Result<()> {
        if self.receiver_id.is_empty() {
            anyhow::bail!("notification payload has empty receiver_id");
        }
        if self.sender_username.is_empty() {
            anyhow::bail!("notification payload has empty sender_username");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record() -> MessageRecord {
        MessageRecord {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            content: "hi".to_string(),
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn payload_carries_receiver_and_content() {
        let message = record();
        let payload = NotificationPayload::new_message("alice", &message);

        assert_eq!(payload.title, "New Notification");
        assert_eq!(payload.sender_username, "alice");
        assert_eq!(payload.receiver_id, message.receiver_id.to_string());
        assert_eq!(payload.content, "hi");
        assert_eq!(payload.sent_at, message.sent_at);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn json_shape_is_stable() {
        let message = record();
        let payload = NotificationPayload::new_message("alice", &message);

        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("title").is_some());
        assert!(value.get("sender_username").is_some());
        assert!(value.get("receiver_id").is_some());
        assert!(value.get("content").is_some());
        assert!(value.get("sent_at").is_some());
    }

    #[test]
    fn empty_receiver_fails_validation() {
        let message = record();
        let mut payload = NotificationPayload::new_message("alice", &message);
        payload.receiver_id.clear();

        assert!(payload.validate().is_err());
    }
}
