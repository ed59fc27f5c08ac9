// Kafka module for notification fan-out
//
// One JSON event is published per sent message to a fixed topic, partition
// keyed by receiver id. Delivery beyond the broker is the consumer's
// responsibility.

pub mod producer;
pub mod types;

pub use producer::KafkaPublisher;
pub use types::NotificationPayload;

use async_trait::async_trait;

use crate::error::AppError;

/// Broker seam for the outbox dispatcher.
///
/// No acknowledgement is awaited beyond the broker accepting the publish;
/// no ordering guarantee beyond what the broker's partitioning offers.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, payload: &NotificationPayload) -> Result<(), AppError>;
}
