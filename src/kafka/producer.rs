use anyhow::{Context, Result};
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::types::NotificationPayload;
use super::NotificationPublisher;
use crate::config::KafkaConfig;
use crate::error::AppError;

const SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Kafka producer for notification events
///
/// Configured for at-least-once delivery:
/// - `acks=all`: wait for all in-sync replicas to acknowledge
/// - `enable.idempotence=true`: no duplicates within a producer session
/// - `linger.ms=10`: small batching window for low latency
pub struct KafkaPublisher {
    producer: Arc<FutureProducer>,
    topic: String,
    enabled: bool,
}

impl KafkaPublisher {
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let mut client_config = ClientConfig::new();
        client_config.set("bootstrap.servers", &config.brokers);

        if !config.enabled {
            info!("Kafka publisher disabled (KAFKA_ENABLED=false)");
            let producer = client_config
                .create()
                .context("Failed to create disabled Kafka producer")?;

            return Ok(Self {
                producer: Arc::new(producer),
                topic: config.topic.clone(),
                enabled: false,
            });
        }

        info!("Initializing Kafka publisher...");
        let producer: FutureProducer = client_config
            // Reliability settings
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("max.in.flight.requests.per.connection", "5")
            // Performance settings
            .set("linger.ms", "10")
            .set("batch.size", "16384")
            // Timeout settings
            .set("request.timeout.ms", "30000")
            .set("delivery.timeout.ms", "120000")
            .create()
            .context("Failed to create Kafka producer")?;

        info!(
            "Kafka publisher initialized for topic '{}'",
            config.topic
        );

        Ok(Self {
            producer: Arc::new(producer),
            topic: config.topic.clone(),
            enabled: true,
        })
    }

    /// Check if publishing is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get topic name
    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<(i32, i64)> {
        // Skip when disabled (local development without a broker)
        if !self.enabled {
            return Ok((-1, -1));
        }

        payload.validate().context("Invalid notification payload")?;

        let bytes = serde_json::to_vec(payload)
            .context("Failed to serialize notification payload")?;

        // Partition key: receiver id (per-recipient ordering)
        let key = payload.receiver_id.as_bytes();

        let record = FutureRecord::to(&self.topic).key(key).payload(&bytes);

        let start = std::time::Instant::now();
        match self.producer.send(record, Timeout::After(SEND_TIMEOUT)).await {
            Ok((partition, offset)) => {
                info!(
                    partition = partition,
                    offset = offset,
                    receiver_id = %payload.receiver_id,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Notification published"
                );
                Ok((partition, offset))
            }
            Err((kafka_err, _)) => {
                error!(
                    error = %kafka_err,
                    receiver_id = %payload.receiver_id,
                    topic = %self.topic,
                    "Failed to publish notification"
                );
                Err(anyhow::anyhow!("Kafka send failed: {}", kafka_err))
            }
        }
    }

    /// Flush pending messages (for graceful shutdown)
    pub async fn flush(&self, timeout: Duration) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        info!("Flushing Kafka publisher (timeout: {:?})", timeout);
        self.producer
            .flush(Timeout::After(timeout))
            .context("Failed to flush Kafka producer")?;
        Ok(())
    }
}

#[async_trait]
impl NotificationPublisher for KafkaPublisher {
    async fn publish(&self, payload: &NotificationPayload) -> Result<(), AppError> {
        self.send(payload)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Kafka(e.to_string()))
    }
}

// Clone shares the underlying producer (Arc handles it)
impl Clone for KafkaPublisher {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            topic: self.topic.clone(),
            enabled: self.enabled,
        }
    }
}
