use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::config::OutboxConfig;
use crate::db::MessageStore;
use crate::error::AppError;
use crate::kafka::{NotificationPayload, NotificationPublisher};

/// Background worker that drains the notification outbox.
///
/// Rows are published oldest first and marked dispatched only after the
/// broker acknowledges, so delivery is at-least-once. A publish failure
/// stops the current batch; the row is retried on the next tick.
pub struct OutboxDispatcher {
    store: Arc<dyn MessageStore>,
    publisher: Arc<dyn NotificationPublisher>,
    poll_interval: Duration,
    batch_size: i64,
}

impl OutboxDispatcher {
    pub fn new(
        store: Arc<dyn MessageStore>,
        publisher: Arc<dyn NotificationPublisher>,
        config: &OutboxConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            batch_size: config.batch_size,
        }
    }

    pub async fn run(self) {
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            batch_size = self.batch_size,
            "Outbox dispatcher started"
        );

        let mut ticker = interval(self.poll_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.dispatch_pending().await {
                error!(error = %e, "Outbox dispatch cycle failed");
            }
        }
    }

    /// Publish one batch of pending notifications. Returns how many
    /// rows were dispatched.
    pub async fn dispatch_pending(&self) -> Result<usize, AppError> {
        let pending = self.store.pending_notifications(self.batch_size).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        debug!(count = pending.len(), "Dispatching outbox batch");

        let mut dispatched = 0;
        for record in pending {
            let payload: NotificationPayload = match serde_json::from_value(record.payload.clone())
            {
                Ok(payload) => payload,
                Err(e) => {
                    // Unparseable rows would block the queue forever;
                    // mark them dispatched and move on.
                    error!(
                        outbox_id = %record.id,
                        message_id = %record.message_id,
                        error = %e,
                        "Skipping malformed outbox payload"
                    );
                    self.store.mark_notification_dispatched(record.id).await?;
                    continue;
                }
            };

            if let Err(e) = self.publisher.publish(&payload).await {
                error!(
                    outbox_id = %record.id,
                    error = %e,
                    "Publish failed, batch will retry next tick"
                );
                return Ok(dispatched);
            }

            self.store.mark_notification_dispatched(record.id).await?;
            dispatched += 1;
        }

        debug!(dispatched = dispatched, "Outbox batch complete");
        Ok(dispatched)
    }
}
