use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::TokenVerifier;
use crate::cache::ConversationCache;
use crate::db::{MessageRecord, MessageStore, UserProfile};
use crate::error::AppError;

const MAX_CONTENT_LEN: usize = 4096;

/// Direct-message operations: persistence, cache policy, and ownership
/// checks live here. Notification delivery happens asynchronously via
/// the outbox, this service only writes the outbox row (inside the
/// message insert transaction).
pub struct ConversationService {
    store: Arc<dyn MessageStore>,
    cache: ConversationCache,
    verifier: Arc<dyn TokenVerifier>,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        cache: ConversationCache,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            store,
            cache,
            verifier,
        }
    }

    fn validate_content(content: &str) -> Result<(), AppError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Message content cannot be empty"));
        }
        if content.len() > MAX_CONTENT_LEN {
            return Err(AppError::validation(format!(
                "Message content exceeds {} bytes",
                MAX_CONTENT_LEN
            )));
        }
        Ok(())
    }

    /// Cache-aside profile lookup.
    async fn load_profile(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        if let Some(profile) = self.cache.get_profile(user_id).await {
            return Ok(profile);
        }

        let profile = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {} not found", user_id)))?;

        self.cache.store_profile(&profile).await;
        Ok(profile)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    pub async fn send_message(
        &self,
        token: &str,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<MessageRecord, AppError> {
        let sender_id = self.verifier.verify(token)?;

        Self::validate_content(content)?;
        if sender_id == receiver_id {
            return Err(AppError::validation("Cannot send a message to yourself"));
        }

        let sender = self.load_profile(sender_id).await?;
        // Receiver must exist before we persist anything addressed to them
        self.load_profile(receiver_id).await?;

        let message = self
            .store
            .insert_message(sender_id, receiver_id, content, &sender.username)
            .await?;

        self.cache.invalidate_pair(sender_id, receiver_id).await;
        // The just-sent message is by definition the newest one
        self.cache
            .store_last_message(sender_id, receiver_id, &message)
            .await;

        info!(
            message_id = %message.id,
            sender_id = %sender_id,
            receiver_id = %receiver_id,
            "Message sent"
        );

        Ok(message)
    }

    pub async fn get_messages(
        &self,
        token: &str,
        peer_id: Uuid,
    ) -> Result<Vec<MessageRecord>, AppError> {
        let caller_id = self.verifier.verify(token)?;

        if let Some(messages) = self.cache.get_conversation(caller_id, peer_id).await {
            debug!(
                caller_id = %caller_id,
                peer_id = %peer_id,
                count = messages.len(),
                "Conversation served from cache"
            );
            return Ok(messages);
        }

        let messages = self.store.get_messages(caller_id, peer_id).await?;

        self.cache
            .store_conversation(caller_id, peer_id, &messages)
            .await;
        self.cache
            .store_message_count(caller_id, peer_id, messages.len())
            .await;
        if let Some(last) = messages.last() {
            self.cache
                .store_last_message(caller_id, peer_id, last)
                .await;
        }

        Ok(messages)
    }

    pub async fn change_message(
        &self,
        token: &str,
        message_id: Uuid,
        new_content: &str,
    ) -> Result<MessageRecord, AppError> {
        let caller_id = self.verifier.verify(token)?;
        Self::validate_content(new_content)?;

        let existing = self
            .store
            .get_message(message_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {} not found", message_id)))?;

        if existing.sender_id != caller_id {
            warn!(
                message_id = %message_id,
                caller_id = %caller_id,
                "Edit rejected: caller is not the sender"
            );
            return Err(AppError::permission_denied(
                "Only the sender can edit a message",
            ));
        }

        let updated = self
            .store
            .update_message_content(message_id, new_content)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {} not found", message_id)))?;

        self.cache
            .invalidate_pair(existing.sender_id, existing.receiver_id)
            .await;

        info!(message_id = %message_id, "Message edited");
        Ok(updated)
    }

    pub async fn delete_message(&self, token: &str, message_id: Uuid) -> Result<(), AppError> {
        let caller_id = self.verifier.verify(token)?;

        let existing = self
            .store
            .get_message(message_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {} not found", message_id)))?;

        if existing.sender_id != caller_id {
            warn!(
                message_id = %message_id,
                caller_id = %caller_id,
                "Delete rejected: caller is not the sender"
            );
            return Err(AppError::permission_denied(
                "Only the sender can delete a message",
            ));
        }

        let deleted = self.store.delete_message(message_id).await?;
        if !deleted {
            return Err(AppError::not_found(format!(
                "Message {} not found",
                message_id
            )));
        }

        self.cache
            .invalidate_pair(existing.sender_id, existing.receiver_id)
            .await;

        info!(message_id = %message_id, "Message deleted");
        Ok(())
    }
}
