// Conversation service behavior against in-memory fakes: persistence,
// cache-aside reads, invalidation, and ownership checks.


use std::sync::Arc;
use test_utils::{register_user, spawn_service, FailingCache, StaticVerifier};
use uuid::Uuid;

use courier::cache::{conversation_key, last_message_key, ConversationCache};
use courier::error::AppError;
use courier::service::ConversationService;

#[tokio::test]
async fn send_message_persists_and_writes_outbox() {
    let backend = spawn_service();
    let alice = register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    let message = backend
        .service
        .send_message("alice-token", bob, "hello bob")
        .await
        .unwrap();

    assert_eq!(message.sender_id, alice);
    assert_eq!(message.receiver_id, bob);
    assert_eq!(message.content, "hello bob");
    assert_eq!(backend.store.message_count(), 1);
    // Notification is durably queued, not published inline
    assert_eq!(backend.store.undispatched_count(), 1);
}

#[tokio::test]
async fn send_message_rejects_invalid_token() {
    let backend = spawn_service();
    let bob = register_user(&backend, "bob", "bob-token");

    let result = backend.service.send_message("bogus", bob, "hi").await;

    assert!(matches!(result, Err(AppError::Auth(_))));
    assert_eq!(backend.store.message_count(), 0);
}

#[tokio::test]
async fn send_message_rejects_unknown_receiver() {
    let backend = spawn_service();
    register_user(&backend, "alice", "alice-token");

    let result = backend
        .service
        .send_message("alice-token", Uuid::new_v4(), "hi")
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(backend.store.message_count(), 0);
    assert_eq!(backend.store.undispatched_count(), 0);
}

#[tokio::test]
async fn send_message_rejects_empty_content() {
    let backend = spawn_service();
    register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    let result = backend.service.send_message("alice-token", bob, "   ").await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn send_message_rejects_self_send() {
    let backend = spawn_service();
    let alice = register_user(&backend, "alice", "alice-token");

    let result = backend.service.send_message("alice-token", alice, "hi").await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn get_messages_returns_both_directions() {
    let backend = spawn_service();
    let alice = register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    backend
        .service
        .send_message("alice-token", bob, "first")
        .await
        .unwrap();
    backend
        .service
        .send_message("bob-token", alice, "second")
        .await
        .unwrap();

    let history = backend
        .service
        .get_messages("alice-token", bob)
        .await
        .unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "first");
    assert_eq!(history[1].content, "second");
}

#[tokio::test]
async fn get_messages_populates_shared_cache_entry() {
    let backend = spawn_service();
    let alice = register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    backend
        .service
        .send_message("alice-token", bob, "hello")
        .await
        .unwrap();

    backend
        .service
        .get_messages("alice-token", bob)
        .await
        .unwrap();

    // One canonical key serves both participants
    assert!(backend.cache.contains(&conversation_key(alice, bob)));
    assert!(backend.cache.contains(&conversation_key(bob, alice)));

    let from_bob = backend
        .service
        .get_messages("bob-token", alice)
        .await
        .unwrap();
    assert_eq!(from_bob.len(), 1);
}

#[tokio::test]
async fn repeated_reads_are_stable() {
    let backend = spawn_service();
    let alice = register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    backend
        .service
        .send_message("alice-token", bob, "hello")
        .await
        .unwrap();

    let first = backend
        .service
        .get_messages("alice-token", bob)
        .await
        .unwrap();
    let second = backend
        .service
        .get_messages("bob-token", alice)
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn send_refreshes_last_message_slot() {
    let backend = spawn_service();
    let alice = register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    backend
        .service
        .send_message("alice-token", bob, "newest")
        .await
        .unwrap();

    assert!(backend.cache.contains(&last_message_key(alice, bob)));
}

#[tokio::test]
async fn send_invalidates_cached_history() {
    let backend = spawn_service();
    let alice = register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    backend
        .service
        .send_message("alice-token", bob, "one")
        .await
        .unwrap();
    backend
        .service
        .get_messages("alice-token", bob)
        .await
        .unwrap();
    assert!(backend.cache.contains(&conversation_key(alice, bob)));

    backend
        .service
        .send_message("alice-token", bob, "two")
        .await
        .unwrap();
    assert!(!backend.cache.contains(&conversation_key(alice, bob)));

    // Fresh read sees the new message
    let history = backend
        .service
        .get_messages("bob-token", alice)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn change_message_updates_content_and_invalidates() {
    let backend = spawn_service();
    let alice = register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    let message = backend
        .service
        .send_message("alice-token", bob, "typo")
        .await
        .unwrap();
    backend
        .service
        .get_messages("alice-token", bob)
        .await
        .unwrap();

    let updated = backend
        .service
        .change_message("alice-token", message.id, "fixed")
        .await
        .unwrap();

    assert_eq!(updated.content, "fixed");
    assert!(!backend.cache.contains(&conversation_key(alice, bob)));

    let history = backend
        .service
        .get_messages("bob-token", alice)
        .await
        .unwrap();
    assert_eq!(history[0].content, "fixed");
}

#[tokio::test]
async fn change_message_requires_sender() {
    let backend = spawn_service();
    register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    let message = backend
        .service
        .send_message("alice-token", bob, "mine")
        .await
        .unwrap();

    let result = backend
        .service
        .change_message("bob-token", message.id, "hijacked")
        .await;

    assert!(matches!(result, Err(AppError::PermissionDenied(_))));

    // Content untouched
    let history = backend
        .service
        .get_messages("bob-token", message.sender_id)
        .await
        .unwrap();
    assert_eq!(history[0].content, "mine");
}

#[tokio::test]
async fn change_missing_message_is_not_found() {
    let backend = spawn_service();
    register_user(&backend, "alice", "alice-token");

    let result = backend
        .service
        .change_message("alice-token", Uuid::new_v4(), "new")
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_message_removes_and_invalidates() {
    let backend = spawn_service();
    let alice = register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    let message = backend
        .service
        .send_message("alice-token", bob, "oops")
        .await
        .unwrap();
    backend
        .service
        .get_messages("alice-token", bob)
        .await
        .unwrap();

    backend
        .service
        .delete_message("alice-token", message.id)
        .await
        .unwrap();

    assert_eq!(backend.store.message_count(), 0);
    assert!(!backend.cache.contains(&conversation_key(alice, bob)));

    let history = backend
        .service
        .get_messages("bob-token", alice)
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn delete_message_requires_sender() {
    let backend = spawn_service();
    register_user(&backend, "alice", "alice-token");
    let bob = register_user(&backend, "bob", "bob-token");

    let message = backend
        .service
        .send_message("alice-token", bob, "keep")
        .await
        .unwrap();

    let result = backend.service.delete_message("bob-token", message.id).await;

    assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    assert_eq!(backend.store.message_count(), 1);
}

#[tokio::test]
async fn broken_cache_never_fails_requests() {
    let store = Arc::new(test_utils::InMemoryStore::new());
    let verifier = Arc::new(StaticVerifier::new());
    let service = ConversationService::new(
        store.clone(),
        ConversationCache::new(Arc::new(FailingCache), test_utils::test_ttls()),
        verifier.clone(),
    );

    let bob = store.add_user("bob");
    let alice = store.add_user("alice");
    verifier.register("alice-token", alice);
    verifier.register("bob-token", bob);

    let message = service
        .send_message("alice-token", bob, "through the storm")
        .await
        .unwrap();

    let history = service.get_messages("bob-token", alice).await.unwrap();
    assert_eq!(history.len(), 1);

    service
        .change_message("alice-token", message.id, "edited")
        .await
        .unwrap();
    service
        .delete_message("alice-token", message.id)
        .await
        .unwrap();
}
