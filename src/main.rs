use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier::auth::AuthManager;
use courier::cache::{ConversationCache, RedisCache};
use courier::config::Config;
use courier::context::AppContext;
use courier::db::{self, PgMessageStore};
use courier::kafka::KafkaPublisher;
use courier::outbox::OutboxDispatcher;
use courier::routes;
use courier::service::ConversationService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so RUST_LOG from .env takes effect
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting courier server...");
    let config = Arc::new(config);

    // Database
    let pool = db::create_pool(&config).await?;

    info!("Applying database migrations...");
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to apply database migrations")?;
    info!("Database migrations applied");

    let store = Arc::new(PgMessageStore::new(pool.clone()));

    // Redis
    let redis = RedisCache::connect(&config.redis_url).await?;
    let cache = ConversationCache::new(Arc::new(redis), config.cache_ttl.clone());

    // Kafka
    let publisher = KafkaPublisher::new(&config.kafka)?;
    let publisher_for_shutdown = publisher.clone();

    // Auth
    let auth_manager = Arc::new(AuthManager::new(&config)?);

    let service = Arc::new(ConversationService::new(
        store.clone(),
        cache,
        auth_manager,
    ));

    // Outbox dispatcher runs until the process exits
    let dispatcher = OutboxDispatcher::new(store, Arc::new(publisher), &config.outbox);
    tokio::spawn(dispatcher.run());

    // HTTP server
    let app_context = Arc::new(AppContext::new(service, pool, config.clone()));
    let app = routes::create_router(app_context);

    let bind_address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Courier server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // Drain any buffered Kafka messages before exiting
    if let Err(e) = publisher_for_shutdown.flush(Duration::from_secs(5)).await {
        error!(error = %e, "Kafka flush on shutdown failed");
    }

    info!("Courier server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
