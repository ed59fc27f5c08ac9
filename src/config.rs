use anyhow::Result;

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_PORT: u16 = 8080;

// Default cache TTLs (in seconds). Each derived entry kind carries its own
// staleness bound; TTL is the only bound on entries a write never touches.
const DEFAULT_CONVERSATION_TTL_SECS: u64 = 600; // 10 minutes
const DEFAULT_PROFILE_TTL_SECS: u64 = 1800; // 30 minutes
const DEFAULT_MESSAGE_COUNT_TTL_SECS: u64 = 300; // 5 minutes
const DEFAULT_LAST_MESSAGE_TTL_SECS: u64 = 1200; // 20 minutes
const DEFAULT_CONVERSATION_LIST_TTL_SECS: u64 = 900; // 15 minutes

// Outbox dispatcher defaults
const DEFAULT_OUTBOX_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_OUTBOX_BATCH_SIZE: i64 = 100;

// Database pool defaults
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

const MIN_JWT_SECRET_LEN: usize = 32;

// ============================================================================
// Configuration Structures
// ============================================================================

/// Kafka producer configuration
#[derive(Clone, Debug)]
pub struct KafkaConfig {
    /// Whether notification publishing is enabled (KAFKA_ENABLED)
    pub enabled: bool,
    /// Comma-separated broker list (bootstrap.servers)
    pub brokers: String,
    /// Topic for new-message notification events
    pub topic: String,
}

impl KafkaConfig {
    fn from_env() -> Self {
        Self {
            enabled: std::env::var("KAFKA_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            brokers: std::env::var("KAFKA_BROKERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            topic: std::env::var("KAFKA_NOTIFICATION_TOPIC")
                .unwrap_or_else(|_| "courier.notifications".to_string()),
        }
    }
}

/// Per-kind TTLs for derived cache entries
#[derive(Clone, Debug)]
pub struct CacheTtlConfig {
    pub conversation_secs: u64,
    pub profile_secs: u64,
    pub message_count_secs: u64,
    pub last_message_secs: u64,
    pub conversation_list_secs: u64,
}

impl CacheTtlConfig {
    fn from_env() -> Self {
        Self {
            conversation_secs: env_u64(
                "CACHE_CONVERSATION_TTL_SECS",
                DEFAULT_CONVERSATION_TTL_SECS,
            ),
            profile_secs: env_u64("CACHE_PROFILE_TTL_SECS", DEFAULT_PROFILE_TTL_SECS),
            message_count_secs: env_u64(
                "CACHE_MESSAGE_COUNT_TTL_SECS",
                DEFAULT_MESSAGE_COUNT_TTL_SECS,
            ),
            last_message_secs: env_u64(
                "CACHE_LAST_MESSAGE_TTL_SECS",
                DEFAULT_LAST_MESSAGE_TTL_SECS,
            ),
            conversation_list_secs: env_u64(
                "CACHE_CONVERSATION_LIST_TTL_SECS",
                DEFAULT_CONVERSATION_LIST_TTL_SECS,
            ),
        }
    }
}

/// Outbox dispatcher configuration
#[derive(Clone, Debug)]
pub struct OutboxConfig {
    pub poll_interval_ms: u64,
    pub batch_size: i64,
}

impl OutboxConfig {
    fn from_env() -> Self {
        Self {
            poll_interval_ms: env_u64("OUTBOX_POLL_INTERVAL_MS", DEFAULT_OUTBOX_POLL_INTERVAL_MS),
            batch_size: std::env::var("OUTBOX_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_OUTBOX_BATCH_SIZE),
        }
    }
}

/// Database connection pool configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    fn from_env() -> Self {
        Self {
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            acquire_timeout_secs: env_u64(
                "DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub port: u16,
    pub rust_log: String,
    pub db: DbConfig,
    pub kafka: KafkaConfig,
    pub cache_ttl: CacheTtlConfig,
    pub outbox: OutboxConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = std::env::var("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            );
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            jwt_secret,
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "courier".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            db: DbConfig::from_env(),
            kafka: KafkaConfig::from_env(),
            cache_ttl: CacheTtlConfig::from_env(),
            outbox: OutboxConfig::from_env(),
        })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
