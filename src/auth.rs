use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub jti: String, // JWT ID (unique per token)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    pub iss: String, // Issuer
}

/// Identity verifier: resolves a caller token to a user id.
///
/// The service layer depends on this seam instead of the JWT machinery so
/// token verification can be faked in tests.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Uuid, AppError>;
}

/// HS256 JWT manager. Verifies tokens issued by the account service
/// (shared secret, issuer-validated) and can mint tokens for tooling.
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    token_ttl_hours: i64,
}

impl AuthManager {
    pub fn new(config: &Config) -> Result<Self> {
        if config.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must be set");
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        })
    }

    /// Create an access token for a user. Used by operational tooling and
    /// tests; clients normally arrive with tokens minted elsewhere.
    pub fn create_token(&self, user_id: &Uuid) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.token_ttl_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")
    }

    /// Verify a JWT and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.clone()]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .context("Token verification failed")?;

        Ok(token_data.claims)
    }
}

impl TokenVerifier for AuthManager {
    fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let claims = self
            .verify_token(token)
            .map_err(|e| AppError::Auth(format!("Invalid or expired token: {}", e)))?;

        Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            redis_url: String::new(),
            jwt_secret: "a1b2c3d4e5f6g7h8i9j0k1l2m3n4o5p6q7r8s9t0".to_string(),
            jwt_issuer: "courier-test".to_string(),
            port: 8080,
            rust_log: "info".to_string(),
            db: crate::config::DbConfig {
                max_connections: 5,
                acquire_timeout_secs: 5,
            },
            kafka: crate::config::KafkaConfig {
                enabled: false,
                brokers: String::new(),
                topic: String::new(),
            },
            cache_ttl: crate::config::CacheTtlConfig {
                conversation_secs: 600,
                profile_secs: 1800,
                message_count_secs: 300,
                last_message_secs: 1200,
                conversation_list_secs: 900,
            },
            outbox: crate::config::OutboxConfig {
                poll_interval_ms: 1000,
                batch_size: 100,
            },
        }
    }

    #[test]
    fn token_roundtrip_resolves_to_user() {
        let manager = AuthManager::new(&test_config()).unwrap();
        let user_id = Uuid::new_v4();

        let token = manager.create_token(&user_id).unwrap();
        let resolved = manager.verify(&token).unwrap();

        assert_eq!(resolved, user_id);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let manager = AuthManager::new(&test_config()).unwrap();

        let err = manager.verify("not-a-jwt").unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[test]
    fn token_from_other_issuer_is_rejected() {
        let mut other = test_config();
        other.jwt_issuer = "someone-else".to_string();

        let foreign = AuthManager::new(&other).unwrap();
        let manager = AuthManager::new(&test_config()).unwrap();

        let token = foreign.create_token(&Uuid::new_v4()).unwrap();
        assert!(manager.verify(&token).is_err());
    }
}
