//! Application state management

use crate::auth::{Argon2Hasher, TokenCodec};
use crate::middleware::HttpMetrics;
use quill_core::{AppConfig, MemoryStore, PostStore, UserStore};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
///
/// Everything here is either read-only after startup or internally
/// synchronized.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Token signer/verifier built from the configured secret
    pub codec: TokenCodec,
    /// Hasher for new password digests
    pub password: Argon2Hasher,
    /// User records
    pub users: Arc<dyn UserStore>,
    /// Post records
    pub posts: Arc<dyn PostStore>,
    /// Request metrics
    pub metrics: HttpMetrics,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create application state over the given stores
    ///
    /// Fails if the Argon2 parameters are unusable.
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            codec: TokenCodec::from_config(&config.auth),
            password: Argon2Hasher::from_config(&config.auth)?,
            metrics: HttpMetrics::new()?,
            config,
            users,
            posts,
            start_time: Instant::now(),
        })
    }

    /// Create application state backed by a fresh in-memory store
    pub fn in_memory(config: AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }

    /// In-memory state with a fixed secret and cheap hashing
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.auth.argon2_memory_kib = 1024;
        config.auth.argon2_iterations = 1;
        config.auth.argon2_parallelism = 1;

        Self::in_memory(config).expect("Failed to build test state")
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn expose_password_digest(&self) -> bool {
        self.config.api.expose_password_digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use uuid::Uuid;

    #[test]
    fn test_codec_uses_configured_secret() {
        let state = AppState::for_testing();
        let token = state.codec.encode(&Claims::for_user(Uuid::new_v4())).unwrap();

        assert!(TokenCodec::new(b"test-secret").decode(&token).is_ok());
        assert!(TokenCodec::new(b"other").decode(&token).is_err());
    }

    #[test]
    fn test_hasher_follows_auth_config() {
        let state = AppState::for_testing();
        assert_eq!(state.password.params().m_cost(), 1024);
        assert_eq!(state.password.params().t_cost(), 1);
        assert!(!state.expose_password_digest());
    }
}
