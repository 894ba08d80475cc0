//! Store manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use sessionguard_core::config::store::StoreConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{HashFields, ScoredMember, SessionStore};

/// Wraps the session store backend selected by configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    inner: Arc<dyn SessionStore>,
}

impl StoreManager {
    /// Create a store manager from configuration.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn SessionStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis session store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisSessionStore::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory session store");
                Arc::new(crate::memory::MemorySessionStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing backend (for testing).
    pub fn from_store(store: Arc<dyn SessionStore>) -> Self {
        Self { inner: store }
    }

    /// Shared handle to the backend.
    pub fn shared(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl SessionStore for StoreManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.set_nx(key, value, ttl).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> AppResult<bool> {
        self.inner.compare_and_delete(key, expected).await
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        self.inner.delete(key).await
    }

    async fn hash_get_all(&self, key: &str) -> AppResult<Option<HashFields>> {
        self.inner.hash_get_all(key).await
    }

    async fn hash_put_all(&self, key: &str, fields: &HashFields, ttl: Duration) -> AppResult<()> {
        self.inner.hash_put_all(key, fields, ttl).await
    }

    async fn zset_add(
        &self,
        key: &str,
        member: &str,
        score: f64,
        ttl: Duration,
    ) -> AppResult<()> {
        self.inner.zset_add(key, member, score, ttl).await
    }

    async fn zset_remove(&self, key: &str, member: &str) -> AppResult<bool> {
        self.inner.zset_remove(key, member).await
    }

    async fn zset_all_with_scores(&self, key: &str) -> AppResult<Vec<ScoredMember>> {
        self.inner.zset_all_with_scores(key).await
    }

    async fn scan_zsets(&self, pattern: &str) -> AppResult<Vec<(String, Vec<ScoredMember>)>> {
        self.inner.scan_zsets(pattern).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
