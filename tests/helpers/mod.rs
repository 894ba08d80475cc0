//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use sessionguard_auth::{AdmissionController, AdmissionOutcome, SessionRegistry, StoreTokenStore};
use sessionguard_core::config::SessionConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{
    AccessTokenDetails, HashFields, ScoredMember, SessionStore, TokenStore,
};
use sessionguard_core::types::DeviceType;
use sessionguard_entity::session::SessionRecord;
use sessionguard_service::{SessionQueryService, SessionTerminator};
use sessionguard_store::keys;
use sessionguard_store::memory::MemorySessionStore;

/// Test application context
pub struct TestApp {
    /// Backing store, for direct inspection
    pub store: Arc<dyn SessionStore>,
    /// Token store used to issue tokens at login
    pub tokens: Arc<StoreTokenStore>,
    /// Registry shared by every service below
    pub registry: SessionRegistry,
    /// Admission controller
    pub admission: AdmissionController,
    /// Listing service
    pub query: SessionQueryService,
    /// Termination service
    pub terminator: SessionTerminator,
    /// Session config in effect
    pub config: SessionConfig,
}

impl TestApp {
    /// Create a test application with the default test config
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a test application with a custom session config
    pub fn with_config(config: SessionConfig) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let tokens = Arc::new(StoreTokenStore::new(Arc::clone(&store)));
        let revoker: Arc<dyn TokenStore> = tokens.clone();
        Self::assemble(store, tokens, revoker, config)
    }

    /// Create a test application whose token revocation always fails
    pub fn with_failing_revocation(config: SessionConfig) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let tokens = Arc::new(StoreTokenStore::new(Arc::clone(&store)));
        let revoker: Arc<dyn TokenStore> = Arc::new(FailingTokenStore);
        Self::assemble(store, tokens, revoker, config)
    }

    /// Create a test application over a custom session store
    pub fn with_store(config: SessionConfig, store: Arc<dyn SessionStore>) -> Self {
        let tokens = Arc::new(StoreTokenStore::new(Arc::clone(&store)));
        let revoker: Arc<dyn TokenStore> = tokens.clone();
        Self::assemble(store, tokens, revoker, config)
    }

    fn assemble(
        store: Arc<dyn SessionStore>,
        tokens: Arc<StoreTokenStore>,
        revoker: Arc<dyn TokenStore>,
        config: SessionConfig,
    ) -> Self {
        let registry = SessionRegistry::new(Arc::clone(&store), revoker, &config);
        Self {
            admission: AdmissionController::new(registry.clone(), &config),
            query: SessionQueryService::new(registry.clone()),
            terminator: SessionTerminator::new(registry.clone()),
            store,
            tokens,
            registry,
            config,
        }
    }

    /// Issue tokens and admit a session that logged in `age_ms` ago
    pub async fn login(
        &self,
        username: &str,
        device_type: DeviceType,
        age_ms: i64,
    ) -> AppResult<(SessionRecord, AdmissionOutcome)> {
        let record = session(username, device_type, age_ms);
        let token = self
            .tokens
            .issue(&record.id, username, self.config.ttl())
            .await?;
        let record = record.with_access_token(token.token_id);
        let outcome = self.admission.admit(&record).await?;
        Ok((record, outcome))
    }

    /// Write a record and index entry directly, bypassing admission
    pub async fn insert(&self, record: &SessionRecord) {
        self.registry
            .write(record)
            .await
            .expect("Failed to write session");
    }

    /// Add an index entry with no record behind it
    pub async fn insert_orphan(&self, username: &str, session_id: &str, age_ms: i64) {
        self.store
            .zset_add(
                &keys::user_session_index(username),
                session_id,
                (now_ms() - age_ms) as f64,
                self.config.ttl(),
            )
            .await
            .expect("Failed to write index entry");
    }

    /// Ids in a user's index, oldest first
    pub async fn index_ids(&self, username: &str) -> Vec<String> {
        self.registry
            .entries(username)
            .await
            .expect("Failed to read index")
            .into_iter()
            .map(|e| e.member)
            .collect()
    }

    /// Whether a session record exists
    pub async fn record_exists(&self, session_id: &str) -> bool {
        self.registry
            .load_fields(session_id)
            .await
            .expect("Failed to read record")
            .is_some()
    }

    /// Whether a session's refresh token is still present
    pub async fn has_tokens(&self, session_id: &str) -> bool {
        self.tokens
            .validate_refresh_token(session_id)
            .await
            .expect("Failed to read token")
    }

    /// Milliseconds past the TTL, for backdating stale entries
    pub fn stale_age(&self) -> i64 {
        self.config.ttl_millis() + 60_000
    }
}

/// Session config used by most tests
pub fn test_config() -> SessionConfig {
    let mut limits = HashMap::new();
    limits.insert("PC".to_string(), 1);
    limits.insert("MOBILE".to_string(), 2);
    limits.insert("WEB".to_string(), 1);
    limits.insert("MINI_PROGRAM".to_string(), 1);
    limits.insert("UNKNOWN".to_string(), 0);

    let mut config = SessionConfig {
        ttl_seconds: 3600,
        device_limits: limits,
        ..SessionConfig::default()
    };
    config.admission.lock_wait_millis = 2000;
    config.admission.lock_retry_millis = 10;
    config
}

/// A session record that logged in `age_ms` ago
pub fn session(username: &str, device_type: DeviceType, age_ms: i64) -> SessionRecord {
    SessionRecord::new(format!("uid-{username}"), username, device_type)
        .with_client(format!("{device_type} device"), "10.0.0.1", "Office")
        .with_login_time(now_ms() - age_ms)
}

/// Current time in epoch millis
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Token store whose revocation always fails
#[derive(Debug)]
pub struct FailingTokenStore;

#[async_trait]
impl TokenStore for FailingTokenStore {
    async fn delete_refresh_token_and_access_token(&self, _session_id: &str) -> AppResult<()> {
        Err(AppError::store("token store unavailable"))
    }

    async fn get_refresh_token(&self, _session_id: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn get_access_token(&self, _token_id: &str) -> AppResult<Option<AccessTokenDetails>> {
        Ok(None)
    }

    async fn validate_refresh_token(&self, _session_id: &str) -> AppResult<bool> {
        Ok(false)
    }
}

/// Memory store whose session record deletes fail once switched on
#[derive(Debug, Default)]
pub struct RecordDeleteFailingStore {
    inner: MemorySessionStore,
    failing: AtomicBool,
}

impl RecordDeleteFailingStore {
    /// Create the store with deletes still working
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later record delete fail
    pub fn fail_record_deletes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for RecordDeleteFailingStore {
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
        if self.failing.load(Ordering::SeqCst) && key.starts_with(&keys::session_record("")) {
            return Err(AppError::store("record delete failed"));
        }
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
