//! Session record and per-user index maintenance.
//!
//! A session lives in two places: its record hash and its entry in the
//! owner's index sorted set. The two writes are not transactional, so
//! every read path here tolerates an index entry without a record and
//! cleans it up on the way through.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use sessionguard_core::config::SessionConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{HashFields, ScoredMember, SessionStore, TokenStore};
use sessionguard_core::types::DeviceType;
use sessionguard_entity::session::fields::{self, string_field};
use sessionguard_entity::session::{SessionRecord, SessionView};
use sessionguard_store::keys;

/// A live index entry whose record was found.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSession {
    /// Session id.
    pub id: String,
    /// Device class read from the record.
    pub device_type: DeviceType,
    /// Index score (login time, epoch millis).
    pub score: f64,
}

/// Reads and writes session records and their per-user index.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    tokens: Arc<dyn TokenStore>,
    ttl: Duration,
    ttl_millis: i64,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Create a registry over a store and token store.
    pub fn new(
        store: Arc<dyn SessionStore>,
        tokens: Arc<dyn TokenStore>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            ttl: config.ttl(),
            ttl_millis: config.ttl_millis(),
        }
    }

    /// The backing session store.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    /// The token store used for revocation.
    pub fn tokens(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.tokens)
    }

    /// Session TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Index entries with a score at or below this are stale.
    fn stale_cutoff(&self) -> f64 {
        Utc::now().timestamp_millis().saturating_sub(self.ttl_millis) as f64
    }

    /// Whether an index score is past the session TTL.
    pub fn is_stale(&self, score: f64) -> bool {
        score <= self.stale_cutoff()
    }

    /// All index entries of a user, ascending by login time.
    pub async fn entries(&self, username: &str) -> AppResult<Vec<ScoredMember>> {
        self.store
            .zset_all_with_scores(&keys::user_session_index(username))
            .await
    }

    /// Index entries of a user that are not yet stale.
    pub async fn live_entries(&self, username: &str) -> AppResult<Vec<ScoredMember>> {
        let cutoff = self.stale_cutoff();
        Ok(self
            .entries(username)
            .await?
            .into_iter()
            .filter(|e| e.score > cutoff)
            .collect())
    }

    /// Every per-user index, keyed by username.
    pub async fn indexes(&self) -> AppResult<Vec<(String, Vec<ScoredMember>)>> {
        let found = self
            .store
            .scan_zsets(keys::USER_SESSION_INDEX_PATTERN)
            .await?;
        Ok(found
            .into_iter()
            .filter_map(|(key, members)| {
                keys::username_from_index_key(&key).map(|u| (u.to_string(), members))
            })
            .collect())
    }

    /// Every username that currently has an index.
    pub async fn usernames(&self) -> AppResult<Vec<String>> {
        Ok(self.indexes().await?.into_iter().map(|(u, _)| u).collect())
    }

    /// Raw stored fields of a session record.
    pub async fn load_fields(&self, session_id: &str) -> AppResult<Option<HashFields>> {
        self.store
            .hash_get_all(&keys::session_record(session_id))
            .await
    }

    /// Decoded session record, if present and decodable.
    pub async fn find_record(&self, session_id: &str) -> AppResult<Option<SessionView>> {
        let Some(fields) = self.load_fields(session_id).await? else {
            return Ok(None);
        };
        let view = SessionView::from_fields(&fields, None);
        if view.is_none() {
            warn!(session_id = %session_id, "Session record has no id or username");
        }
        Ok(view)
    }

    /// Write a record and its index entry with the session TTL.
    pub async fn write(&self, record: &SessionRecord) -> AppResult<()> {
        self.store
            .hash_put_all(
                &keys::session_record(&record.id),
                &record.to_fields(),
                self.ttl,
            )
            .await?;
        self.store
            .zset_add(
                &keys::user_session_index(&record.username),
                &record.id,
                record.login_time as f64,
                self.ttl,
            )
            .await?;
        debug!(
            username = %record.username,
            session_id = %record.id,
            device_type = %record.device_type,
            "Session written"
        );
        Ok(())
    }

    /// Remove a session and revoke its tokens.
    ///
    /// Tokens are revoked first and every step is attempted; the first
    /// failure is returned. The index entry is only dropped once the
    /// record is gone, so a failed record delete stays visible for a
    /// retry. Returns `true` when a record existed.
    pub async fn remove(&self, username: &str, session_id: &str) -> AppResult<bool> {
        let mut failure: Option<AppError> = None;

        if let Err(e) = self
            .tokens
            .delete_refresh_token_and_access_token(session_id)
            .await
        {
            warn!(username = %username, session_id = %session_id, error = %e, "Failed to revoke tokens of removed session");
            failure = Some(e);
        }

        let existed = match self.store.delete(&keys::session_record(session_id)).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(username = %username, session_id = %session_id, error = %e, "Failed to delete session record");
                return Err(failure.unwrap_or(e));
            }
        };

        if let Err(e) = self
            .store
            .zset_remove(&keys::user_session_index(username), session_id)
            .await
        {
            warn!(username = %username, session_id = %session_id, error = %e, "Failed to remove session from index");
            failure.get_or_insert(e);
        }

        if let Some(e) = failure {
            return Err(e);
        }
        info!(username = %username, session_id = %session_id, "Session removed");
        Ok(existed)
    }

    /// Best-effort removal of a session.
    ///
    /// Every step is attempted and failures are logged. Returns `true`
    /// when both the record and the index entry are gone; a failed token
    /// revocation alone does not count as a failure.
    pub async fn evict(&self, username: &str, session_id: &str) -> bool {
        if let Err(e) = self
            .tokens
            .delete_refresh_token_and_access_token(session_id)
            .await
        {
            warn!(
                username = %username,
                session_id = %session_id,
                error = %e,
                "Failed to revoke tokens of evicted session"
            );
        }

        let mut clean = true;
        if let Err(e) = self.store.delete(&keys::session_record(session_id)).await {
            warn!(
                username = %username,
                session_id = %session_id,
                error = %e,
                "Failed to delete evicted session record"
            );
            clean = false;
        }
        if let Err(e) = self
            .store
            .zset_remove(&keys::user_session_index(username), session_id)
            .await
        {
            warn!(
                username = %username,
                session_id = %session_id,
                error = %e,
                "Failed to remove evicted session from index"
            );
            clean = false;
        }
        clean
    }

    /// Drop every stale index entry of a user along with its record and
    /// tokens.
    ///
    /// Never fails; problems are logged. Returns the number of entries
    /// fully cleaned.
    pub async fn prune_expired(&self, username: &str) -> u32 {
        let entries = match self.entries(username).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(username = %username, error = %e, "Failed to read session index for pruning");
                return 0;
            }
        };

        let cutoff = self.stale_cutoff();
        let mut pruned = 0u32;
        for entry in entries.iter().filter(|e| e.score <= cutoff) {
            if self.evict(username, &entry.member).await {
                pruned += 1;
            }
        }

        if pruned > 0 {
            info!(username = %username, pruned = pruned, "Pruned stale sessions");
        }
        pruned
    }

    /// Live sessions of a user whose record exists, oldest first.
    ///
    /// Index entries whose record is missing are evicted on the way.
    pub async fn live_sessions(&self, username: &str) -> AppResult<Vec<IndexedSession>> {
        let mut sessions = Vec::new();
        for entry in self.live_entries(username).await? {
            match self.load_fields(&entry.member).await? {
                Some(map) => sessions.push(IndexedSession {
                    device_type: string_field(&map, fields::DEVICE_TYPE)
                        .map(|s| DeviceType::parse(&s))
                        .unwrap_or(DeviceType::Unknown),
                    id: entry.member,
                    score: entry.score,
                }),
                None => {
                    debug!(username = %username, session_id = %entry.member, "Dropping orphaned index entry");
                    self.evict(username, &entry.member).await;
                }
            }
        }
        Ok(sessions)
    }

    /// Number of live sessions of one device class.
    pub async fn count_by_type(&self, username: &str, device_type: DeviceType) -> AppResult<u32> {
        let count = self
            .live_sessions(username)
            .await?
            .iter()
            .filter(|s| s.device_type == device_type)
            .count();
        u32::try_from(count).map_err(|_| AppError::internal("Session count overflow"))
    }

    /// Oldest live session, optionally restricted to one device class.
    pub async fn oldest(
        &self,
        username: &str,
        device_type: Option<DeviceType>,
    ) -> AppResult<Option<IndexedSession>> {
        Ok(self
            .live_sessions(username)
            .await?
            .into_iter()
            .find(|s| device_type.is_none_or(|t| s.device_type == t)))
    }

    /// Evict every session of a user, stale or not. Returns the ids.
    pub async fn clear_user(&self, username: &str) -> AppResult<Vec<String>> {
        let mut cleared = Vec::new();
        for entry in self.entries(username).await? {
            self.evict(username, &entry.member).await;
            cleared.push(entry.member);
        }
        Ok(cleared)
    }
}
