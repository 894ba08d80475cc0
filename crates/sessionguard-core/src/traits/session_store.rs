//! Session store trait for pluggable TTL-bearing storage backends.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Field map of a stored hash.
///
/// Values are JSON scalars. Backends that only keep strings (Redis) hand
/// every value back as a JSON string, so readers must accept both shapes.
pub type HashFields = HashMap<String, serde_json::Value>;

/// One member of a sorted set together with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMember {
    /// The member value.
    pub member: String,
    /// The member's score.
    pub score: f64,
}

impl ScoredMember {
    /// Create a scored member.
    pub fn new(member: impl Into<String>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// Trait for session store backends (Redis or in-memory).
///
/// The store is responsible for key prefixing and TTL enforcement.
/// Every method is a network round-trip on distributed backends; none of
/// them is transactional with any other.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a string value. Returns `None` if the key is missing or expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a string value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value only if the key does not already exist (NX).
    /// Returns `true` if the value was set.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Delete `key` only while it still holds `expected`.
    /// Returns `true` if the key was deleted.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> AppResult<bool>;

    /// Delete a key of any type. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Get every field of a hash, or `None` if the hash does not exist.
    async fn hash_get_all(&self, key: &str) -> AppResult<Option<HashFields>>;

    /// Write all fields of a hash and (re)set its TTL.
    async fn hash_put_all(&self, key: &str, fields: &HashFields, ttl: Duration) -> AppResult<()>;

    /// Add or update a sorted-set member and (re)set the set's TTL.
    async fn zset_add(&self, key: &str, member: &str, score: f64, ttl: Duration)
    -> AppResult<()>;

    /// Remove a sorted-set member. Returns `true` if it was present.
    async fn zset_remove(&self, key: &str, member: &str) -> AppResult<bool>;

    /// All members of a sorted set, ascending by score.
    async fn zset_all_with_scores(&self, key: &str) -> AppResult<Vec<ScoredMember>>;

    /// Every sorted set whose key matches a glob `pattern`, with its members.
    ///
    /// Returned keys are unprefixed, in the same form callers pass in.
    async fn scan_zsets(&self, pattern: &str) -> AppResult<Vec<(String, Vec<ScoredMember>)>>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
