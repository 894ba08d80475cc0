//! In-memory session store on dashmap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tokio::time::Instant;
use tracing::debug;

use sessionguard_core::error::{AppError, ErrorKind};
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{HashFields, ScoredMember, SessionStore};

use super::glob;

/// Value held under one key.
#[derive(Debug, Clone)]
enum Stored {
    Str(String),
    Hash(HashFields),
    SortedSet(HashMap<String, f64>),
}

/// One key with its deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: Stored,
    expires_at: Instant,
}

impl Entry {
    fn new(value: Stored, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory session store.
///
/// Expiry is lazy: an expired key is invisible to every read and is
/// dropped the next time it is touched. Uses the tokio clock, so paused
/// test runtimes can advance past TTLs.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop `key` if it has expired.
    fn evict_expired(&self, key: &str) {
        self.entries.remove_if(key, |_, e| e.is_expired());
    }

    fn wrong_type(key: &str) -> AppError {
        AppError::new(
            ErrorKind::Store,
            format!("WRONGTYPE operation against key '{key}' holding another kind of value"),
        )
    }

    fn sorted(set: &HashMap<String, f64>) -> Vec<ScoredMember> {
        let mut members: Vec<ScoredMember> = set
            .iter()
            .map(|(m, s)| ScoredMember::new(m.clone(), *s))
            .collect();
        members.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.member.cmp(&b.member)));
        members
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.evict_expired(key);
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Stored::Str(s) => Ok(Some(s.clone())),
                _ => Err(Self::wrong_type(key)),
            },
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.entries
            .insert(key.to_string(), Entry::new(Stored::Str(value.to_string()), ttl));
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let fresh = Entry::new(Stored::Str(value.to_string()), ttl);
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(fresh);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> AppResult<bool> {
        let removed = self.entries.remove_if(key, |_, e| {
            !e.is_expired() && matches!(&e.value, Stored::Str(s) if s == expected)
        });
        Ok(removed.is_some())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired()))
    }

    async fn hash_get_all(&self, key: &str) -> AppResult<Option<HashFields>> {
        self.evict_expired(key);
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Stored::Hash(fields) if fields.is_empty() => Ok(None),
                Stored::Hash(fields) => Ok(Some(fields.clone())),
                _ => Err(Self::wrong_type(key)),
            },
        }
    }

    async fn hash_put_all(&self, key: &str, fields: &HashFields, ttl: Duration) -> AppResult<()> {
        self.evict_expired(key);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Stored::Hash(HashFields::new()), ttl));
        match &mut entry.value {
            Stored::Hash(existing) => {
                existing.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            _ => return Err(Self::wrong_type(key)),
        }
        entry.expires_at = Instant::now() + ttl;
        Ok(())
    }

    async fn zset_add(
        &self,
        key: &str,
        member: &str,
        score: f64,
        ttl: Duration,
    ) -> AppResult<()> {
        self.evict_expired(key);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Stored::SortedSet(HashMap::new()), ttl));
        match &mut entry.value {
            Stored::SortedSet(set) => {
                set.insert(member.to_string(), score);
            }
            _ => return Err(Self::wrong_type(key)),
        }
        entry.expires_at = Instant::now() + ttl;
        Ok(())
    }

    async fn zset_remove(&self, key: &str, member: &str) -> AppResult<bool> {
        self.evict_expired(key);
        let removed = match self.entries.get_mut(key) {
            None => return Ok(false),
            Some(mut entry) => match &mut entry.value {
                Stored::SortedSet(set) => set.remove(member).is_some(),
                _ => return Err(Self::wrong_type(key)),
            },
        };
        // Empty sorted sets cease to exist.
        self.entries
            .remove_if(key, |_, e| matches!(&e.value, Stored::SortedSet(s) if s.is_empty()));
        Ok(removed)
    }

    async fn zset_all_with_scores(&self, key: &str) -> AppResult<Vec<ScoredMember>> {
        self.evict_expired(key);
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(entry) => match &entry.value {
                Stored::SortedSet(set) => Ok(Self::sorted(set)),
                _ => Err(Self::wrong_type(key)),
            },
        }
    }

    async fn scan_zsets(&self, pattern: &str) -> AppResult<Vec<(String, Vec<ScoredMember>)>> {
        let mut found: Vec<(String, Vec<ScoredMember>)> = self
            .entries
            .iter()
            .filter(|e| !e.is_expired() && glob::matches(pattern, e.key()))
            .filter_map(|e| match &e.value {
                Stored::SortedSet(set) => Some((e.key().clone(), Self::sorted(set))),
                _ => None,
            })
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(pattern, count = found.len(), "Scanned sorted sets");
        Ok(found)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
