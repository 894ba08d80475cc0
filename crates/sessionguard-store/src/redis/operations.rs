//! Redis session store implementation.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Script};
use serde_json::Value;
use tracing::debug;

use sessionguard_core::error::{AppError, ErrorKind};
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{HashFields, ScoredMember, SessionStore};

use super::client::RedisClient;

/// Delete KEYS[1] only while it holds ARGV[1].
///
/// Returns 1 when deleted, 0 otherwise.
const COMPARE_AND_DELETE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
"#;

/// Redis-backed session store.
#[derive(Debug, Clone)]
pub struct RedisSessionStore {
    client: RedisClient,
}

impl RedisSessionStore {
    /// Wrap a connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Store, format!("Redis error: {e}"), e)
    }

    /// Whole seconds for `EXPIRE`, at least one.
    fn ttl_secs(ttl: Duration) -> i64 {
        i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1)
    }

    /// Hash values go over the wire as plain strings.
    fn field_text(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Option<String> = conn.get(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .set_ex(&full_key, value, Self::ttl_secs(ttl) as u64)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();

        // SET key value PX ttl NX
        let result: Option<String> = redis::cmd("SET")
            .arg(&full_key)
            .arg(value)
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        Ok(result.is_some())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let deleted: i64 = Script::new(COMPARE_AND_DELETE_SCRIPT)
            .key(&full_key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(deleted == 1)
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let removed: i64 = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(removed > 0)
    }

    async fn hash_get_all(&self, key: &str) -> AppResult<Option<HashFields>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let raw: HashMap<String, String> = conn.hgetall(&full_key).await.map_err(Self::map_err)?;
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            raw.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
        ))
    }

    async fn hash_put_all(&self, key: &str, fields: &HashFields, ttl: Duration) -> AppResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let full_key = self.client.prefixed_key(key);
        let items: Vec<(String, String)> = fields
            .iter()
            .map(|(k, v)| (k.clone(), Self::field_text(v)))
            .collect();

        let mut conn = self.client.conn_mut();
        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(&full_key, items.as_slice())
            .ignore()
            .expire(&full_key, Self::ttl_secs(ttl))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn zset_add(
        &self,
        key: &str,
        member: &str,
        score: f64,
        ttl: Duration,
    ) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = redis::pipe()
            .atomic()
            .zadd(&full_key, member, score)
            .ignore()
            .expire(&full_key, Self::ttl_secs(ttl))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn zset_remove(&self, key: &str, member: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let removed: i64 = conn.zrem(&full_key, member).await.map_err(Self::map_err)?;
        Ok(removed > 0)
    }

    async fn zset_all_with_scores(&self, key: &str) -> AppResult<Vec<ScoredMember>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let raw: Vec<(String, f64)> = conn
            .zrange_withscores(&full_key, 0, -1)
            .await
            .map_err(Self::map_err)?;
        Ok(raw
            .into_iter()
            .map(|(member, score)| ScoredMember::new(member, score))
            .collect())
    }

    async fn scan_zsets(&self, pattern: &str) -> AppResult<Vec<(String, Vec<ScoredMember>)>> {
        let full_pattern = self.client.prefixed_key(pattern);
        let mut conn = self.client.conn_mut();

        // SCAN may return a key more than once.
        let mut keys: BTreeSet<String> = BTreeSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&full_pattern)
                .arg("COUNT")
                .arg(self.client.scan_count())
                .arg("TYPE")
                .arg("zset")
                .query_async(&mut conn)
                .await
                .map_err(Self::map_err)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        let mut found = Vec::with_capacity(keys.len());
        for full_key in keys {
            let key = self.client.unprefixed_key(&full_key).to_string();
            let members = self.zset_all_with_scores(&key).await?;
            if !members.is_empty() {
                found.push((key, members));
            }
        }

        debug!(pattern, count = found.len(), "Scanned sorted sets");
        Ok(found)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
