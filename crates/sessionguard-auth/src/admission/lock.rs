//! Per-user admission locks.
//!
//! Two strategies:
//! - **local**: a mutex per username inside this process
//! - **distributed**: `SET NX PX` on the session store with a random owner
//!   token, released by compare-and-delete. The TTL bounds how long a
//!   crashed holder can block the user.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use sessionguard_core::config::{AdmissionConfig, LockMode};
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::SessionStore;
use sessionguard_store::keys;

/// Per-username mutexes for single-process serialization.
#[derive(Debug, Clone, Default)]
pub struct LocalLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LocalLocks {
    async fn acquire(&self, username: &str) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(self.locks.entry(username.to_string()).or_default().value());
        mutex.lock_owned().await
    }

    /// Drop the map entry once nobody holds or waits on it.
    fn forget_idle(&self, username: &str) {
        self.locks
            .remove_if(username, |_, m| Arc::strong_count(m) == 1);
    }
}

/// Store-backed lock shared by every process on the same store.
#[derive(Debug, Clone)]
pub struct DistributedLock {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    wait: Duration,
    retry: Duration,
}

impl DistributedLock {
    /// Create a distributed lock from admission settings.
    pub fn new(store: Arc<dyn SessionStore>, config: &AdmissionConfig) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(config.lock_ttl_seconds),
            wait: Duration::from_millis(config.lock_wait_millis),
            retry: Duration::from_millis(config.lock_retry_millis.max(1)),
        }
    }

    /// Retry `SET NX` until it succeeds or the wait budget runs out.
    async fn acquire(&self, username: &str) -> AppResult<(String, String)> {
        let key = keys::admission_lock(username);
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + self.wait;

        loop {
            if self.store.set_nx(&key, &token, self.ttl).await? {
                debug!(username = %username, "Acquired admission lock");
                return Ok((key, token));
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(username = %username, wait_ms = self.wait.as_millis() as u64, "Admission lock wait exhausted");
                return Err(AppError::conflict(format!(
                    "Another login for '{username}' is in progress"
                )));
            }
            tokio::time::sleep(self.retry.min(deadline - now)).await;
        }
    }
}

/// Admission lock strategy selected by `session.admission.lock`.
#[derive(Debug, Clone)]
pub enum AdmissionLock {
    /// In-process mutex map.
    Local(LocalLocks),
    /// Store-backed lock.
    Distributed(DistributedLock),
}

impl AdmissionLock {
    /// Build the configured lock.
    pub fn from_config(config: &AdmissionConfig, store: Arc<dyn SessionStore>) -> Self {
        match config.lock {
            LockMode::Local => Self::Local(LocalLocks::default()),
            LockMode::Distributed => Self::Distributed(DistributedLock::new(store, config)),
        }
    }

    /// Acquire the lock for `username`.
    ///
    /// Local locks wait indefinitely. Distributed locks fail with
    /// `Conflict` once the configured wait is exhausted.
    pub async fn acquire(&self, username: &str) -> AppResult<AdmissionGuard> {
        let held = match self {
            Self::Local(locks) => Held::Local {
                guard: locks.acquire(username).await,
                locks: locks.clone(),
            },
            Self::Distributed(lock) => {
                let (key, token) = lock.acquire(username).await?;
                Held::Distributed {
                    key,
                    token,
                    store: Arc::clone(&lock.store),
                }
            }
        };
        Ok(AdmissionGuard {
            username: username.to_string(),
            held: Some(held),
        })
    }
}

enum Held {
    Local {
        guard: OwnedMutexGuard<()>,
        locks: LocalLocks,
    },
    Distributed {
        key: String,
        token: String,
        store: Arc<dyn SessionStore>,
    },
}

/// Proof that the admission lock of one user is held.
///
/// Call [`AdmissionGuard::release`] when done. A guard dropped without
/// release (for example when the admitting future is cancelled) unlocks
/// in the background.
pub struct AdmissionGuard {
    username: String,
    held: Option<Held>,
}

impl std::fmt::Debug for AdmissionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.held {
            Some(Held::Local { .. }) => "local",
            Some(Held::Distributed { .. }) => "distributed",
            None => "released",
        };
        f.debug_struct("AdmissionGuard")
            .field("username", &self.username)
            .field("mode", &mode)
            .finish()
    }
}

impl AdmissionGuard {
    /// The user this guard locks.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Release the lock.
    ///
    /// A distributed lock that expired and was taken by someone else is
    /// left alone.
    pub async fn release(mut self) -> AppResult<()> {
        match self.held.take() {
            Some(Held::Local { guard, locks }) => {
                drop(guard);
                locks.forget_idle(&self.username);
            }
            Some(Held::Distributed { key, token, store }) => {
                if !store.compare_and_delete(&key, &token).await? {
                    warn!(username = %self.username, "Admission lock expired before release");
                }
            }
            None => {}
        }
        Ok(())
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        match self.held.take() {
            Some(Held::Local { guard, locks }) => {
                drop(guard);
                locks.forget_idle(&self.username);
            }
            Some(Held::Distributed { key, token, store }) => {
                let username = std::mem::take(&mut self.username);
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            if let Err(e) = store.compare_and_delete(&key, &token).await {
                                warn!(username = %username, error = %e, "Failed to release dropped admission lock");
                            }
                        });
                    }
                    Err(_) => {
                        warn!(username = %username, "Admission lock dropped outside a runtime; it expires with its TTL");
                    }
                }
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionguard_core::error::ErrorKind;
    use sessionguard_store::memory::MemorySessionStore;

    fn distributed(store: Arc<dyn SessionStore>, wait_ms: u64) -> AdmissionLock {
        let config = AdmissionConfig {
            lock: LockMode::Distributed,
            lock_wait_millis: wait_ms,
            lock_retry_millis: 10,
            ..AdmissionConfig::default()
        };
        AdmissionLock::from_config(&config, store)
    }

    #[tokio::test]
    async fn test_distributed_lock_excludes_and_releases() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let lock = distributed(Arc::clone(&store), 50);

        let guard = lock.acquire("alice").await.unwrap();
        let err = lock.acquire("alice").await.unwrap_err();
        assert!(err.is(ErrorKind::Conflict));

        // Other users are independent.
        lock.acquire("bob").await.unwrap().release().await.unwrap();

        guard.release().await.unwrap();
        let again = lock.acquire("alice").await.unwrap();
        again.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_release_leaves_foreign_lock() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let lock = distributed(Arc::clone(&store), 50);

        let guard = lock.acquire("alice").await.unwrap();
        // Simulate expiry followed by another owner taking over.
        store.delete(&keys::admission_lock("alice")).await.unwrap();
        store
            .set(&keys::admission_lock("alice"), "someone-else", Duration::from_secs(10))
            .await
            .unwrap();

        guard.release().await.unwrap();
        assert_eq!(
            store.get(&keys::admission_lock("alice")).await.unwrap().as_deref(),
            Some("someone-else")
        );
    }

    #[tokio::test]
    async fn test_local_lock_serializes() {
        let lock = AdmissionLock::from_config(
            &AdmissionConfig {
                lock: LockMode::Local,
                ..AdmissionConfig::default()
            },
            Arc::new(MemorySessionStore::new()),
        );

        let guard = lock.acquire("alice").await.unwrap();
        let contender = {
            let lock = lock.clone();
            tokio::spawn(async move { lock.acquire("alice").await.unwrap().release().await })
        };
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        guard.release().await.unwrap();
        contender.await.unwrap().unwrap();

        if let AdmissionLock::Local(locks) = &lock {
            assert!(locks.locks.is_empty());
        }
    }

    #[tokio::test]
    async fn test_dropped_distributed_guard_unlocks() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let lock = distributed(Arc::clone(&store), 500);

        let guard = lock.acquire("alice").await.unwrap();
        drop(guard);

        let again = lock.acquire("alice").await.unwrap();
        again.release().await.unwrap();
        assert!(store.get(&keys::admission_lock("alice")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_holder_frees_local_lock() {
        let lock = AdmissionLock::from_config(
            &AdmissionConfig {
                lock: LockMode::Local,
                ..AdmissionConfig::default()
            },
            Arc::new(MemorySessionStore::new()),
        );

        let holder = {
            let lock = lock.clone();
            tokio::spawn(async move {
                let _guard = lock.acquire("alice").await.unwrap();
                std::future::pending::<()>().await;
            })
        };
        tokio::task::yield_now().await;
        holder.abort();
        let _ = holder.await;

        lock.acquire("alice").await.unwrap().release().await.unwrap();
        if let AdmissionLock::Local(locks) = &lock {
            assert!(locks.locks.is_empty());
        }
    }
}
