//! Admission of new login sessions.

use serde::Serialize;
use tracing::{info, warn};

use sessionguard_core::config::{EvictionScope, SessionConfig};
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::types::DeviceCapacity;
use sessionguard_entity::session::SessionRecord;

use crate::registry::SessionRegistry;

use super::limits::DeviceLimitTable;
use super::lock::{AdmissionGuard, AdmissionLock};

/// Result of a successful admission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionOutcome {
    /// The admitted session id.
    pub session_id: String,
    /// Sessions removed to make room, oldest first.
    pub evicted: Vec<String>,
}

/// Decides whether a new session may be written and what has to go first.
///
/// Per user, the sequence prune → policy → capacity check → evict → write
/// runs under that user's admission lock.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    registry: SessionRegistry,
    limits: DeviceLimitTable,
    lock: AdmissionLock,
    multi_device_enabled: bool,
    eviction_scope: EvictionScope,
}

impl AdmissionController {
    /// Build a controller from session configuration.
    pub fn new(registry: SessionRegistry, config: &SessionConfig) -> Self {
        let lock = AdmissionLock::from_config(&config.admission, registry.store());
        Self {
            limits: DeviceLimitTable::from_config(config),
            lock,
            registry,
            multi_device_enabled: config.multi_device_enabled,
            eviction_scope: config.admission.eviction_scope,
        }
    }

    /// Replace the device limit table.
    pub fn with_limits(mut self, limits: DeviceLimitTable) -> Self {
        self.limits = limits;
        self
    }

    /// The registry this controller writes to.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Acquire the admission lock of `username`.
    pub async fn lock_user(&self, username: &str) -> AppResult<AdmissionGuard> {
        if username.trim().is_empty() {
            return Err(AppError::validation("username must not be empty"));
        }
        self.lock.acquire(username).await
    }

    /// Admit `candidate`, evicting whatever the policy requires.
    pub async fn admit(&self, candidate: &SessionRecord) -> AppResult<AdmissionOutcome> {
        validate(candidate)?;
        let guard = self.lock_user(&candidate.username).await?;
        let result = self.admit_locked(&guard, candidate).await;
        if let Err(e) = guard.release().await {
            warn!(username = %candidate.username, error = %e, "Failed to release admission lock");
        }
        result
    }

    /// Admit `candidate` under a lock the caller already holds.
    pub async fn admit_locked(
        &self,
        guard: &AdmissionGuard,
        candidate: &SessionRecord,
    ) -> AppResult<AdmissionOutcome> {
        validate(candidate)?;
        if guard.username() != candidate.username {
            return Err(AppError::validation(format!(
                "admission lock is held for '{}', not '{}'",
                guard.username(),
                candidate.username
            )));
        }

        let username = candidate.username.as_str();
        self.registry.prune_expired(username).await;

        let mut outcome = AdmissionOutcome {
            session_id: candidate.id.clone(),
            evicted: Vec::new(),
        };

        if !self.multi_device_enabled {
            outcome.evicted = self.registry.clear_user(username).await?;
        } else {
            let capacity = self.limits.capacity(candidate.device_type);
            if capacity == DeviceCapacity::Unsupported {
                warn!(
                    username = %username,
                    device_type = %candidate.device_type,
                    "Login rejected for unsupported device type"
                );
                return Err(AppError::unsupported_device_type(format!(
                    "Device type {} is not allowed to log in",
                    candidate.device_type
                )));
            }

            let live = self
                .registry
                .count_by_type(username, candidate.device_type)
                .await?;
            if capacity.is_full(live) {
                let scope = match self.eviction_scope {
                    EvictionScope::AnyDevice => None,
                    EvictionScope::SameDeviceType => Some(candidate.device_type),
                };
                if let Some(victim) = self.registry.oldest(username, scope).await? {
                    self.registry.evict(username, &victim.id).await;
                    outcome.evicted.push(victim.id);
                }
            }
        }

        self.registry.write(candidate).await?;

        info!(
            username = %username,
            session_id = %candidate.id,
            device_type = %candidate.device_type,
            evicted = outcome.evicted.len(),
            "Session admitted"
        );
        Ok(outcome)
    }
}

fn validate(candidate: &SessionRecord) -> AppResult<()> {
    if candidate.id.trim().is_empty() {
        return Err(AppError::validation("session id must not be empty"));
    }
    if candidate.username.trim().is_empty() {
        return Err(AppError::validation("username must not be empty"));
    }
    Ok(())
}
