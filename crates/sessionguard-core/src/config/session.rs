//! Session admission and lifetime configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session admission and lifetime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a session record and its index entry, in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Whether a user may hold sessions on several devices at once.
    ///
    /// When `false`, every login clears all of the user's other sessions.
    #[serde(default = "default_true")]
    pub multi_device_enabled: bool,
    /// Per-device-class capacity. Keys are device type names
    /// (`PC`, `MOBILE`, `WEB`, `MINI_PROGRAM`, `UNKNOWN`), matched
    /// case-insensitively. `0` rejects the device class.
    #[serde(default = "default_device_limits")]
    pub device_limits: HashMap<String, u32>,
    /// Capacity applied to device classes missing from `device_limits`.
    #[serde(default)]
    pub default_capacity: u32,
    /// Interval between background prune sweeps, in minutes.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
    /// Admission lock and eviction settings.
    #[serde(default)]
    pub admission: AdmissionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            multi_device_enabled: true,
            device_limits: default_device_limits(),
            default_capacity: 0,
            cleanup_interval_minutes: default_cleanup_interval(),
            admission: AdmissionConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Session TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Session TTL in milliseconds, the unit of index scores.
    pub fn ttl_millis(&self) -> i64 {
        (self.ttl_seconds as i64).saturating_mul(1000)
    }

    /// Interval between background prune sweeps.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_minutes.saturating_mul(60))
    }

    /// Reject settings that would make admission misbehave.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.ttl_seconds == 0 {
            return Err(AppError::configuration("session.ttl_seconds must be > 0"));
        }
        if self.cleanup_interval_minutes == 0 {
            return Err(AppError::configuration(
                "session.cleanup_interval_minutes must be > 0",
            ));
        }
        if self.admission.lock_ttl_seconds == 0 {
            return Err(AppError::configuration(
                "session.admission.lock_ttl_seconds must be > 0",
            ));
        }
        if self.admission.lock_retry_millis == 0 {
            return Err(AppError::configuration(
                "session.admission.lock_retry_millis must be > 0",
            ));
        }
        Ok(())
    }
}

/// Admission lock and eviction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// How admissions for the same user are serialized.
    #[serde(default)]
    pub lock: LockMode,
    /// Expiry of a distributed admission lock, in seconds.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,
    /// Maximum time spent waiting for a distributed lock, in milliseconds.
    #[serde(default = "default_lock_wait")]
    pub lock_wait_millis: u64,
    /// Delay between distributed lock attempts, in milliseconds.
    #[serde(default = "default_lock_retry")]
    pub lock_retry_millis: u64,
    /// Which sessions are candidates for eviction when a device class is full.
    #[serde(default)]
    pub eviction_scope: EvictionScope,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            lock: LockMode::default(),
            lock_ttl_seconds: default_lock_ttl(),
            lock_wait_millis: default_lock_wait(),
            lock_retry_millis: default_lock_retry(),
            eviction_scope: EvictionScope::default(),
        }
    }
}

/// Serialization strategy for concurrent admissions of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Per-process mutex map. Only serializes admissions on one node.
    Local,
    /// Store-backed lock shared by every node using the same store.
    Distributed,
}

impl Default for LockMode {
    fn default() -> Self {
        Self::Distributed
    }
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockMode::Local => write!(f, "local"),
            LockMode::Distributed => write!(f, "distributed"),
        }
    }
}

/// Eviction candidate scope applied when a device class is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionScope {
    /// Evict the user's oldest session of any device type.
    AnyDevice,
    /// Evict the user's oldest session of the triggering device type.
    SameDeviceType,
}

impl Default for EvictionScope {
    fn default() -> Self {
        Self::AnyDevice
    }
}

impl std::fmt::Display for EvictionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvictionScope::AnyDevice => write!(f, "any_device"),
            EvictionScope::SameDeviceType => write!(f, "same_device_type"),
        }
    }
}

fn default_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_cleanup_interval() -> u64 {
    15
}

fn default_lock_ttl() -> u64 {
    10
}

fn default_lock_wait() -> u64 {
    3000
}

fn default_lock_retry() -> u64 {
    50
}

fn default_device_limits() -> HashMap<String, u32> {
    let mut map = HashMap::new();
    map.insert("PC".to_string(), 1);
    map.insert("MOBILE".to_string(), 1);
    map.insert("WEB".to_string(), 1);
    map.insert("MINI_PROGRAM".to_string(), 1);
    map.insert("UNKNOWN".to_string(), 0);
    map
}
