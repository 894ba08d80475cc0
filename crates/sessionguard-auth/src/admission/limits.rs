//! Device-class capacity table.

use std::collections::HashMap;

use tracing::warn;

use sessionguard_core::config::SessionConfig;
use sessionguard_core::types::{DeviceCapacity, DeviceType};

/// Immutable device class → capacity table, resolved once from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLimitTable {
    limits: HashMap<DeviceType, DeviceCapacity>,
    fallback: DeviceCapacity,
}

impl DeviceLimitTable {
    /// Build a table from explicit entries and a fallback for unlisted classes.
    pub fn new(
        limits: impl IntoIterator<Item = (DeviceType, u32)>,
        fallback: u32,
    ) -> Self {
        Self {
            limits: limits
                .into_iter()
                .map(|(t, cap)| (t, DeviceCapacity::from(cap)))
                .collect(),
            fallback: DeviceCapacity::from(fallback),
        }
    }

    /// Resolve `session.device_limits` and `session.default_capacity`.
    ///
    /// Keys that name no known device class are ignored with a warning.
    pub fn from_config(config: &SessionConfig) -> Self {
        let mut entries = Vec::with_capacity(config.device_limits.len());
        for (name, cap) in &config.device_limits {
            let device_type = DeviceType::parse(name);
            if device_type == DeviceType::Unknown && !name.trim().eq_ignore_ascii_case("unknown") {
                warn!(key = %name, "Ignoring device limit for unrecognized device type");
                continue;
            }
            entries.push((device_type, *cap));
        }
        Self::new(entries, config.default_capacity)
    }

    /// Capacity of a device class.
    pub fn capacity(&self, device_type: DeviceType) -> DeviceCapacity {
        self.limits
            .get(&device_type)
            .copied()
            .unwrap_or(self.fallback)
    }
}
