//! Per-device-class session capacity.

use serde::{Deserialize, Serialize};

/// Resolved capacity of one device class for one user.
///
/// Capacities come from the `session.device_limits` table; a configured
/// value of `0` means the device class may not log in at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceCapacity {
    /// Logins from this device class are rejected.
    Unsupported,
    /// At most this many concurrent sessions of the device class.
    Max(u32),
}

impl DeviceCapacity {
    /// Check whether a given live session count leaves no room for another.
    pub fn is_full(&self, live_count: u32) -> bool {
        match self {
            Self::Max(max) => live_count >= *max,
            Self::Unsupported => true,
        }
    }

    /// Return the numeric cap, or `None` for unsupported.
    pub fn as_max(&self) -> Option<u32> {
        match self {
            Self::Max(max) => Some(*max),
            Self::Unsupported => None,
        }
    }
}

impl From<u32> for DeviceCapacity {
    /// Convert a configured value. `0` means unsupported.
    fn from(value: u32) -> Self {
        if value == 0 {
            Self::Unsupported
        } else {
            Self::Max(value)
        }
    }
}
