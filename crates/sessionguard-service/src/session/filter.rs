//! Session listing filters.

use serde::{Deserialize, Serialize};

use sessionguard_core::types::DeviceType;
use sessionguard_entity::session::SessionView;

/// Optional listing filters. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFilter {
    /// Case-insensitive substring of the device name.
    pub device_name: Option<String>,
    /// Exact device class.
    pub device_type: Option<DeviceType>,
    /// Substring of the client IP.
    pub ip: Option<String>,
    /// Substring of the location.
    pub location: Option<String>,
}

impl SessionFilter {
    /// Whether `view` passes every set filter. Blank strings are ignored.
    pub fn matches(&self, view: &SessionView) -> bool {
        if let Some(name) = non_blank(&self.device_name)
            && !view
                .device_name
                .to_lowercase()
                .contains(&name.to_lowercase())
        {
            return false;
        }
        if let Some(device_type) = self.device_type
            && view.device_type != device_type
        {
            return false;
        }
        if let Some(ip) = non_blank(&self.ip)
            && !view.ip.contains(ip)
        {
            return false;
        }
        if let Some(location) = non_blank(&self.location)
            && !view.location.contains(location)
        {
            return false;
        }
        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
