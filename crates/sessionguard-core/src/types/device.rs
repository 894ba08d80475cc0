//! Device class of a login session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse device classification used for per-class capacity limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    /// Desktop client.
    Pc,
    /// Native mobile app.
    Mobile,
    /// Browser session.
    Web,
    /// Mini-program hosted inside another app.
    MiniProgram,
    /// Anything the login layer could not classify.
    Unknown,
}

impl DeviceType {
    /// Every device class, in declaration order.
    pub const ALL: [DeviceType; 5] = [
        DeviceType::Pc,
        DeviceType::Mobile,
        DeviceType::Web,
        DeviceType::MiniProgram,
        DeviceType::Unknown,
    ];

    /// Canonical stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pc => "PC",
            Self::Mobile => "MOBILE",
            Self::Web => "WEB",
            Self::MiniProgram => "MINI_PROGRAM",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a device name leniently.
    ///
    /// Matching ignores case and treats `-` and spaces as `_`. Anything
    /// unrecognized is [`DeviceType::Unknown`].
    pub fn parse(value: &str) -> Self {
        let normalized: String = value
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "PC" => Self::Pc,
            "MOBILE" => Self::Mobile,
            "WEB" => Self::Web,
            "MINI_PROGRAM" | "MINIPROGRAM" => Self::MiniProgram,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DeviceType {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!(DeviceType::parse("pc"), DeviceType::Pc);
        assert_eq!(DeviceType::parse("Mini-Program"), DeviceType::MiniProgram);
        assert_eq!(DeviceType::parse(" mobile "), DeviceType::Mobile);
        assert_eq!(DeviceType::parse("toaster"), DeviceType::Unknown);
        assert_eq!(DeviceType::parse(""), DeviceType::Unknown);
    }

    #[test]
    fn test_as_str_parses_back() {
        for device in DeviceType::ALL {
            assert_eq!(DeviceType::parse(device.as_str()), device);
        }
    }

    #[test]
    fn test_serde_name() {
        let json = serde_json::to_string(&DeviceType::MiniProgram).unwrap();
        assert_eq!(json, "\"MINI_PROGRAM\"");
    }
}
