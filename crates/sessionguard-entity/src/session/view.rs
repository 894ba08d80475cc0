//! Read-side session models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sessionguard_core::traits::{AccessTokenDetails, HashFields};
use sessionguard_core::types::DeviceType;

use super::fields::{self, string_field};
use super::login_time::decode_login_time;
use super::record::SessionRecord;

/// A session as read back from the store.
///
/// Everything except the identity is decoded leniently, since records may
/// have been written by older clients or by a string-only backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    /// Session identifier.
    pub id: String,
    /// Owning user's id.
    pub user_id: String,
    /// Owning user's login name.
    pub username: String,
    /// Device class.
    pub device_type: DeviceType,
    /// Client-reported device name.
    pub device_name: String,
    /// Client IP address.
    pub ip: String,
    /// Resolved location.
    pub location: String,
    /// Login time, epoch millis, if it could be decoded.
    pub login_time: Option<i64>,
    /// Access token issued for this session.
    pub access_token_id: Option<String>,
}

impl SessionView {
    /// Decode a view from stored hash fields.
    ///
    /// Returns `None` when the id or username is missing.
    pub fn from_fields(map: &HashFields, index_score: Option<f64>) -> Option<Self> {
        let id = string_field(map, fields::ID)?;
        let username = string_field(map, fields::USERNAME)?;
        let device_type = string_field(map, fields::DEVICE_TYPE)
            .map(|s| DeviceType::parse(&s))
            .unwrap_or(DeviceType::Unknown);

        Some(Self {
            id,
            username,
            device_type,
            user_id: string_field(map, fields::USER_ID).unwrap_or_default(),
            device_name: string_field(map, fields::DEVICE_NAME).unwrap_or_default(),
            ip: string_field(map, fields::IP).unwrap_or_default(),
            location: string_field(map, fields::LOCATION).unwrap_or_default(),
            login_time: decode_login_time(map.get(fields::LOGIN_TIME), index_score),
            access_token_id: string_field(map, fields::ACCESS_TOKEN_ID),
        })
    }

    /// Login time as a UTC timestamp.
    pub fn login_at(&self) -> Option<DateTime<Utc>> {
        self.login_time.and_then(DateTime::from_timestamp_millis)
    }
}

impl From<&SessionRecord> for SessionView {
    fn from(record: &SessionRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            username: record.username.clone(),
            device_type: record.device_type,
            device_name: record.device_name.clone(),
            ip: record.ip.clone(),
            location: record.location.clone(),
            login_time: Some(record.login_time),
            access_token_id: Some(record.access_token_id.clone()).filter(|t| !t.is_empty()),
        }
    }
}

/// Admin detail view of one session with its token state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    /// The session itself.
    #[serde(flatten)]
    pub session: SessionView,
    /// Access token currently referenced by the refresh token.
    pub access_token: Option<AccessTokenDetails>,
    /// Whether the refresh token is still live.
    pub refresh_token_valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_through_fields() {
        let record = SessionRecord::new("u-1", "alice", DeviceType::Web)
            .with_id("s-1")
            .with_login_time(5_000)
            .with_access_token("at-1");
        let view = SessionView::from_fields(&record.to_fields(), Some(1.0)).unwrap();
        assert_eq!(view, SessionView::from(&record));
    }

    #[test]
    fn test_string_only_backend() {
        let mut map = HashFields::new();
        map.insert("id".into(), json!("s-1"));
        map.insert("username".into(), json!("bob"));
        map.insert("device_type".into(), json!("mobile"));
        map.insert("login_time".into(), json!("1234"));
        let view = SessionView::from_fields(&map, None).unwrap();
        assert_eq!(view.device_type, DeviceType::Mobile);
        assert_eq!(view.login_time, Some(1234));
        assert_eq!(view.access_token_id, None);
    }

    #[test]
    fn test_missing_identity() {
        let mut map = HashFields::new();
        map.insert("id".into(), json!("s-1"));
        assert!(SessionView::from_fields(&map, None).is_none());
    }

    #[test]
    fn test_unknown_device_type_defaults() {
        let mut map = HashFields::new();
        map.insert("id".into(), json!("s-1"));
        map.insert("username".into(), json!("bob"));
        let view = SessionView::from_fields(&map, Some(42.0)).unwrap();
        assert_eq!(view.device_type, DeviceType::Unknown);
        assert_eq!(view.login_time, Some(42));
    }
}
