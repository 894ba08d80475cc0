//! Session record written at login.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use sessionguard_core::traits::HashFields;
use sessionguard_core::types::DeviceType;

use super::fields;

/// A login session as created by the login layer.
///
/// Records are immutable once admitted. They are destroyed by logout,
/// deletion, capacity eviction, or TTL expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier. Also the refresh-session id in the token store.
    pub id: String,
    /// Owning user's id.
    pub user_id: String,
    /// Owning user's login name.
    pub username: String,
    /// Device class the session was opened from.
    pub device_type: DeviceType,
    /// Client-reported device name.
    pub device_name: String,
    /// Client IP address.
    pub ip: String,
    /// Resolved location of the client IP.
    pub location: String,
    /// Login time, epoch millis.
    pub login_time: i64,
    /// Access token issued for this session.
    pub access_token_id: String,
}

impl SessionRecord {
    /// Create a record with a fresh id, logged in now.
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        device_type: DeviceType,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            username: username.into(),
            device_type,
            device_name: String::new(),
            ip: String::new(),
            location: String::new(),
            login_time: Utc::now().timestamp_millis(),
            access_token_id: String::new(),
        }
    }

    /// Set the session id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set device name, IP and location.
    pub fn with_client(
        mut self,
        device_name: impl Into<String>,
        ip: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.device_name = device_name.into();
        self.ip = ip.into();
        self.location = location.into();
        self
    }

    /// Set the login time.
    pub fn with_login_time(mut self, login_time: i64) -> Self {
        self.login_time = login_time;
        self
    }

    /// Set the access token id.
    pub fn with_access_token(mut self, access_token_id: impl Into<String>) -> Self {
        self.access_token_id = access_token_id.into();
        self
    }

    /// Hash fields this record is stored as.
    pub fn to_fields(&self) -> HashFields {
        let mut map = HashFields::with_capacity(9);
        map.insert(fields::ID.into(), Value::from(self.id.as_str()));
        map.insert(fields::USER_ID.into(), Value::from(self.user_id.as_str()));
        map.insert(fields::USERNAME.into(), Value::from(self.username.as_str()));
        map.insert(fields::DEVICE_TYPE.into(), Value::from(self.device_type.as_str()));
        map.insert(fields::DEVICE_NAME.into(), Value::from(self.device_name.as_str()));
        map.insert(fields::IP.into(), Value::from(self.ip.as_str()));
        map.insert(fields::LOCATION.into(), Value::from(self.location.as_str()));
        map.insert(fields::LOGIN_TIME.into(), Value::from(self.login_time));
        map.insert(
            fields::ACCESS_TOKEN_ID.into(),
            Value::from(self.access_token_id.as_str()),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_assigns_id_and_time() {
        let before = Utc::now().timestamp_millis();
        let record = SessionRecord::new("u-1", "alice", DeviceType::Pc);
        assert!(!record.id.is_empty());
        assert!(record.login_time >= before);
    }

    #[test]
    fn test_to_fields() {
        let record = SessionRecord::new("u-1", "alice", DeviceType::MiniProgram)
            .with_id("s-1")
            .with_login_time(1_000)
            .with_client("iPhone", "10.0.0.1", "Berlin");
        let map = record.to_fields();
        assert_eq!(map[fields::ID], json!("s-1"));
        assert_eq!(map[fields::DEVICE_TYPE], json!("MINI_PROGRAM"));
        assert_eq!(map[fields::LOGIN_TIME], json!(1_000));
        assert_eq!(map[fields::LOCATION], json!("Berlin"));
    }
}
