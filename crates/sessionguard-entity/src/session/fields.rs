//! Hash field names of a stored session record.

use serde_json::Value;

use sessionguard_core::traits::HashFields;

/// Session id.
pub const ID: &str = "id";
/// Owning user's id.
pub const USER_ID: &str = "user_id";
/// Owning user's login name.
pub const USERNAME: &str = "username";
/// Device class.
pub const DEVICE_TYPE: &str = "device_type";
/// Client-reported device name.
pub const DEVICE_NAME: &str = "device_name";
/// Client IP address.
pub const IP: &str = "ip";
/// Resolved location of the client IP.
pub const LOCATION: &str = "location";
/// Login time, epoch millis.
pub const LOGIN_TIME: &str = "login_time";
/// Access token issued for this session.
pub const ACCESS_TOKEN_ID: &str = "access_token_id";

/// Read a field as a string.
///
/// Numbers and booleans are rendered with their JSON text. Missing fields,
/// nulls and blank strings yield `None`.
pub fn string_field(fields: &HashFields, name: &str) -> Option<String> {
    let text = match fields.get(name)? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
