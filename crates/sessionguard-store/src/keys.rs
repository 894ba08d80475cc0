//! Key builders for every entry SessionGuard keeps in the store.
//!
//! Keys are unprefixed here. The Redis backend applies the configured
//! `key_prefix` on the way in and strips it on the way out.

/// Prefix of per-user session index keys.
const USER_SESSIONS: &str = "user_sessions:";

/// Glob matching every per-user session index.
pub const USER_SESSION_INDEX_PATTERN: &str = "user_sessions:*";

// ── Session keys ───────────────────────────────────────────

/// Hash holding one session record.
pub fn session_record(session_id: &str) -> String {
    format!("login_session:{session_id}")
}

/// Sorted set of a user's session ids, scored by login time.
pub fn user_session_index(username: &str) -> String {
    format!("{USER_SESSIONS}{username}")
}

/// Username encoded in a per-user index key.
pub fn username_from_index_key(key: &str) -> Option<&str> {
    key.strip_prefix(USER_SESSIONS).filter(|u| !u.is_empty())
}

/// Per-user admission lock.
pub fn admission_lock(username: &str) -> String {
    format!("admission_lock:{username}")
}

// ── Token keys ─────────────────────────────────────────────

/// Refresh token of a session. Holds the access token id.
pub fn refresh_token(session_id: &str) -> String {
    format!("refresh_token:{session_id}")
}

/// Access token details, JSON-encoded.
pub fn access_token(token_id: &str) -> String {
    format!("access_token:{token_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_keys() {
        assert_eq!(session_record("abc"), "login_session:abc");
        assert_eq!(user_session_index("alice"), "user_sessions:alice");
    }

    #[test]
    fn test_username_from_index_key() {
        assert_eq!(
            username_from_index_key(&user_session_index("alice")),
            Some("alice")
        );
        assert_eq!(username_from_index_key("user_sessions:"), None);
        assert_eq!(username_from_index_key("login_session:x"), None);
    }
}
