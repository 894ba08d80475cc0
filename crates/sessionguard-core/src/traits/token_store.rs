//! Narrow view of the token lifecycle owner.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Details of an issued access token, as kept by the token store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenDetails {
    /// Access token identifier.
    pub token_id: String,
    /// Refresh-session id the token was issued for.
    pub session_id: String,
    /// Owner of the token.
    pub username: String,
    /// Issue time, epoch millis.
    pub issued_at: i64,
    /// Expiry time, epoch millis.
    pub expires_at: i64,
}

/// Token store consumed by the session registry.
///
/// The registry never issues tokens; it only revokes them when a session
/// goes away and reads them for admin detail views.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug + 'static {
    /// Revoke the refresh token of `session_id` and the access token it
    /// points at. Succeeds when the tokens are already gone.
    async fn delete_refresh_token_and_access_token(&self, session_id: &str) -> AppResult<()>;

    /// Access token id referenced by the refresh token of `session_id`.
    async fn get_refresh_token(&self, session_id: &str) -> AppResult<Option<String>>;

    /// Details of an access token.
    async fn get_access_token(&self, token_id: &str) -> AppResult<Option<AccessTokenDetails>>;

    /// Whether the refresh token of `session_id` is still live.
    async fn validate_refresh_token(&self, session_id: &str) -> AppResult<bool>;
}
