//! Token store kept in the session store.
//!
//! Layout:
//! - `refresh_token:{session_id}` holds the access token id
//! - `access_token:{token_id}` holds JSON [`AccessTokenDetails`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use sessionguard_core::result::AppResult;
use sessionguard_core::traits::{AccessTokenDetails, SessionStore, TokenStore};
use sessionguard_store::keys;

/// [`TokenStore`] implementation over a [`SessionStore`].
#[derive(Debug, Clone)]
pub struct StoreTokenStore {
    store: Arc<dyn SessionStore>,
}

impl StoreTokenStore {
    /// Create a token store over `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Issue an access token and a refresh token for a session.
    pub async fn issue(
        &self,
        session_id: &str,
        username: &str,
        ttl: Duration,
    ) -> AppResult<AccessTokenDetails> {
        let issued_at = Utc::now().timestamp_millis();
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let details = AccessTokenDetails {
            token_id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            username: username.to_string(),
            issued_at,
            expires_at: issued_at.saturating_add(ttl_millis),
        };

        let encoded = serde_json::to_string(&details)?;
        self.store
            .set(&keys::access_token(&details.token_id), &encoded, ttl)
            .await?;
        self.store
            .set(&keys::refresh_token(session_id), &details.token_id, ttl)
            .await?;

        debug!(session_id = %session_id, token_id = %details.token_id, "Issued tokens");
        Ok(details)
    }
}

#[async_trait]
impl TokenStore for StoreTokenStore {
    async fn delete_refresh_token_and_access_token(&self, session_id: &str) -> AppResult<()> {
        let refresh_key = keys::refresh_token(session_id);
        if let Some(token_id) = self.store.get(&refresh_key).await? {
            self.store.delete(&keys::access_token(&token_id)).await?;
        }
        self.store.delete(&refresh_key).await?;
        Ok(())
    }

    async fn get_refresh_token(&self, session_id: &str) -> AppResult<Option<String>> {
        self.store.get(&keys::refresh_token(session_id)).await
    }

    async fn get_access_token(&self, token_id: &str) -> AppResult<Option<AccessTokenDetails>> {
        match self.store.get(&keys::access_token(token_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn validate_refresh_token(&self, session_id: &str) -> AppResult<bool> {
        Ok(self.get_refresh_token(session_id).await?.is_some())
    }
}
