//! Session termination: single, owner-checked, per-user, and bulk.

use tracing::{error, info, warn};

use sessionguard_auth::registry::SessionRegistry;
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::types::DeviceType;
use sessionguard_entity::session::SessionView;

use super::require;

/// Deletes sessions on behalf of owners and administrators.
#[derive(Debug, Clone)]
pub struct SessionTerminator {
    registry: SessionRegistry,
}

impl SessionTerminator {
    /// Creates a new terminator.
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Delete any session. Administrators only.
    pub async fn delete_as_admin(&self, session_id: &str) -> AppResult<()> {
        let session = self.existing(session_id).await?;
        self.registry.remove(&session.username, session_id).await?;
        info!(
            username = %session.username,
            session_id = %session_id,
            "Session terminated by admin"
        );
        Ok(())
    }

    /// Delete a session owned by `caller`.
    ///
    /// Fails with `AccessDenied` and touches nothing when the session
    /// belongs to someone else.
    pub async fn delete_as_owner(&self, session_id: &str, caller: &str) -> AppResult<()> {
        require(caller, "username")?;
        let session = self.existing(session_id).await?;
        if session.username != caller {
            warn!(
                caller = %caller,
                session_id = %session_id,
                "Refusing to delete another user's session"
            );
            return Err(AppError::access_denied(
                "You can only terminate your own sessions",
            ));
        }
        self.registry.remove(caller, session_id).await?;
        info!(username = %caller, session_id = %session_id, "Session terminated by owner");
        Ok(())
    }

    /// Delete every session of a user.
    ///
    /// Failures are logged and skipped. Returns how many records were
    /// deleted; index entries without a record are cleaned up but not
    /// counted.
    pub async fn delete_all_for_user(&self, username: &str) -> AppResult<u32> {
        require(username, "username")?;
        let mut deleted = 0u32;
        for entry in self.registry.entries(username).await? {
            match self.registry.remove(username, &entry.member).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        username = %username,
                        session_id = %entry.member,
                        error = %e,
                        "Failed to terminate session"
                    );
                }
            }
        }

        info!(username = %username, deleted = deleted, "All user sessions terminated");
        Ok(deleted)
    }

    /// Delete a user's sessions of one device class.
    ///
    /// Failures are logged and skipped. Returns `true` when at least one
    /// session was deleted.
    pub async fn delete_all_for_user_and_type(
        &self,
        username: &str,
        device_type: DeviceType,
    ) -> AppResult<bool> {
        require(username, "username")?;
        self.registry.prune_expired(username).await;

        let mut deleted = 0u32;
        for session in self.registry.live_sessions(username).await? {
            if session.device_type != device_type {
                continue;
            }
            match self.registry.remove(username, &session.id).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        username = %username,
                        session_id = %session.id,
                        error = %e,
                        "Failed to terminate session"
                    );
                }
            }
        }

        info!(
            username = %username,
            device_type = %device_type,
            deleted = deleted,
            "User sessions of device type terminated"
        );
        Ok(deleted > 0)
    }

    /// Delete many sessions as administrator. Failures are logged and
    /// skipped. Returns how many were deleted.
    pub async fn delete_many_as_admin(&self, session_ids: &[String]) -> u32 {
        let mut deleted = 0u32;
        for session_id in session_ids {
            match self.delete_as_admin(session_id).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    error!(
                        session_id = %session_id,
                        error = %e,
                        "Failed to terminate session in bulk"
                    );
                }
            }
        }

        info!(
            requested = session_ids.len(),
            deleted = deleted,
            "Bulk termination completed"
        );
        deleted
    }

    async fn existing(&self, session_id: &str) -> AppResult<SessionView> {
        require(session_id, "session id")?;
        self.registry
            .find_record(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sessionguard_auth::token::StoreTokenStore;
    use sessionguard_core::config::SessionConfig;
    use sessionguard_core::error::ErrorKind;
    use sessionguard_core::traits::{HashFields, SessionStore};
    use sessionguard_store::keys;
    use sessionguard_store::memory::MemorySessionStore;

    use super::*;

    fn terminator() -> (Arc<dyn SessionStore>, SessionTerminator) {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let tokens = Arc::new(StoreTokenStore::new(Arc::clone(&store)));
        let registry = SessionRegistry::new(Arc::clone(&store), tokens, &SessionConfig::default());
        (store, SessionTerminator::new(registry))
    }

    #[tokio::test]
    async fn test_record_without_username_is_not_found() {
        let (store, terminator) = terminator();
        let mut fields = HashFields::new();
        fields.insert("id".to_string(), serde_json::json!("s-1"));
        fields.insert("device_type".to_string(), serde_json::json!("PC"));
        store
            .hash_put_all(&keys::session_record("s-1"), &fields, Duration::from_secs(60))
            .await
            .unwrap();

        let err = terminator.delete_as_admin("s-1").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(store.hash_get_all(&keys::session_record("s-1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_blank_arguments_rejected() {
        let (_, terminator) = terminator();

        let err = terminator.delete_as_owner("s-1", " ").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        let err = terminator.delete_all_for_user("").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(terminator.delete_many_as_admin(&[String::new()]).await, 0);
    }
}
