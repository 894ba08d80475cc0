//! Session listing for owners and administrators.

use std::cmp::Ordering;

use futures::future::join_all;
use tracing::{debug, warn};

use sessionguard_auth::registry::SessionRegistry;
use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::ScoredMember;
use sessionguard_core::types::{PageRequest, PageResponse};
use sessionguard_entity::session::{SessionDetail, SessionView};

use super::filter::SessionFilter;
use super::require;

/// Read-only queries over the session registry.
///
/// Listings never write; index entries without a record are skipped
/// and left for pruning.
#[derive(Debug, Clone)]
pub struct SessionQueryService {
    registry: SessionRegistry,
}

impl SessionQueryService {
    /// Creates a new query service.
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Sessions of one user, newest first.
    pub async fn list_for_user(
        &self,
        username: &str,
        filter: &SessionFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<SessionView>> {
        require(username, "username")?;
        let entries = self.registry.entries(username).await?;
        let rows = self.resolve(&entries).await?;
        Ok(finish(rows, filter, page))
    }

    /// Sessions of every user, newest first.
    pub async fn list_all(
        &self,
        filter: &SessionFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<SessionView>> {
        let mut rows = Vec::new();
        for (_, entries) in self.registry.indexes().await? {
            rows.extend(self.resolve(&entries).await?);
        }
        Ok(finish(rows, filter, page))
    }

    /// One session with its token state.
    pub async fn session_detail(&self, session_id: &str) -> AppResult<SessionDetail> {
        require(session_id, "session id")?;
        let session = self
            .registry
            .find_record(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))?;

        let tokens = self.registry.tokens();
        let access_token = match tokens.get_refresh_token(session_id).await? {
            Some(token_id) => tokens.get_access_token(&token_id).await?,
            None => None,
        };
        let refresh_token_valid = tokens.validate_refresh_token(session_id).await?;

        Ok(SessionDetail {
            session,
            access_token,
            refresh_token_valid,
        })
    }

    /// Live sessions of one user.
    pub async fn count_for_user(&self, username: &str) -> AppResult<u32> {
        require(username, "username")?;
        let live = self.registry.live_sessions(username).await?;
        u32::try_from(live.len()).map_err(|_| AppError::internal("Session count overflow"))
    }

    /// Live sessions across every user.
    pub async fn count_all(&self) -> AppResult<u64> {
        let mut total = 0u64;
        for username in self.registry.usernames().await? {
            let live = self.registry.live_sessions(&username).await?.len();
            total += u64::try_from(live)
                .map_err(|_| AppError::internal("Session count overflow"))?;
        }
        Ok(total)
    }

    /// Load the records behind non-stale index entries.
    async fn resolve(&self, entries: &[ScoredMember]) -> AppResult<Vec<SessionView>> {
        let live: Vec<&ScoredMember> = entries
            .iter()
            .filter(|e| !self.registry.is_stale(e.score))
            .collect();
        let loaded = join_all(live.iter().map(|e| self.registry.load_fields(&e.member))).await;

        let mut rows = Vec::with_capacity(live.len());
        for (entry, fields) in live.into_iter().zip(loaded) {
            let Some(fields) = fields? else {
                debug!(session_id = %entry.member, "Index entry has no record");
                continue;
            };
            match SessionView::from_fields(&fields, Some(entry.score)) {
                Some(view) => rows.push(view),
                None => warn!(session_id = %entry.member, "Skipping session record without id or username"),
            }
        }
        Ok(rows)
    }
}

/// Filter, sort newest first (unknown login times last), then paginate.
fn finish(
    rows: Vec<SessionView>,
    filter: &SessionFilter,
    page: PageRequest,
) -> PageResponse<SessionView> {
    let mut rows: Vec<SessionView> = rows.into_iter().filter(|r| filter.matches(r)).collect();
    rows.sort_by(|a, b| newest_first(a.login_time, b.login_time));
    page.paginate(rows)
}

fn newest_first(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
