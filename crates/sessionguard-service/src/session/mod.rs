//! Session listing and termination.

pub mod filter;
pub mod query;
pub mod termination;

pub use filter::SessionFilter;
pub use query::SessionQueryService;
pub use termination::SessionTerminator;

use sessionguard_core::error::AppError;
use sessionguard_core::result::AppResult;

/// Reject blank identifiers.
pub(crate) fn require(value: &str, what: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{what} must not be empty")));
    }
    Ok(())
}
