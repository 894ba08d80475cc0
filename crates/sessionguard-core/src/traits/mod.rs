//! Core traits defined in `sessionguard-core` and implemented by other crates.

pub mod session_store;
pub mod token_store;

pub use session_store::{HashFields, ScoredMember, SessionStore};
pub use token_store::{AccessTokenDetails, TokenStore};
