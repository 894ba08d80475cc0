//! # sessionguard-service
//!
//! Admin-facing session services. Listing and termination sit on top of
//! the registry in `sessionguard-auth`; neither one performs admission.
//!
//! Services take their dependencies at construction time.

pub mod session;

pub use session::{SessionFilter, SessionQueryService, SessionTerminator};
