//! # sessionguard-auth
//!
//! Session bookkeeping and admission control for SessionGuard.
//!
//! ## Modules
//!
//! - `registry`: per-user session index, pruning, counting, and the background sweeper
//! - `admission`: device-class capacity, single-device policy, and per-user admission locks
//! - `token`: store-backed token store used for revocation on eviction

pub mod admission;
pub mod registry;
pub mod token;

pub use admission::{AdmissionController, AdmissionGuard, AdmissionLock, AdmissionOutcome, DeviceLimitTable};
pub use registry::{IndexedSession, SessionRegistry, SessionSweeper, SweepReport};
pub use token::StoreTokenStore;
