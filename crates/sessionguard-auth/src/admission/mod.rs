//! Login admission control.

pub mod controller;
pub mod limits;
pub mod lock;

pub use controller::{AdmissionController, AdmissionOutcome};
pub use limits::DeviceLimitTable;
pub use lock::{AdmissionGuard, AdmissionLock};
