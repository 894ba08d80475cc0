//! Per-user session index maintenance.

pub mod index;
pub mod sweeper;

pub use index::{IndexedSession, SessionRegistry};
pub use sweeper::{SessionSweeper, SweepReport};
