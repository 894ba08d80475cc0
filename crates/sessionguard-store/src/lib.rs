//! # sessionguard-store
//!
//! Session store implementations for SessionGuard. Two backends:
//!
//! - **memory**: in-process store on [dashmap](https://crates.io/crates/dashmap)
//!   with lazy per-key expiry. Single node and tests.
//! - **redis**: shared store on the [redis](https://crates.io/crates/redis)
//!   crate's `ConnectionManager`.
//!
//! The backend is selected at runtime from `store.provider`.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StoreManager;
