//! # sessionguard-core
//!
//! Core crate for SessionGuard. Contains the store and token traits,
//! configuration schemas, device/pagination types, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other SessionGuard crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
