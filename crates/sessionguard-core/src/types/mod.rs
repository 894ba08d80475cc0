//! Core type definitions used across the SessionGuard workspace.

pub mod capacity;
pub mod device;
pub mod pagination;

pub use capacity::DeviceCapacity;
pub use device::DeviceType;
pub use pagination::{PageRequest, PageResponse, UNPAGED};
