//! In-memory session store.

pub mod glob;
pub mod store;

pub use store::MemorySessionStore;
