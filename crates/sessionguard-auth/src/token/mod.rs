//! Token store backed by the session store.

pub mod store;

pub use store::StoreTokenStore;
