//! # sessionguard-entity
//!
//! Domain models for SessionGuard. A [`session::SessionRecord`] is what the
//! login layer hands to admission control; a [`session::SessionView`] is what
//! comes back out of the store when it is read.

pub mod session;
