//! Multi-step business logic that does not belong in a single handler.

pub mod countries;
pub mod permissions;
pub mod sync;
