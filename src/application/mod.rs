//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Errors: Domain-specific errors
//! - Permissions: The authorized actor guard
//! - Routing: Pattern matching, snapshots and dispatch
//! - Scheduler: Periodic synthetic events

pub mod errors;
pub mod permissions;
pub mod routing;
pub mod scheduler;
