//! Domain layer - Core business objects and collaborator abstractions
//!
//! This layer contains:
//! - Entities: Events, scheduled tasks, module summaries
//! - Traits: Abstractions for infrastructure (Transport, persistence, stores)

pub mod entities;
pub mod traits;
