//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading and admin list persistence
//! - Database: SQLite relational and saved-query stores
//! - Plugins: YAML module files
//! - Adapters: Platform integrations (Telegram, console)

pub mod adapters;
pub mod config;
pub mod database;
pub mod plugins;
