//! Plugin system for admin-bot
//!
//! Handler modules implement `CommandModule` and are served by a
//! `ModuleSource`. The loader publishes their bindings into the router
//! table and swaps them atomically on reload.

pub mod builtin;
pub mod loader;
pub mod sources;
pub mod trait_def;

pub use loader::PluginLoader;
pub use sources::{CompositeSource, StaticModuleSource};
pub use trait_def::{ChangeCallback, CommandModule, ModuleSource, RegistrationContext, WatchHandle};
