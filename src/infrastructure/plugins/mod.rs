//! File-backed handler modules
//!
//! Each `*.yaml` file in the modules directory declares commands with a
//! reply template or a SQL query. Files are reloaded when they change.

pub mod directory;
pub mod manifest;

pub use directory::ManifestDirectory;
pub use manifest::{CommandEntry, ManifestModule, ModuleManifest};
