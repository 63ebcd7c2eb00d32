//! Built-in command modules

pub mod admins;
pub mod help;
pub mod modules;
pub mod queries;
pub mod schedule;
pub mod settings;
pub mod sysinfo;

use super::sources::StaticModuleSource;

pub use admins::AdminsModule;
pub use help::HelpModule;
pub use modules::ModulesModule;
pub use queries::QueriesModule;
pub use schedule::ScheduleModule;
pub use settings::SettingsModule;
pub use sysinfo::SysinfoModule;

/// Every built-in module keyed by its id
pub fn builtin_source() -> StaticModuleSource {
    StaticModuleSource::new()
        .with_module(admins::MODULE_ID, AdminsModule)
        .with_module(help::MODULE_ID, HelpModule)
        .with_module(modules::MODULE_ID, ModulesModule)
        .with_module(queries::MODULE_ID, QueriesModule)
        .with_module(schedule::MODULE_ID, ScheduleModule)
        .with_module(settings::MODULE_ID, SettingsModule)
        .with_module(sysinfo::MODULE_ID, SysinfoModule)
}
