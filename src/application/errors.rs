//! Application layer errors

use thiserror::Error;

use crate::domain::entities::ActorId;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Module error: {0}")]
    Load(#[from] LoadError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Module failed to be read, parsed or registered
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Module source unavailable: {0}")]
    Source(String),

    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Module not loaded: {0}")]
    NotLoaded(String),

    #[error("Failed to parse module {module}: {reason}")]
    Parse { module: String, reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Module {module} failed to register: {reason}")]
    Registration { module: String, reason: String },

    #[error("Module source does not accept uploads")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Actor is not in the authorized set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Actor {actor} is not authorized")]
pub struct AuthorizationError {
    pub actor: ActorId,
}

/// Scheduling requests that were refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Task \"{0}\" is already scheduled")]
    DuplicateTask(String),

    #[error("Interval must be a positive number of minutes, got {0}")]
    InvalidInterval(i64),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Task \"{0}\" not found")]
    NotFound(String),

    #[error("Actor {0} may not manage scheduled tasks")]
    Unauthorized(ActorId),
}

/// Handler body failures, contained per binding
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Schedule(#[from] ScheduleError),

    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Not available: {0}")]
    Unavailable(String),

    #[error("Execution failed: {0}")]
    Failed(String),

    #[error("Handler panicked")]
    Panicked,
}

/// Delivery failures, logged and never retried here
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Failed to write config: {0}")]
    Write(String),
}
