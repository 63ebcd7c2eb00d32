use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::errors::{ConfigError, StorageError};
use crate::domain::entities::ActorId;

/// One result row, column name to JSON value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Relational store handed to query handlers
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Run an ad-hoc statement with positional text parameters
    async fn query(&self, sql: &str, params: &[String]) -> Result<Vec<Row>, StorageError>;
}

/// A named query kept for later runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedQuery {
    pub id: i64,
    pub name: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
}

/// Embedded store of saved queries
#[async_trait]
pub trait SavedQueryStore: Send + Sync {
    async fn save_query(&self, name: &str, query: &str) -> Result<(), StorageError>;
    async fn get_query(&self, name: &str) -> Result<Option<SavedQuery>, StorageError>;
    async fn list_queries(&self) -> Result<Vec<SavedQuery>, StorageError>;
    /// Returns whether a query with that name existed
    async fn delete_query(&self, name: &str) -> Result<bool, StorageError>;
}

/// Persists the authorized actor set
#[async_trait]
pub trait AdminPersistence: Send + Sync {
    async fn persist(&self, admins: &[ActorId]) -> Result<(), ConfigError>;
}
