//! SQLite database backing the relational and saved-query stores

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};

use crate::application::errors::StorageError;
use crate::domain::traits::{RelationalStore, Row, SavedQuery, SavedQueryStore};

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                query TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        tracing::info!("Table \"queries\" ready.");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run blocking SQLite work off the async threads
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StorageError::Internal("Lock poisoned".to_string()))?;
            f(&*conn)
        })
        .await
        .map_err(|e| StorageError::Internal(e.to_string()))?
    }
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!("<{} bytes>", bytes.len())),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("bad timestamp '{}': {}", raw, e)))
}

#[async_trait]
impl RelationalStore for Database {
    async fn query(&self, sql: &str, params: &[String]) -> Result<Vec<Row>, StorageError> {
        let sql = sql.to_string();
        let params = params.to_vec();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;

            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut map = Row::new();
                for (i, name) in columns.iter().enumerate() {
                    map.insert(name.clone(), to_json(row.get_ref(i)?));
                }
                out.push(map);
            }
            Ok(out)
        })
        .await
    }
}

#[async_trait]
impl SavedQueryStore for Database {
    async fn save_query(&self, name: &str, query: &str) -> Result<(), StorageError> {
        let (name, query) = (name.to_string(), query.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO queries (name, query, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET query = excluded.query",
                params![name, query, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_query(&self, name: &str) -> Result<Option<SavedQuery>, StorageError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, query, created_at FROM queries WHERE name = ?1",
                    params![name],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(id, name, query, created_at)| {
                Ok(SavedQuery {
                    id,
                    name,
                    query,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .transpose()
        })
        .await
    }

    async fn list_queries(&self) -> Result<Vec<SavedQuery>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, query, created_at FROM queries ORDER BY name")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;

            let mut queries = Vec::new();
            for row in rows {
                let (id, name, query, created_at) = row?;
                queries.push(SavedQuery {
                    id,
                    name,
                    query,
                    created_at: parse_timestamp(&created_at)?,
                });
            }
            Ok(queries)
        })
        .await
    }

    async fn delete_query(&self, name: &str) -> Result<bool, StorageError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM queries WHERE name = ?1", params![name])?;
            Ok(deleted > 0)
        })
        .await
    }
}
