use chrono::{DateTime, Utc};

/// Listing view of a loaded module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    pub module_id: String,
    pub description: String,
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
    pub bindings: usize,
}
