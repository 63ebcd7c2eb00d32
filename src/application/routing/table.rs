//! Router table - immutable snapshots of every module's bindings

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::binding::HandlerBinding;
use super::pattern::Captures;
use crate::domain::entities::{Event, ModuleSummary};

/// Bindings registered by one module, replaced as a unit
#[derive(Debug)]
pub struct ModuleRecord {
    pub module_id: String,
    pub description: String,
    pub bindings: Vec<Arc<HandlerBinding>>,
    pub loaded_at: DateTime<Utc>,
    pub version: u64,
}

impl ModuleRecord {
    pub fn summary(&self) -> ModuleSummary {
        ModuleSummary {
            module_id: self.module_id.clone(),
            description: self.description.clone(),
            version: self.version,
            loaded_at: self.loaded_at,
            bindings: self.bindings.len(),
        }
    }
}

/// A binding selected for an event
pub struct Match {
    pub binding: Arc<HandlerBinding>,
    pub captures: Captures,
}

/// Snapshot of all active bindings
#[derive(Debug, Default, Clone)]
pub struct RouterTable {
    version: u64,
    modules: BTreeMap<String, Arc<ModuleRecord>>,
}

impl RouterTable {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn module(&self, module_id: &str) -> Option<&Arc<ModuleRecord>> {
        self.modules.get(module_id)
    }

    /// Modules ordered by id
    pub fn modules(&self) -> impl Iterator<Item = &Arc<ModuleRecord>> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Every binding matching the event, in module then registration order
    pub fn matching(&self, event: &Event) -> Vec<Match> {
        self.modules
            .values()
            .flat_map(|record| record.bindings.iter())
            .filter_map(|binding| {
                binding.pattern.matches(event).map(|captures| Match {
                    binding: Arc::clone(binding),
                    captures,
                })
            })
            .collect()
    }

    fn with_module(&self, record: Arc<ModuleRecord>) -> Self {
        let mut modules = self.modules.clone();
        modules.insert(record.module_id.clone(), record);
        Self {
            version: self.version + 1,
            modules,
        }
    }

    fn without_module(&self, module_id: &str) -> Self {
        let mut modules = self.modules.clone();
        modules.remove(module_id);
        Self {
            version: self.version + 1,
            modules,
        }
    }
}

/// Holder of the current snapshot. Publishing swaps the whole table.
#[derive(Default)]
pub struct SharedTable {
    current: RwLock<Arc<RouterTable>>,
}

impl SharedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current snapshot
    pub fn load(&self) -> Arc<RouterTable> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Insert or replace a module's bindings in one publish
    pub fn publish_module(
        &self,
        module_id: &str,
        description: &str,
        bindings: Vec<HandlerBinding>,
    ) -> Arc<ModuleRecord> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);

        let version = current.module(module_id).map(|r| r.version + 1).unwrap_or(1);
        let record = Arc::new(ModuleRecord {
            module_id: module_id.to_string(),
            description: description.to_string(),
            bindings: bindings.into_iter().map(Arc::new).collect(),
            loaded_at: Utc::now(),
            version,
        });

        let next = current.with_module(Arc::clone(&record));
        *current = Arc::new(next);
        record
    }

    /// Drop a module's bindings, returning its record if it was present
    pub fn remove_module(&self, module_id: &str) -> Option<Arc<ModuleRecord>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);

        let record = current.module(module_id).cloned()?;
        let next = current.without_module(module_id);
        *current = Arc::new(next);
        Some(record)
    }
}
