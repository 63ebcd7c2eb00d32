//! In-process module sources

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::trait_def::{ChangeCallback, CommandModule, ModuleSource, WatchHandle};
use crate::application::errors::LoadError;

/// Modules compiled into the binary, keyed by id
#[derive(Default)]
pub struct StaticModuleSource {
    modules: RwLock<BTreeMap<String, Arc<dyn CommandModule>>>,
}

impl StaticModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module<M: CommandModule + 'static>(self, module_id: &str, module: M) -> Self {
        self.insert(module_id, Arc::new(module));
        self
    }

    /// Add or replace a module
    pub fn insert(&self, module_id: &str, module: Arc<dyn CommandModule>) {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module_id.to_string(), module);
    }

    pub fn remove(&self, module_id: &str) -> Option<Arc<dyn CommandModule>> {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(module_id)
    }
}

impl ModuleSource for StaticModuleSource {
    fn list_available(&self) -> Result<Vec<String>, LoadError> {
        Ok(self
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }

    fn read(&self, module_id: &str) -> Result<Arc<dyn CommandModule>, LoadError> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module_id)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(module_id.to_string()))
    }
}

/// Ordered union of sources; the first one listing an id serves it
#[derive(Default)]
pub struct CompositeSource {
    sources: Vec<Arc<dyn ModuleSource>>,
}

impl CompositeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Arc<dyn ModuleSource>) -> Self {
        self.sources.push(source);
        self
    }

    fn owner(&self, module_id: &str) -> Result<&Arc<dyn ModuleSource>, LoadError> {
        for source in &self.sources {
            if source.list_available()?.iter().any(|id| id == module_id) {
                return Ok(source);
            }
        }
        Err(LoadError::NotFound(module_id.to_string()))
    }
}

impl ModuleSource for CompositeSource {
    fn list_available(&self) -> Result<Vec<String>, LoadError> {
        let mut ids = Vec::new();
        for source in &self.sources {
            for id in source.list_available()? {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    fn read(&self, module_id: &str) -> Result<Arc<dyn CommandModule>, LoadError> {
        self.owner(module_id)?.read(module_id)
    }

    /// The first source accepting uploads stores the file
    fn install(&self, file_name: &str, bytes: &[u8]) -> Result<String, LoadError> {
        for source in &self.sources {
            match source.install(file_name, bytes) {
                Err(LoadError::Unsupported) => continue,
                result => return result,
            }
        }
        Err(LoadError::Unsupported)
    }

    fn watch(&self, on_change: ChangeCallback) -> Result<Option<WatchHandle>, LoadError> {
        let mut handles = Vec::new();
        for source in &self.sources {
            if let Some(handle) = source.watch(Arc::clone(&on_change))? {
                handles.push(handle);
            }
        }

        if handles.is_empty() {
            Ok(None)
        } else {
            Ok(Some(WatchHandle::merge(handles)))
        }
    }
}
