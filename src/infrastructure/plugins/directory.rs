//! Module files in a directory, with change notification

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::manifest::{ManifestModule, ModuleManifest};
use crate::application::errors::LoadError;
use crate::plugins::trait_def::{ChangeCallback, CommandModule, ModuleSource, WatchHandle};

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Serves every `*.yaml`/`*.yml` file in `dir`, keyed by file name
pub struct ManifestDirectory {
    dir: PathBuf,
}

impl ManifestDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path for a module id, refusing anything but a plain module file name
    fn module_path(&self, module_id: &str) -> Result<PathBuf, LoadError> {
        if !is_module_file(module_id) || module_id.contains(['/', '\\']) {
            return Err(LoadError::NotFound(module_id.to_string()));
        }
        Ok(self.dir.join(module_id))
    }
}

fn is_module_file(name: &str) -> bool {
    if name.starts_with('.') {
        return false;
    }
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl ModuleSource for ManifestDirectory {
    fn list_available(&self) -> Result<Vec<String>, LoadError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| LoadError::Source(format!("{}: {}", self.dir.display(), e)))?;

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_module_file(name))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn read(&self, module_id: &str) -> Result<Arc<dyn CommandModule>, LoadError> {
        let path = self.module_path(module_id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(module_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let manifest = ModuleManifest::parse(module_id, &content)?;
        Ok(Arc::new(ManifestModule::new(manifest)))
    }

    fn install(&self, file_name: &str, bytes: &[u8]) -> Result<String, LoadError> {
        let path = self.module_path(file_name)?;
        let content = std::str::from_utf8(bytes).map_err(|e| LoadError::Parse {
            module: file_name.to_string(),
            reason: e.to_string(),
        })?;

        // Refuse files that would not load
        ModuleManifest::parse(file_name, content)?;

        std::fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{}.tmp", file_name));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;

        Ok(file_name.to_string())
    }

    fn watch(&self, on_change: ChangeCallback) -> Result<Option<WatchHandle>, LoadError> {
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("Module watcher error: {}", e);
                        return;
                    }
                };

                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }

                for path in &event.paths {
                    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    if is_module_file(name) {
                        tracing::debug!("Module file changed: {}", name);
                        on_change(name.to_string());
                    }
                }
            },
            Config::default(),
        )
        .map_err(|e| LoadError::Source(format!("failed to create watcher: {}", e)))?;

        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|e| LoadError::Source(format!("failed to watch {}: {}", self.dir.display(), e)))?;

        tracing::info!("Watching {} for module changes", self.dir.display());
        Ok(Some(WatchHandle::new(watcher)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECHO: &str = "commands:\n  - command: echo\n    args: '(.+)'\n    reply: '$1'\n";

    #[test]
    fn lists_only_visible_module_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.yaml", "a.yml", ".hidden.yaml", "notes.txt"] {
            std::fs::write(dir.path().join(name), ECHO).unwrap();
        }

        let source = ManifestDirectory::new(dir.path());

        assert_eq!(source.list_available().unwrap(), vec!["a.yml", "b.yaml"]);
    }

    #[test]
    fn missing_directory_is_a_source_error() {
        let source = ManifestDirectory::new("/definitely/not/here");
        assert!(matches!(source.list_available(), Err(LoadError::Source(_))));
    }

    #[test]
    fn install_rejects_unparseable_files_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let source = ManifestDirectory::new(dir.path());

        let err = source.install("bad.yaml", b"commands: [").unwrap_err();

        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(source.list_available().unwrap().is_empty());
    }

    #[test]
    fn install_refuses_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let source = ManifestDirectory::new(dir.path());

        assert!(source.install("../escape.yaml", ECHO.as_bytes()).is_err());
        assert!(source.install("script.sh", ECHO.as_bytes()).is_err());
    }

    #[test]
    fn installed_module_can_be_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let source = ManifestDirectory::new(dir.path());

        let id = source.install("echo.yaml", ECHO.as_bytes()).unwrap();

        assert_eq!(id, "echo.yaml");
        assert!(source.read("echo.yaml").is_ok());
        assert!(matches!(source.read("gone.yaml"), Err(LoadError::NotFound(_))));
    }
}
