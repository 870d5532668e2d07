// Handler registration and discovery.
//
// The authoritative language-to-handler mapping is an explicit
// registration table built once per process; directory discovery only
// resolves names against it and aborts on anything it cannot resolve,
// never yielding a partial registry.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::SdkConfig;
use crate::error::{DiscoveryError, Result};
use crate::runtime::ContainerRuntime;

use super::python::PythonSdk;
use super::traits::{Language, Sdk};

/// Directory names that never correspond to a language handler:
/// shared-code directories and cache artifacts.
const RESERVED_DIRS: &[&str] = &["common", "__pycache__"];

/// Language handler registry, read-only after construction
pub struct SdkRegistry {
    handlers: DashMap<Language, Arc<dyn Sdk>>,
}

impl SdkRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Registry with every built-in handler registered
    pub fn with_builtin(runtime: Arc<dyn ContainerRuntime>, config: &SdkConfig) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(PythonSdk::new(runtime, config.clone())));
        registry
    }

    pub fn register(&self, handler: Arc<dyn Sdk>) {
        self.handlers.insert(handler.language(), handler);
    }

    pub fn resolve(&self, language: Language) -> Result<Arc<dyn Sdk>> {
        self.handlers
            .get(&language)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                DiscoveryError::HandlerNotRegistered {
                    language: language.to_string(),
                    available_languages: self.languages(),
                }
                .into()
            })
    }

    /// Registered language names, sorted
    pub fn languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        names.sort();
        names
    }

    /// Resolve the language directories under `root` against the
    /// registration table. An unknown directory name or an unregistered
    /// language aborts the whole discovery.
    pub fn discover(&self, root: &Path) -> Result<BTreeMap<Language, Arc<dyn Sdk>>> {
        let mut discovered = BTreeMap::new();
        for name in language_dirs(root)? {
            let language: Language = name.parse()?;
            discovered.insert(language, self.resolve(language)?);
        }
        Ok(discovered)
    }
}

impl Default for SdkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Immediate subdirectory names of `root` that may name a language
/// handler: reserved and hidden directories are excluded.
pub fn language_dirs(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(DiscoveryError::InvalidRoot {
            path: root.to_path_buf(),
        }
        .into());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if RESERVED_DIRS.contains(&name.as_str()) || name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}
