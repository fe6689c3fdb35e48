use super::core::{Module, ModuleServices};
use crate::error::RouterError;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Memoized module descriptors plus a one-time scan of the modules root.
#[derive(Debug)]
pub struct ModuleRegistry {
    modules_root: PathBuf,
    services: ModuleServices,
    loaded: DashMap<String, Arc<Module>>,
    discovered: OnceCell<BTreeSet<String>>,
}

impl ModuleRegistry {
    /// Registry for the modules under `modules_root`.
    pub fn new(modules_root: impl Into<PathBuf>, services: ModuleServices) -> Self {
        Self {
            modules_root: modules_root.into(),
            services,
            loaded: DashMap::new(),
            discovered: OnceCell::new(),
        }
    }

    /// Directory scanned for modules.
    #[must_use]
    pub fn modules_root(&self) -> &Path {
        &self.modules_root
    }

    /// Services shared by every module.
    #[must_use]
    pub fn services(&self) -> &ModuleServices {
        &self.services
    }

    /// The module named `name`, loading it on first access.
    ///
    /// # Errors
    ///
    /// [`RouterError::ModuleNotFound`] if the name is not a plain directory
    /// name, or the module directory or manifest is missing.
    pub fn get(&self, name: &str) -> Result<Arc<Module>, RouterError> {
        if let Some(module) = self.loaded.get(name) {
            return Ok(Arc::clone(module.value()));
        }
        if !is_module_name(name) {
            return Err(RouterError::ModuleNotFound {
                name: name.to_string(),
                reason: "not a valid module name".to_string(),
            });
        }

        let module = Module::open(name, &self.modules_root, self.services.clone())?;
        let module = Arc::clone(
            self.loaded
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(module))
                .value(),
        );
        info!(
            module = %name,
            version = %module.manifest().version(),
            loaded_count = self.loaded.len(),
            "Module loaded"
        );
        Ok(module)
    }

    /// Whether a directory named `name` exists under the modules root.
    ///
    /// Only the directory is checked; the manifest may still be missing.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.discovered().contains(name)
    }

    /// Module directory names found by the first scan, sorted.
    #[must_use]
    pub fn discovered(&self) -> &BTreeSet<String> {
        self.discovered.get_or_init(|| scan_modules(&self.modules_root))
    }
}

fn is_module_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn scan_modules(root: &Path) -> BTreeSet<String> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(modules_root = %root.display(), error = %e, "Cannot scan modules root");
            return BTreeSet::new();
        }
    };
    let found: BTreeSet<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    debug!(modules_root = %root.display(), modules = found.len(), "Scanned modules root");
    found
}
