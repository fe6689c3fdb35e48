//! # Configuration
//!
//! Application configuration is read from a YAML file and then overridden by
//! environment variables.
//!
//! ```yaml
//! modules_root: modules
//! routes_file: config/routes.json
//! store_file: config/modules.json
//! default_module: news
//! admin_module: admin
//! admin_controller: admin
//! offline: false
//! installed_check: always   # or: cached
//! enable_query_strings: false
//! uri_param: uri
//! module_param: m
//! controller_param: c
//! action_param: a
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `MODR_MODULES_ROOT` | `modules_root` |
//! | `MODR_ROUTES_FILE` | `routes_file` |
//! | `MODR_STORE_FILE` | `store_file` |
//! | `MODR_DEFAULT_MODULE` | `default_module` |
//! | `MODR_OFFLINE` | `offline` |
//! | `MODR_INSTALLED_CHECK` | `installed_check` |
//!
//! Relative paths in a config file are resolved against the file's directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

/// How [`crate::module::Module::is_installed`] consults the module store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstalledCheck {
    /// Query the store on every call.
    #[default]
    Always,
    /// Query once per module; install/uninstall refresh the cached answer.
    Cached,
}

impl InstalledCheck {
    /// Parse `always` / `cached` (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Some(InstalledCheck::Always),
            "cached" => Some(InstalledCheck::Cached),
            _ => None,
        }
    }
}

/// Routing core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory containing one sub-directory per module
    pub modules_root: PathBuf,
    /// Global persisted route table
    pub routes_file: PathBuf,
    /// Installed-module records (JSON store)
    pub store_file: PathBuf,
    /// Path dispatched for an empty request path
    pub default_module: String,
    /// The only module allowed to dispatch to `admin_controller`
    pub admin_module: String,
    /// Controller name reserved for the admin module
    pub admin_controller: String,
    /// Maintenance mode: every request is served `error/offline`
    pub offline: bool,
    /// Installed-state query policy
    pub installed_check: InstalledCheck,
    /// Build the request path from module/controller/action query params
    pub enable_query_strings: bool,
    /// Query parameter carrying the request path
    pub uri_param: String,
    /// Query parameter carrying the module (query-string mode)
    pub module_param: String,
    /// Query parameter carrying the controller (query-string mode)
    pub controller_param: String,
    /// Query parameter carrying the action (query-string mode)
    pub action_param: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            modules_root: PathBuf::from("modules"),
            routes_file: PathBuf::from("config/routes.json"),
            store_file: PathBuf::from("config/modules.json"),
            default_module: "news".to_string(),
            admin_module: "admin".to_string(),
            admin_controller: "admin".to_string(),
            offline: false,
            installed_check: InstalledCheck::Always,
            enable_query_strings: false,
            uri_param: "uri".to_string(),
            module_param: "m".to_string(),
            controller_param: "c".to_string(),
            action_param: "a".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults rooted at `base`.
    #[must_use]
    pub fn rooted_at(base: &Path) -> Self {
        let mut config = Self::default();
        config.resolve_paths(base);
        config
    }

    /// Load a YAML config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Load `path` if given, else defaults; then apply environment overrides.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::load`].
    pub fn from_file_and_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `MODR_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(v) = env::var("MODR_MODULES_ROOT") {
            self.modules_root = PathBuf::from(v);
        }
        if let Ok(v) = env::var("MODR_ROUTES_FILE") {
            self.routes_file = PathBuf::from(v);
        }
        if let Ok(v) = env::var("MODR_STORE_FILE") {
            self.store_file = PathBuf::from(v);
        }
        if let Ok(v) = env::var("MODR_DEFAULT_MODULE") {
            self.default_module = v;
        }
        if let Ok(v) = env::var("MODR_OFFLINE") {
            match v.parse() {
                Ok(offline) => self.offline = offline,
                Err(_) => warn!(value = %v, "Ignoring invalid MODR_OFFLINE"),
            }
        }
        if let Ok(v) = env::var("MODR_INSTALLED_CHECK") {
            match InstalledCheck::parse(&v) {
                Some(policy) => self.installed_check = policy,
                None => warn!(value = %v, "Ignoring invalid MODR_INSTALLED_CHECK"),
            }
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.modules_root,
            &mut self.routes_file,
            &mut self.store_file,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
