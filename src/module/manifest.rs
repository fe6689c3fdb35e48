use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of a module manifest inside the module directory.
pub const MANIFEST_FILE: &str = "module.toml";

/// Per-module manifest (`module.toml`).
///
/// ```toml
/// [info]
/// name = "News"
/// version = "1.2.0"
///
/// [config]
/// hasAdmin = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// `[info]` table
    pub info: ManifestInfo,
    /// `[config]` table
    #[serde(default)]
    pub config: ManifestConfig,
}

/// Descriptive module metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInfo {
    /// Version recorded in the module store at install time
    pub version: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Module behaviour flags.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Boolean-like: `true` or `"true"`
    #[serde(rename = "hasAdmin", default)]
    pub has_admin: Option<toml::Value>,
}

impl ModuleManifest {
    /// Parse manifest text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or `info.version` is
    /// missing.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid module manifest")
    }

    /// Read and parse `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    /// `info.version`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.info.version
    }

    /// Whether the module ships an admin panel.
    #[must_use]
    pub fn has_admin(&self) -> bool {
        match &self.config.has_admin {
            Some(toml::Value::Boolean(b)) => *b,
            Some(toml::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}
