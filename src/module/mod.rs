//! # Module Registry
//!
//! A module is a directory under the modules root holding a `module.toml`
//! manifest and, optionally, a `config/routes.json` route table. Its
//! controllers are registered in code with the
//! [`ControllerRegistry`](crate::dispatcher::ControllerRegistry).
//!
//! ## Lifecycle
//!
//! ```text
//! Unregistered -> Discovered (exists) -> Loaded (get) -> Installed <-> Uninstalled
//! ```
//!
//! - [`ModuleRegistry::exists`] only looks at directory names.
//! - [`ModuleRegistry::get`] requires the manifest and memoizes the result.
//! - [`Module::install`] / [`Module::uninstall`] run the optional
//!   `AdminExtension` hook and update the [`ModuleStore`](crate::store::ModuleStore).

mod core;
mod manifest;
mod registry;

pub use core::{Module, ModuleServices, ADMIN_EXTENSION};
pub use manifest::{ManifestConfig, ManifestInfo, ModuleManifest, MANIFEST_FILE};
pub use registry::ModuleRegistry;
