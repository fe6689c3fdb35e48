//! Process-wide routing state.
//!
//! [`AppContext`] owns everything the router and modules share: the config,
//! the controller registry, the module store, the event handler, the module
//! registry and the router itself. Build one per process and pass it by
//! reference.

use crate::config::AppConfig;
use crate::dispatcher::ControllerRegistry;
use crate::error::RouterError;
use crate::events::EventHandler;
use crate::module::{Module, ModuleRegistry, ModuleServices};
use crate::router::Router;
use crate::store::{JsonModuleStore, ModuleStore};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct AppContext {
    config: Arc<AppConfig>,
    controllers: Arc<ControllerRegistry>,
    events: Arc<EventHandler>,
    modules: Arc<ModuleRegistry>,
    router: Router,
}

impl AppContext {
    /// Context whose module store is the JSON file at `config.store_file`.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let store = Arc::new(JsonModuleStore::new(&config.store_file));
        Self::with_store(config, store)
    }

    /// Context over a caller-supplied module store.
    #[must_use]
    pub fn with_store(config: AppConfig, store: Arc<dyn ModuleStore>) -> Self {
        let config = Arc::new(config);
        let controllers = Arc::new(ControllerRegistry::new());
        let events = Arc::new(EventHandler::new());
        let services = ModuleServices {
            controllers: Arc::clone(&controllers),
            store,
            events: Arc::clone(&events),
            installed_check: config.installed_check,
        };
        let modules = Arc::new(ModuleRegistry::new(config.modules_root.clone(), services));
        let router = Router::new(Arc::clone(&config), Arc::clone(&modules));
        info!(
            modules_root = %config.modules_root.display(),
            routes_file = %config.routes_file.display(),
            installed_check = ?config.installed_check,
            "Application context created"
        );
        Self {
            config,
            controllers,
            events,
            modules,
            router,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry modules register their controllers with.
    #[must_use]
    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    #[must_use]
    pub fn events(&self) -> &EventHandler {
        &self.events
    }

    #[must_use]
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Installed-state oracle shared by every module.
    #[must_use]
    pub fn store(&self) -> &dyn ModuleStore {
        self.modules.services().store.as_ref()
    }

    /// Shorthand for [`ModuleRegistry::get`].
    ///
    /// # Errors
    ///
    /// [`RouterError::ModuleNotFound`] if the module cannot be loaded.
    pub fn module(&self, name: &str) -> Result<Arc<Module>, RouterError> {
        self.modules.get(name)
    }
}
