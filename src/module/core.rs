use super::manifest::{ModuleManifest, MANIFEST_FILE};
use crate::config::InstalledCheck;
use crate::dispatcher::{Action, ActionContext, ActionOutput, Controller, ControllerRegistry};
use crate::error::RouterError;
use crate::events::{EventHandler, MODULE_INSTALLED, MODULE_UNINSTALLED};
use crate::request::RequestInfo;
use crate::route::capitalize;
use crate::store::{ModuleRecord, ModuleStore};
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};

/// Controller whose `install` / `uninstall` actions run as lifecycle hooks.
pub const ADMIN_EXTENSION: &str = "AdminExtension";

/// Shared collaborators handed to every module.
#[derive(Clone)]
pub struct ModuleServices {
    /// Action registry for all modules
    pub controllers: Arc<ControllerRegistry>,
    /// Installed-state oracle
    pub store: Arc<dyn ModuleStore>,
    /// Lifecycle event sink
    pub events: Arc<EventHandler>,
    /// How `is_installed` consults the store
    pub installed_check: InstalledCheck,
}

impl fmt::Debug for ModuleServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleServices")
            .field("controllers", &self.controllers)
            .field("events", &self.events)
            .field("installed_check", &self.installed_check)
            .finish_non_exhaustive()
    }
}

/// A loaded module: its directory, manifest and install state.
#[derive(Debug)]
pub struct Module {
    name: String,
    root_path: PathBuf,
    manifest: ModuleManifest,
    services: ModuleServices,
    installed: RwLock<Option<bool>>,
}

impl Module {
    /// Load module `name` from `modules_root/name`.
    ///
    /// # Errors
    ///
    /// [`RouterError::ModuleNotFound`] if the directory or its manifest is
    /// missing or the manifest cannot be parsed.
    pub fn open(name: &str, modules_root: &Path, services: ModuleServices) -> Result<Self, RouterError> {
        let root_path = modules_root.join(name);
        if !root_path.is_dir() {
            return Err(RouterError::ModuleNotFound {
                name: name.to_string(),
                reason: format!("directory {} does not exist", root_path.display()),
            });
        }
        let manifest = ModuleManifest::load(&root_path.join(MANIFEST_FILE)).map_err(|e| {
            RouterError::ModuleNotFound {
                name: name.to_string(),
                reason: format!("{e:#}"),
            }
        })?;
        Ok(Self {
            name: name.to_string(),
            root_path,
            manifest,
            services,
            installed: RwLock::new(None),
        })
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module directory.
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Parsed `module.toml`.
    #[must_use]
    pub fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    /// Whether the manifest declares an admin panel.
    #[must_use]
    pub fn has_admin(&self) -> bool {
        self.manifest.has_admin()
    }

    /// Per-module route file (`config/routes.json`).
    #[must_use]
    pub fn routes_file(&self) -> PathBuf {
        self.root_path.join("config").join("routes.json")
    }

    /// Invoke `action` on `controller` with `params`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ControllerNotFound`] if the module registers no such controller
    /// - [`RouterError::MethodNotFound`] if the action is absent or private
    /// - [`RouterError::Action`] if the handler fails
    pub fn invoke(
        &self,
        controller: &str,
        action: &str,
        params: &[String],
        request: &RequestInfo,
    ) -> Result<ActionOutput, RouterError> {
        let ctl = self.controller(controller)?;
        let found = ctl
            .find_action(action)
            .ok_or_else(|| RouterError::MethodNotFound {
                controller: ctl.name().to_string(),
                action: action.to_string(),
                not_public: false,
            })?;
        self.call(&ctl, found, params, request)
    }

    /// REST-style variant of [`Module::invoke`].
    ///
    /// Looks for `{verb}{Action}` (verb lowercased) and then `action{Action}`;
    /// the first one declared is used.
    ///
    /// # Errors
    ///
    /// Same as [`Module::invoke`].
    pub fn invoke_action(
        &self,
        controller: &str,
        action: &str,
        params: &[String],
        request: &RequestInfo,
    ) -> Result<ActionOutput, RouterError> {
        let ctl = self.controller(controller)?;
        let suffix = capitalize(action);
        let verb = request.method().as_str().to_ascii_lowercase();
        let candidates = [format!("{verb}{suffix}"), format!("action{suffix}")];
        let found = candidates
            .iter()
            .find_map(|name| ctl.find_action(name))
            .ok_or_else(|| RouterError::MethodNotFound {
                controller: ctl.name().to_string(),
                action: candidates[1].clone(),
                not_public: false,
            })?;
        self.call(&ctl, found, params, request)
    }

    /// Run the install hook and record the module as installed.
    ///
    /// Already-installed modules are left untouched.
    ///
    /// # Errors
    ///
    /// [`RouterError::Lifecycle`] if the hook fails or returns a falsy value,
    /// [`RouterError::Store`] if the record cannot be written.
    pub fn install(&self) -> Result<(), RouterError> {
        if self.is_installed()? {
            debug!(module = %self.name, "Module already installed");
            return Ok(());
        }
        self.run_hook("install")?;

        let record = ModuleRecord {
            name: self.name.clone(),
            version: self.manifest.version().to_string(),
        };
        self.services
            .store
            .insert(&record)
            .map_err(|source| self.store_error(source))?;
        self.set_installed(true);

        info!(module = %self.name, version = %record.version, "Module installed");
        self.services
            .events
            .trigger(MODULE_INSTALLED, &[json!(record.name), json!(record.version)]);
        Ok(())
    }

    /// Run the uninstall hook and remove the module's record.
    ///
    /// # Errors
    ///
    /// Same as [`Module::install`].
    pub fn uninstall(&self) -> Result<(), RouterError> {
        self.run_hook("uninstall")?;

        let removed = self
            .services
            .store
            .delete(&self.name)
            .map_err(|source| self.store_error(source))?;
        self.set_installed(false);

        info!(module = %self.name, removed, "Module uninstalled");
        self.services
            .events
            .trigger(MODULE_UNINSTALLED, &[json!(self.name)]);
        Ok(())
    }

    /// Whether the module store has a record for this module.
    ///
    /// With [`InstalledCheck::Cached`] the store is asked once and the answer
    /// is kept until the next install/uninstall.
    ///
    /// # Errors
    ///
    /// [`RouterError::Store`] if the store query fails.
    pub fn is_installed(&self) -> Result<bool, RouterError> {
        let cached = self.services.installed_check == InstalledCheck::Cached;
        if cached {
            if let Some(answer) = self.installed.read().ok().and_then(|g| *g) {
                return Ok(answer);
            }
        }
        let answer = self
            .services
            .store
            .is_installed(&self.name)
            .map_err(|source| self.store_error(source))?;
        if cached {
            self.set_installed(answer);
        }
        Ok(answer)
    }

    fn controller(&self, name: &str) -> Result<Arc<Controller>, RouterError> {
        self.services
            .controllers
            .get(&self.name, name)
            .ok_or_else(|| RouterError::ControllerNotFound {
                module: self.name.clone(),
                controller: name.to_string(),
            })
    }

    fn call(
        &self,
        controller: &Controller,
        action: &Action,
        params: &[String],
        request: &RequestInfo,
    ) -> Result<ActionOutput, RouterError> {
        if !action.is_public() {
            return Err(RouterError::MethodNotFound {
                controller: controller.name().to_string(),
                action: action.name().to_string(),
                not_public: true,
            });
        }
        debug!(
            module = %self.name,
            controller = %controller.name(),
            action = %action.name(),
            params = params.len(),
            "Invoking action"
        );
        let ctx = ActionContext {
            module: self,
            controller: controller.name(),
            action: action.name(),
            request,
        };
        action
            .call(&ctx, params)
            .map_err(|source| RouterError::Action {
                module: self.name.clone(),
                controller: controller.name().to_string(),
                action: action.name().to_string(),
                source,
            })
    }

    fn run_hook(&self, operation: &'static str) -> Result<(), RouterError> {
        let request = RequestInfo::internal();
        let output = match self.invoke(ADMIN_EXTENSION, operation, &[], &request) {
            Ok(output) => output,
            Err(RouterError::ControllerNotFound { .. }) => {
                debug!(module = %self.name, operation, "No admin extension; hook skipped");
                return Ok(());
            }
            Err(RouterError::MethodNotFound {
                not_public: true, ..
            }) => {
                warn!(
                    module = %self.name,
                    operation,
                    "Admin extension hook is not public; skipped"
                );
                return Ok(());
            }
            Err(RouterError::MethodNotFound { .. }) => {
                debug!(module = %self.name, operation, "Admin extension has no hook; skipped");
                return Ok(());
            }
            Err(RouterError::Action { source, .. }) => {
                error!(module = %self.name, operation, error = %source, "Lifecycle hook failed");
                return Err(RouterError::Lifecycle {
                    module: self.name.clone(),
                    operation,
                    source,
                });
            }
            Err(other) => {
                error!(module = %self.name, operation, error = %other, "Lifecycle hook failed");
                return Err(RouterError::Lifecycle {
                    module: self.name.clone(),
                    operation,
                    source: other.into(),
                });
            }
        };
        if output.is_truthy() {
            return Ok(());
        }
        error!(module = %self.name, operation, "Lifecycle hook returned a falsy result");
        Err(RouterError::Lifecycle {
            module: self.name.clone(),
            operation,
            source: anyhow::anyhow!("{operation} hook returned a falsy result"),
        })
    }

    fn set_installed(&self, installed: bool) {
        if self.services.installed_check == InstalledCheck::Cached {
            if let Ok(mut slot) = self.installed.write() {
                *slot = Some(installed);
            }
        }
    }

    fn store_error(&self, source: anyhow::Error) -> RouterError {
        RouterError::Store {
            module: self.name.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryModuleStore;
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn fixture(check: InstalledCheck) -> (TempDir, ModuleServices, Arc<InMemoryModuleStore>) {
        let dir = tempfile::tempdir().unwrap();
        let news = dir.path().join("news");
        std::fs::create_dir_all(&news).unwrap();
        std::fs::write(news.join(MANIFEST_FILE), "[info]\nversion = \"1.4\"\n").unwrap();

        let store = Arc::new(InMemoryModuleStore::new());
        let services = ModuleServices {
            controllers: Arc::new(ControllerRegistry::new()),
            store: Arc::clone(&store) as Arc<dyn ModuleStore>,
            events: Arc::new(EventHandler::new()),
            installed_check: check,
        };
        (dir, services, store)
    }

    #[test]
    fn test_open_requires_directory_and_manifest() {
        let (dir, services, _) = fixture(InstalledCheck::Always);
        std::fs::create_dir_all(dir.path().join("bare")).unwrap();

        assert!(Module::open("news", dir.path(), services.clone()).is_ok());
        let bare = Module::open("bare", dir.path(), services.clone()).unwrap_err();
        assert!(matches!(bare, RouterError::ModuleNotFound { .. }));
        let missing = Module::open("forum", dir.path(), services).unwrap_err();
        assert!(matches!(missing, RouterError::ModuleNotFound { .. }));
    }

    #[test]
    fn test_invoke_private_and_missing_actions() {
        let (dir, services, _) = fixture(InstalledCheck::Always);
        services.controllers.register(
            "news",
            Controller::new("Articles")
                .action("view", |ctx, params| {
                    Ok(ActionOutput::json(json!({ "module": ctx.module.name(), "id": params[0] })))
                })
                .private_action("_load", |_, _| Ok(ActionOutput::empty())),
        );
        let module = Module::open("news", dir.path(), services).unwrap();
        let request = RequestInfo::internal();

        let out = module
            .invoke("articles", "VIEW", &["9".to_string()], &request)
            .unwrap();
        assert_eq!(out.into_inner(), json!({ "module": "news", "id": "9" }));

        let private = module.invoke("Articles", "_load", &[], &request).unwrap_err();
        assert!(matches!(private, RouterError::MethodNotFound { not_public: true, .. }));

        let absent = module.invoke("Articles", "delete", &[], &request).unwrap_err();
        assert!(matches!(absent, RouterError::MethodNotFound { not_public: false, .. }));

        let no_ctl = module.invoke("Feed", "index", &[], &request).unwrap_err();
        assert!(matches!(no_ctl, RouterError::ControllerNotFound { .. }));
    }

    #[test]
    fn test_invoke_action_prefers_verb_then_action_prefix() {
        let (dir, services, _) = fixture(InstalledCheck::Always);
        services.controllers.register(
            "news",
            Controller::new("Api")
                .action("postComment", |_, _| Ok(ActionOutput::json(json!("post"))))
                .action("actionComment", |_, _| Ok(ActionOutput::json(json!("any")))),
        );
        let module = Module::open("news", dir.path(), services).unwrap();

        let post = RequestInfo::new(Method::POST);
        let get = RequestInfo::new(Method::GET);
        assert_eq!(
            module.invoke_action("Api", "comment", &[], &post).unwrap().into_inner(),
            json!("post")
        );
        assert_eq!(
            module.invoke_action("Api", "comment", &[], &get).unwrap().into_inner(),
            json!("any")
        );
        assert!(module.invoke_action("Api", "rate", &[], &get).is_err());
    }

    #[test]
    fn test_install_without_admin_extension() {
        let (dir, services, store) = fixture(InstalledCheck::Always);
        let events = Arc::clone(&services.events);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        events.register(MODULE_INSTALLED, move |args| {
            assert_eq!(args, [json!("news"), json!("1.4")]);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let module = Module::open("news", dir.path(), services).unwrap();
        module.install().unwrap();
        assert!(module.is_installed().unwrap());
        assert_eq!(store.records().unwrap()[0].version, "1.4");

        module.install().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        module.uninstall().unwrap();
        assert!(!module.is_installed().unwrap());
    }

    #[test]
    fn test_falsy_or_failing_hook_aborts_install() {
        let (dir, services, store) = fixture(InstalledCheck::Always);
        services.controllers.register(
            "news",
            Controller::new(ADMIN_EXTENSION)
                .action("install", |_, _| Ok(ActionOutput::from(false)))
                .action("uninstall", |_, _| Err(anyhow::anyhow!("tables locked"))),
        );
        let module = Module::open("news", dir.path(), services).unwrap();

        let err = module.install().unwrap_err();
        assert!(matches!(err, RouterError::Lifecycle { operation: "install", .. }));
        assert!(!store.is_installed("news").unwrap());

        let err = module.uninstall().unwrap_err();
        assert!(err.to_string().contains("tables locked"));
    }

    #[test]
    fn test_private_hook_is_skipped() {
        let (dir, services, _) = fixture(InstalledCheck::Always);
        services.controllers.register(
            "news",
            Controller::new(ADMIN_EXTENSION).private_action("install", |_, _| {
                Err(anyhow::anyhow!("must not run"))
            }),
        );
        let module = Module::open("news", dir.path(), services).unwrap();
        module.install().unwrap();
        assert!(module.is_installed().unwrap());
    }

    #[test]
    fn test_cached_policy_ignores_external_changes() {
        let (dir, services, store) = fixture(InstalledCheck::Cached);
        let module = Module::open("news", dir.path(), services).unwrap();
        assert!(!module.is_installed().unwrap());

        store
            .insert(&ModuleRecord {
                name: "news".into(),
                version: "1.4".into(),
            })
            .unwrap();
        assert!(!module.is_installed().unwrap());

        module.uninstall().unwrap();
        module.install().unwrap();
        assert!(module.is_installed().unwrap());
    }
}
