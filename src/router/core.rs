//! Router core: path resolution and module dispatch.

use crate::config::AppConfig;
use crate::dispatcher::ActionOutput;
use crate::error::RouterError;
use crate::module::{Module, ModuleRegistry};
use crate::persist::FileLock;
use crate::request::RequestInfo;
use crate::response::{ErrorPage, ErrorRoute};
use crate::route::{ParamVec, ResolvedRoute, RouteCollection};
use arc_swap::ArcSwap;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, info_span, warn};
use ulid::Ulid;

/// Collapse repeated slashes, trim leading/trailing slashes and lowercase.
#[must_use]
pub fn normalize(path: &str) -> String {
    path.to_lowercase()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Identifier shared by every step of one dispatch chain, including the
/// error route it falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchId(Ulid);

impl DispatchId {
    pub(crate) fn new() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a path could not be resolved to a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The third segment names an underscore-prefixed action
    PrivateAction(String),
    /// The module cannot be loaded
    ModuleNotFound(String),
    /// The module loads but has no installed record
    NotInstalled(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::PrivateAction(action) => write!(f, "action '{action}' is private"),
            FallbackReason::ModuleNotFound(name) => write!(f, "module '{name}' not found"),
            FallbackReason::NotInstalled(name) => write!(f, "module '{name}' is not installed"),
        }
    }
}

/// Outcome of [`Router::load_module`].
#[derive(Debug)]
pub enum Resolution {
    /// A module and the dispatch data for the path
    Found {
        /// Module to invoke
        module: Arc<Module>,
        /// Resolved controller/action/params
        route: ResolvedRoute,
    },
    /// One of the fixed error routes; rendered without dispatch
    Terminal(ErrorRoute),
    /// No module; the caller serves `error/404`
    Fallback(FallbackReason),
}

/// Dispatch data returned by [`Router::forge`].
#[derive(Debug, Clone)]
pub struct Forged {
    pub module: Arc<Module>,
    pub controller: String,
    pub action: String,
    pub params: ParamVec,
}

/// A completed action invocation.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// Id of the dispatch chain
    pub id: DispatchId,
    pub module: String,
    pub controller: String,
    pub action: String,
    pub params: ParamVec,
    /// What the action returned
    pub output: ActionOutput,
    /// Error route this action served, directly or as a fallback
    pub fallback: Option<ErrorRoute>,
}

/// Result of [`Router::execute`].
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// An action ran (possibly an error module's action)
    Invoked(Dispatch),
    /// A terminal error page was produced
    Terminal(ErrorPage),
}

impl DispatchOutcome {
    /// HTTP status implied by the outcome: 200 for a routed action, the
    /// error route's status for a fallback or terminal page.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchOutcome::Invoked(dispatch) => {
                dispatch.fallback.map_or(200, ErrorRoute::status)
            }
            DispatchOutcome::Terminal(page) => page.status,
        }
    }

    fn serving(self, fallback: ErrorRoute) -> Self {
        match self {
            DispatchOutcome::Invoked(dispatch) => DispatchOutcome::Invoked(Dispatch {
                fallback: Some(fallback),
                ..dispatch
            }),
            terminal @ DispatchOutcome::Terminal(_) => terminal,
        }
    }
}

enum Attempt {
    Done(DispatchOutcome),
    Redirect(ErrorRoute),
}

type ModuleLookup = Result<Arc<Module>, FallbackReason>;

/// Resolves request paths to modules and dispatches them.
///
/// The global route table is loaded once by [`Router::init`] (called lazily
/// by every operation) and swapped wholesale by [`Router::add_routes`] and
/// [`Router::remove_route`].
#[derive(Debug)]
pub struct Router {
    config: Arc<AppConfig>,
    modules: Arc<ModuleRegistry>,
    routes: ArcSwap<RouteCollection>,
    initialized: OnceCell<()>,
    request_handled: AtomicBool,
    write_lock: Mutex<()>,
}

impl Router {
    /// Router over `modules` configured by `config`.
    pub fn new(config: Arc<AppConfig>, modules: Arc<ModuleRegistry>) -> Self {
        Self {
            config,
            modules,
            routes: ArcSwap::from_pointee(RouteCollection::new()),
            initialized: OnceCell::new(),
            request_handled: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// Load the global route table. Later calls do nothing.
    ///
    /// A missing routes file is an empty table.
    ///
    /// # Errors
    ///
    /// [`RouterError::RouteFile`] if the file exists but cannot be loaded.
    pub fn init(&self) -> Result<(), RouterError> {
        self.initialized
            .get_or_try_init(|| {
                let path = &self.config.routes_file;
                let table = self.persisted_routes()?;
                let summary: Vec<&str> = table.iter().take(10).map(|r| r.source()).collect();
                info!(
                    routes_count = table.len(),
                    routes_file = %path.display(),
                    routes_summary = ?summary,
                    "Routing table loaded"
                );
                self.routes.store(Arc::new(table));
                Ok(())
            })
            .map(|_| ())
    }

    /// Resolve `path` to a module and dispatch data.
    ///
    /// Order: global route table, then the first segment as module name
    /// with its own route table, then the fixed error routes, then
    /// positional `module/controller/action/params...` parsing.
    ///
    /// # Errors
    ///
    /// Only storage failures are errors; everything unresolvable is a
    /// [`Resolution::Fallback`].
    pub fn load_module(&self, path: &str) -> Result<Resolution, RouterError> {
        self.init()?;

        let mut path = normalize(path);
        if path.is_empty() {
            path = normalize(&self.config.default_module);
        } else if let Some(action) = path.split('/').nth(2).filter(|a| a.starts_with('_')) {
            debug!(path = %path, action = %action, "Refusing private action");
            return Ok(Resolution::Fallback(FallbackReason::PrivateAction(
                action.to_string(),
            )));
        }

        if let Some(route) = self.routes.load().lookup(&path) {
            debug!(path = %path, module = %route.module, "Global route found");
            return Ok(match self.installed_module(&route.module)? {
                Ok(module) => Resolution::Found { module, route },
                Err(reason) => Resolution::Fallback(reason),
            });
        }

        let name = path.split('/').next().unwrap_or_default();
        debug!(path = %path, module = %name, "Loading module");
        let module = match self.installed_module(name)? {
            Ok(module) => module,
            Err(reason) => return Ok(Resolution::Fallback(reason)),
        };

        if let Some(route) = module_route(&module, &path) {
            return Ok(Resolution::Found { module, route });
        }
        if let Some(error) = ErrorRoute::from_path(&path) {
            return Ok(Resolution::Terminal(error));
        }
        let route = ResolvedRoute::from_path(&path);
        Ok(Resolution::Found { module, route })
    }

    /// Resolve `path` without invoking anything.
    ///
    /// Returns `None` when the path would end at an error route.
    ///
    /// # Errors
    ///
    /// See [`Router::load_module`].
    pub fn forge(
        &self,
        request: &RequestInfo,
        path: &str,
        is_ajax: Option<bool>,
    ) -> Result<Option<Forged>, RouterError> {
        debug!(path = %path, "Forging route");
        match self.load_module(path)? {
            Resolution::Found { module, route } => {
                let (controller, action) = route.select(is_ajax.unwrap_or_else(|| request.is_ajax()));
                Ok(Some(Forged {
                    controller: controller.to_string(),
                    action: action.to_string(),
                    params: route.params.clone(),
                    module,
                }))
            }
            Resolution::Terminal(_) | Resolution::Fallback(_) => Ok(None),
        }
    }

    /// Resolve and dispatch `path`.
    ///
    /// Unresolvable paths and missing controllers/actions are served by
    /// `error/404`, admin-controller access outside the admin module by
    /// `error/403`. An error route that itself fails ends in its terminal
    /// page, so at most one fallback happens per call.
    ///
    /// # Errors
    ///
    /// Action failures and storage errors outside the error routes.
    pub fn execute(
        &self,
        request: &RequestInfo,
        path: &str,
        is_ajax: Option<bool>,
    ) -> Result<DispatchOutcome, RouterError> {
        let id = DispatchId::new();
        let span = info_span!("dispatch", dispatch_id = %id, method = %request.method());
        let _enter = span.enter();
        self.run(request, path, is_ajax, id)
    }

    /// Dispatch the inbound request once per router.
    ///
    /// In offline mode `error/offline` is served instead. Returns `None` once
    /// a call has succeeded; a failed call leaves the request unhandled.
    ///
    /// # Errors
    ///
    /// See [`Router::execute`].
    pub fn handle_request(
        &self,
        request: &RequestInfo,
    ) -> Result<Option<DispatchOutcome>, RouterError> {
        if self.request_handled.swap(true, Ordering::SeqCst) {
            debug!("Request already handled");
            return Ok(None);
        }
        let path = if self.config.offline {
            ErrorRoute::Offline.path().to_string()
        } else {
            request.route_path(&self.config)
        };
        let result = self.execute(request, &path, None);
        if result.is_err() {
            self.request_handled.store(false, Ordering::SeqCst);
        }
        result.map(Some)
    }

    /// Merge `routes` into the persisted table and swap it in.
    ///
    /// The routes file is re-read under its lock, so routes written by other
    /// routers since [`Router::init`] are kept.
    ///
    /// # Errors
    ///
    /// [`RouterError::RouteFile`] if the table cannot be read or written; the
    /// in-memory table is left unchanged.
    pub fn add_routes(&self, routes: RouteCollection) -> Result<(), RouterError> {
        self.init()?;
        let _guard = self.lock_writer()?;
        let lock = self.lock_routes_file()?;
        let mut table = self.persisted_routes()?;
        let added = routes.len();
        table.merge(routes);
        table.save_locked(&lock)?;
        info!(added, routes_count = table.len(), "Routes added");
        self.routes.store(Arc::new(table));
        Ok(())
    }

    /// Remove route `key` from the persisted table and swap it in.
    ///
    /// Returns `false` (and writes nothing) if no such route exists.
    ///
    /// # Errors
    ///
    /// [`RouterError::RouteFile`] if the table cannot be read or written.
    pub fn remove_route(&self, key: &str) -> Result<bool, RouterError> {
        self.init()?;
        let _guard = self.lock_writer()?;
        let lock = self.lock_routes_file()?;
        let mut table = self.persisted_routes()?;
        if table.remove(key).is_none() {
            debug!(pattern = %key, "No route to remove");
            return Ok(false);
        }
        table.save_locked(&lock)?;
        info!(pattern = %key, routes_count = table.len(), "Route removed");
        self.routes.store(Arc::new(table));
        Ok(true)
    }

    /// Snapshot of the global route table.
    ///
    /// # Errors
    ///
    /// See [`Router::init`].
    pub fn fetch_routes(&self) -> Result<Arc<RouteCollection>, RouterError> {
        self.init()?;
        Ok(self.routes.load_full())
    }

    fn run(
        &self,
        request: &RequestInfo,
        path: &str,
        is_ajax: Option<bool>,
        id: DispatchId,
    ) -> Result<DispatchOutcome, RouterError> {
        debug!(path = %path, "Executing route");
        let is_ajax = is_ajax.unwrap_or_else(|| request.is_ajax());
        let current = ErrorRoute::from_path(&normalize(path));

        match (self.attempt(request, path, is_ajax, id), current) {
            (Ok(Attempt::Done(outcome)), Some(current)) => Ok(outcome.serving(current)),
            (Ok(Attempt::Done(outcome)), None) => Ok(outcome),
            (Ok(Attempt::Redirect(target)), None) => {
                info!(path = %path, target = %target, "Falling back to error route");
                self.run(request, target.path(), None, id)
            }
            (Ok(Attempt::Redirect(target)), Some(current)) => {
                warn!(route = %current, wanted = %target, "Error route unresolved; serving terminal page");
                Ok(DispatchOutcome::Terminal(ErrorPage::render(current, is_ajax)))
            }
            (Err(e), None) => Err(e),
            (Err(e), Some(current)) => {
                warn!(route = %current, error = %e, "Error route failed; serving terminal page");
                Ok(DispatchOutcome::Terminal(ErrorPage::render(current, is_ajax)))
            }
        }
    }

    fn attempt(
        &self,
        request: &RequestInfo,
        path: &str,
        is_ajax: bool,
        id: DispatchId,
    ) -> Result<Attempt, RouterError> {
        let (module, route) = match self.load_module(path)? {
            Resolution::Found { module, route } => (module, route),
            Resolution::Terminal(error) => {
                return Ok(Attempt::Done(DispatchOutcome::Terminal(ErrorPage::render(
                    error, is_ajax,
                ))));
            }
            Resolution::Fallback(reason) => {
                info!(path = %path, reason = %reason, "No module for route");
                return Ok(Attempt::Redirect(ErrorRoute::NotFound));
            }
        };

        let (controller, action) = route.select(is_ajax);
        if controller.eq_ignore_ascii_case(&self.config.admin_controller)
            && !module.name().eq_ignore_ascii_case(&self.config.admin_module)
        {
            warn!(module = %module.name(), controller = %controller, "Admin controller outside the admin module");
            return Ok(Attempt::Redirect(ErrorRoute::Forbidden));
        }

        match module.invoke(controller, action, &route.params, request) {
            Ok(output) => {
                info!(
                    module = %module.name(),
                    controller = %controller,
                    action = %action,
                    params = ?route.params,
                    is_ajax,
                    "Dispatched"
                );
                Ok(Attempt::Done(DispatchOutcome::Invoked(Dispatch {
                    id,
                    module: module.name().to_string(),
                    controller: controller.to_string(),
                    action: action.to_string(),
                    params: route.params.clone(),
                    output,
                    fallback: None,
                })))
            }
            Err(e) if e.is_not_found() => {
                info!(error = %e, "Dispatch target not found");
                Ok(Attempt::Redirect(ErrorRoute::NotFound))
            }
            Err(e) => Err(e),
        }
    }

    fn installed_module(&self, name: &str) -> Result<ModuleLookup, RouterError> {
        let module = match self.modules.get(name) {
            Ok(module) => module,
            Err(e) => {
                warn!(module = %name, error = %e, "Unable to locate module");
                return Ok(Err(FallbackReason::ModuleNotFound(name.to_string())));
            }
        };
        if !module.is_installed()? {
            warn!(module = %name, "Module is not installed");
            return Ok(Err(FallbackReason::NotInstalled(name.to_string())));
        }
        Ok(Ok(module))
    }

    /// The routes file as currently persisted; a missing file is an empty table.
    fn persisted_routes(&self) -> Result<RouteCollection, RouterError> {
        let path = &self.config.routes_file;
        if path.exists() {
            RouteCollection::load(path)
        } else {
            debug!(routes_file = %path.display(), "No routes file; using an empty table");
            Ok(RouteCollection::new())
        }
    }

    fn lock_routes_file(&self) -> Result<FileLock, RouterError> {
        let path = &self.config.routes_file;
        FileLock::acquire(path).map_err(|source| RouterError::RouteFile {
            path: path.clone(),
            source,
        })
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, ()>, RouterError> {
        self.write_lock.lock().map_err(|_| RouterError::RouteFile {
            path: self.config.routes_file.clone(),
            source: anyhow::anyhow!("route writer lock poisoned"),
        })
    }
}

fn module_route(module: &Module, path: &str) -> Option<ResolvedRoute> {
    let file = module.routes_file();
    if !file.is_file() {
        return None;
    }
    match RouteCollection::load(&file) {
        Ok(table) => {
            let found = table.lookup(path);
            if found.is_none() {
                debug!(module = %module.name(), path = %path, "No module route matched; using positional route");
            }
            found
        }
        Err(e) => {
            warn!(module = %module.name(), error = %e, "Ignoring unreadable module routes");
            None
        }
    }
}
