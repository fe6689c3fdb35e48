//! Controller and action registry.
//!
//! Controllers are declared in code: a [`Controller`] is a named list of
//! [`Action`]s, each with a [`Visibility`] fixed at registration. Modules
//! register their controllers with the [`ControllerRegistry`] at startup and
//! [`crate::module::Module::invoke`] resolves `(module, controller, action)`
//! against it.

use crate::module::Module;
use crate::request::RequestInfo;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Value returned by an action.
///
/// Lifecycle hooks are judged by [`ActionOutput::is_truthy`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionOutput(pub Value);

impl ActionOutput {
    /// An action that produced nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self(Value::Null)
    }

    /// Wrap a JSON value.
    #[must_use]
    pub fn json(value: Value) -> Self {
        Self(value)
    }

    /// Loose truthiness: `null`, `false`, `0`, `""`, `"0"`, `[]` and `{}`
    /// are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match &self.0 {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !(s.is_empty() || s == "0"),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }

    /// The wrapped value.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<bool> for ActionOutput {
    fn from(value: bool) -> Self {
        Self(Value::Bool(value))
    }
}

impl From<Value> for ActionOutput {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Whether an action may be dispatched from a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Reachable through routing and lifecycle hooks
    Public,
    /// Declared but never dispatchable
    Private,
}

/// Everything an action can see about the call.
pub struct ActionContext<'a> {
    /// Module that owns the controller
    pub module: &'a Module,
    /// Controller name as registered
    pub controller: &'a str,
    /// Action name as registered
    pub action: &'a str,
    /// The inbound request
    pub request: &'a RequestInfo,
}

/// Action handler: receives the call context and positional params.
pub type ActionHandler =
    Arc<dyn Fn(&ActionContext<'_>, &[String]) -> anyhow::Result<ActionOutput> + Send + Sync>;

/// A named, invocable operation on a controller.
#[derive(Clone)]
pub struct Action {
    name: String,
    visibility: Visibility,
    handler: ActionHandler,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .finish()
    }
}

impl Action {
    /// Action name as registered.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the action may be dispatched.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Run the handler.
    ///
    /// # Errors
    ///
    /// Whatever the handler returns.
    pub fn call(&self, ctx: &ActionContext<'_>, params: &[String]) -> anyhow::Result<ActionOutput> {
        (self.handler)(ctx, params)
    }
}

/// A named group of actions.
#[derive(Debug, Clone)]
pub struct Controller {
    name: String,
    actions: Vec<Action>,
}

impl Controller {
    /// Empty controller named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Add a public action.
    #[must_use]
    pub fn action<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&ActionContext<'_>, &[String]) -> anyhow::Result<ActionOutput> + Send + Sync + 'static,
    {
        self.with_action(name, Visibility::Public, handler)
    }

    /// Add a private action (declared, never dispatchable).
    #[must_use]
    pub fn private_action<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&ActionContext<'_>, &[String]) -> anyhow::Result<ActionOutput> + Send + Sync + 'static,
    {
        self.with_action(name, Visibility::Private, handler)
    }

    /// Add an action with explicit visibility. A later action with the same
    /// (case-insensitive) name replaces an earlier one.
    #[must_use]
    pub fn with_action<F>(mut self, name: &str, visibility: Visibility, handler: F) -> Self
    where
        F: Fn(&ActionContext<'_>, &[String]) -> anyhow::Result<ActionOutput> + Send + Sync + 'static,
    {
        self.actions.retain(|a| !a.name.eq_ignore_ascii_case(name));
        self.actions.push(Action {
            name: name.to_string(),
            visibility,
            handler: Arc::new(handler),
        });
        self
    }

    /// Controller name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find an action by case-insensitive name, regardless of visibility.
    #[must_use]
    pub fn find_action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Declared actions.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// Controllers registered per module.
///
/// Keys are ASCII-lowercased module and controller names, so lookups are
/// case-insensitive.
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    controllers: RwLock<HashMap<(String, String), Arc<Controller>>>,
}

impl ControllerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `controller` for `module`, replacing any controller with the
    /// same name.
    pub fn register(&self, module: &str, controller: Controller) {
        let key = (module.to_ascii_lowercase(), controller.name.to_ascii_lowercase());
        let name = controller.name.clone();
        let actions = controller.actions.len();
        let Ok(mut controllers) = self.controllers.write() else {
            warn!(module = %module, controller = %name, "Controller registry poisoned; registration dropped");
            return;
        };
        if controllers.insert(key, Arc::new(controller)).is_some() {
            warn!(
                module = %module,
                controller = %name,
                "Replaced existing controller registration"
            );
        }
        info!(
            module = %module,
            controller = %name,
            actions,
            total_controllers = controllers.len(),
            "Controller registered successfully"
        );
    }

    /// Controller `controller` of `module`.
    #[must_use]
    pub fn get(&self, module: &str, controller: &str) -> Option<Arc<Controller>> {
        let key = (module.to_ascii_lowercase(), controller.to_ascii_lowercase());
        self.controllers.read().ok()?.get(&key).cloned()
    }

    /// Names of the controllers registered for `module`, sorted.
    #[must_use]
    pub fn controller_names(&self, module: &str) -> Vec<String> {
        let module = module.to_ascii_lowercase();
        let mut names: Vec<String> = self
            .controllers
            .read()
            .map(|c| {
                c.iter()
                    .filter(|((m, _), _)| *m == module)
                    .map(|(_, ctl)| ctl.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
