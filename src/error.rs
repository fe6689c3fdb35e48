//! Error taxonomy for routing, module resolution and dispatch.
//!
//! The router recovers `ModuleNotFound`, `ControllerNotFound` and
//! `MethodNotFound` locally (they turn into `error/404`). The remaining
//! variants are fatal to the operation that raised them and propagate to the
//! caller.

use std::fmt;
use std::path::PathBuf;

/// Errors raised by the routing core.
#[derive(Debug)]
pub enum RouterError {
    /// The module directory or its manifest does not exist (or is unreadable).
    ModuleNotFound {
        /// Requested module name
        name: String,
        /// Why the module could not be constructed
        reason: String,
    },
    /// No controller with this name is registered for the module.
    ControllerNotFound {
        /// Owning module
        module: String,
        /// Requested controller
        controller: String,
    },
    /// The controller has no such action, or the action is not public.
    MethodNotFound {
        /// Controller that was searched
        controller: String,
        /// Requested action
        action: String,
        /// `true` when the action exists but is registered as private
        not_public: bool,
    },
    /// An action handler returned an error.
    Action {
        /// Owning module
        module: String,
        /// Controller name
        controller: String,
        /// Action name
        action: String,
        /// Error returned by the handler
        source: anyhow::Error,
    },
    /// An install/uninstall hook failed or returned a falsy result.
    Lifecycle {
        /// Module being installed or uninstalled
        module: String,
        /// `"install"` or `"uninstall"`
        operation: &'static str,
        /// Underlying failure
        source: anyhow::Error,
    },
    /// A route pattern expanded to an invalid regular expression.
    InvalidPattern {
        /// Source pattern as written in the route file
        pattern: String,
        /// Regex compiler error
        source: regex::Error,
    },
    /// A route file could not be read, parsed or written.
    RouteFile {
        /// File involved
        path: PathBuf,
        /// Underlying failure
        source: anyhow::Error,
    },
    /// The module store (installed-state oracle) failed.
    Store {
        /// Module the query was about
        module: String,
        /// Underlying failure
        source: anyhow::Error,
    },
}

impl RouterError {
    /// `true` for the errors the router turns into `error/404`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RouterError::ModuleNotFound { .. }
                | RouterError::ControllerNotFound { .. }
                | RouterError::MethodNotFound { .. }
        )
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::ModuleNotFound { name, reason } => {
                write!(f, "module '{name}' not found: {reason}")
            }
            RouterError::ControllerNotFound { module, controller } => {
                write!(
                    f,
                    "module '{module}' has no controller named '{controller}'"
                )
            }
            RouterError::MethodNotFound {
                controller,
                action,
                not_public: true,
            } => write!(
                f,
                "method '{action}' of controller '{controller}' is not public and cannot be called via URL"
            ),
            RouterError::MethodNotFound {
                controller, action, ..
            } => write!(
                f,
                "controller '{controller}' does not contain the method '{action}'"
            ),
            RouterError::Action {
                module,
                controller,
                action,
                source,
            } => write!(f, "action {module}/{controller}/{action} failed: {source}"),
            RouterError::Lifecycle {
                module,
                operation,
                source,
            } => write!(
                f,
                "exception thrown during {operation} of module '{module}': {source}"
            ),
            RouterError::InvalidPattern { pattern, source } => {
                write!(f, "route pattern '{pattern}' is not a valid expression: {source}")
            }
            RouterError::RouteFile { path, source } => {
                write!(f, "route file '{}': {source:#}", path.display())
            }
            RouterError::Store { module, source } => {
                write!(f, "module store query for '{module}' failed: {source:#}")
            }
        }
    }
}

impl std::error::Error for RouterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouterError::InvalidPattern { source, .. } => Some(source),
            RouterError::Action { source, .. }
            | RouterError::Lifecycle { source, .. }
            | RouterError::RouteFile { source, .. }
            | RouterError::Store { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let missing = RouterError::ControllerNotFound {
            module: "news".into(),
            controller: "Feed".into(),
        };
        assert!(missing.is_not_found());

        let lifecycle = RouterError::Lifecycle {
            module: "news".into(),
            operation: "install",
            source: anyhow::anyhow!("boom"),
        };
        assert!(!lifecycle.is_not_found());
    }

    #[test]
    fn test_method_not_found_messages() {
        let private = RouterError::MethodNotFound {
            controller: "Users".into(),
            action: "_secret".into(),
            not_public: true,
        };
        assert!(private.to_string().contains("not public"));

        let absent = RouterError::MethodNotFound {
            controller: "Users".into(),
            action: "edit".into(),
            not_public: false,
        };
        assert!(absent.to_string().contains("does not contain"));
    }
}
