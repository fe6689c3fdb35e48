//! # Dispatcher Module
//!
//! Explicit action registry used for module dispatch.
//!
//! ## Overview
//!
//! Every module's controllers are declared up front and registered with a
//! [`ControllerRegistry`]. Dispatch then becomes a table lookup:
//!
//! 1. Router resolves a path to `(module, controller, action, params)`
//! 2. [`crate::module::Module::invoke`] looks up the controller for the module
//! 3. The action is found by case-insensitive name
//! 4. Private actions are refused; public ones are called with the params
//!
//! ## Handler Registration
//!
//! ```rust
//! use modrouter::dispatcher::{ActionOutput, Controller, ControllerRegistry};
//! use serde_json::json;
//!
//! let registry = ControllerRegistry::new();
//! registry.register(
//!     "admin",
//!     Controller::new("Users")
//!         .action("edit", |ctx, params| {
//!             Ok(ActionOutput::json(json!({
//!                 "module": ctx.module.name(),
//!                 "id": params.first(),
//!             })))
//!         })
//!         .private_action("_audit", |_, _| Ok(ActionOutput::empty())),
//! );
//! assert!(registry.get("admin", "users").is_some());
//! ```

mod core;

pub use core::{
    Action, ActionContext, ActionHandler, ActionOutput, Controller, ControllerRegistry, Visibility,
};
