//! # Router Module
//!
//! The router turns a request path into a module invocation.
//!
//! ## Resolution
//!
//! For a path such as `admin/users/edit/7` the router:
//!
//! 1. Normalizes it (lowercase, no empty segments); an empty path becomes the
//!    configured default module
//! 2. Refuses paths whose third segment starts with `_`
//! 3. Tries the global route table (`routes_file`)
//! 4. Otherwise loads the module named by the first segment and tries its
//!    `config/routes.json`
//! 5. Serves the fixed `error/404`, `error/403` and `error/offline` pages
//! 6. Falls back to positional parsing:
//!    `module=admin, controller=Users, action=edit, params=["7"]`
//!
//! Only installed modules are dispatched.
//!
//! ## Example
//!
//! ```rust,ignore
//! use modrouter::context::AppContext;
//! use modrouter::request::RequestInfo;
//!
//! let ctx = AppContext::new(config);
//! let outcome = ctx.router().execute(&RequestInfo::internal(), "news/article/42", None)?;
//! println!("status {}", outcome.status());
//! ```

mod core;

pub use core::{
    normalize, Dispatch, DispatchId, DispatchOutcome, FallbackReason, Forged, Resolution, Router,
};
