//! # modrouter
//!
//! **modrouter** is the request-dispatch core of a modular CMS: it turns a request path into an
//! invocation of a module's controller action, honouring pattern routes, per-module route tables
//! and install state.
//!
//! ## Overview
//!
//! A site is a set of **modules**, each a directory with a `module.toml` manifest. Modules declare
//! their controllers in code and register them with a
//! [`ControllerRegistry`](dispatcher::ControllerRegistry). Requests are routed by path:
//!
//! - a **global route table** rewrites paths with token patterns (`blog/(:num)` →
//!   `news/article/view/$1`), optionally with a separate AJAX target
//! - otherwise the first path segment names the module, whose own route table may rewrite the path
//! - otherwise the path is read positionally: `module/controller/action/params...`
//!
//! Only installed modules are dispatched. Unroutable paths end at `error/404`, admin-controller
//! access outside the admin module at `error/403`, and maintenance mode at `error/offline`.
//!
//! ## Architecture
//!
//! - **[`route`]** - Pattern matcher (`Route`) and ordered route table (`RouteCollection`)
//! - **[`module`]** - Module descriptors, memoized registry, install/uninstall lifecycle
//! - **[`dispatcher`]** - Explicit controller/action registry with declared visibility
//! - **[`router`]** - Path resolution, dispatch and error-route fallback
//! - **[`store`]** - Installed-module records (`ModuleStore` trait, JSON and in-memory stores)
//! - **[`events`]** - Named event hooks (`module.installed`, `module.uninstalled`)
//! - **[`context`]** - `AppContext`, the explicit owner of all process-wide state
//! - **[`config`]** - YAML configuration with `MODR_*` environment overrides
//! - **[`otel`]** - Structured logging initialization
//! - **[`cli`]** - Operator commands
//!
//! ### Dispatch Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Router
//!     participant Routes as Global RouteCollection
//!     participant Registry as ModuleRegistry
//!     participant Module
//!     participant Controllers as ControllerRegistry
//!
//!     Caller->>Router: execute(request, "blog/42", None)
//!     Router->>Router: normalize, default module, private-action guard
//!     Router->>Routes: lookup("blog/42")
//!     Routes-->>Router: ResolvedRoute(news, Article, view, ["42"])
//!     Router->>Registry: get("news")
//!     Registry-->>Router: Arc<Module>
//!     Router->>Module: is_installed()
//!     Router->>Router: admin-controller guard
//!     Router->>Module: invoke("Article", "view", ["42"])
//!     Module->>Controllers: get("news", "Article")
//!     Module-->>Router: ActionOutput
//!     Router-->>Caller: DispatchOutcome::Invoked
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modrouter::config::AppConfig;
//! use modrouter::context::AppContext;
//! use modrouter::dispatcher::{ActionOutput, Controller};
//! use modrouter::request::RequestInfo;
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = AppContext::new(AppConfig::from_file_and_env(None)?);
//! ctx.controllers().register(
//!     "news",
//!     Controller::new("Article").action("view", |_, params| {
//!         Ok(ActionOutput::json(json!({ "article": params.first() })))
//!     }),
//! );
//! ctx.module("news")?.install()?;
//!
//! let outcome = ctx
//!     .router()
//!     .execute(&RequestInfo::internal(), "news/article/view/42", None)?;
//! println!("{}", outcome.status());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod module;
pub mod otel;
mod persist;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod store;

pub use config::AppConfig;
pub use context::AppContext;
pub use error::RouterError;
pub use router::{DispatchOutcome, Router};
