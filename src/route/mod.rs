//! # Route Module
//!
//! Pattern routes and ordered route tables.
//!
//! A route maps a pattern over the normalized request path to a target path
//! (`module/Controller/action/params...`). Patterns are regular expressions
//! with five shorthand tokens:
//!
//! | Token | Expansion |
//! |-------|-----------|
//! | `:any` | `.*` |
//! | `:alnum` | `[[:alnum:]]+` |
//! | `:num` | `[[:digit:]]+` |
//! | `:alpha` | `[[:alpha:]]+` |
//! | `:segment` | `[^/]*` |
//!
//! ## Example
//!
//! ```rust
//! use modrouter::route::{Replacement, RouteCollection};
//!
//! let mut routes = RouteCollection::new();
//! routes
//!     .add_pattern("blog/(:num)", Some(Replacement::new("news/article/view/$1")))
//!     .unwrap();
//!
//! let data = routes.lookup("blog/42").unwrap();
//! assert_eq!(data.module, "news");
//! assert_eq!(data.controller, "Article");
//! assert_eq!(data.action, "view");
//! assert_eq!(data.params.as_slice(), ["42".to_string()]);
//! ```

mod collection;
mod core;

pub use collection::{RouteCollection, RouteFile, RouteValue};
pub use core::{
    capitalize, expand_tokens, ParamVec, Replacement, ResolvedRoute, Route, RouteTarget,
    DEFAULT_ACTION, MAX_INLINE_PARAMS,
};
