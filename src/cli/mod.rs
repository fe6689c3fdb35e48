//! # CLI Module
//!
//! Operator commands for the route table and module lifecycle.
//!
//! ## Commands
//!
//! ```bash
//! # Route table
//! modrouter routes list
//! modrouter routes add 'blog/(:num)' 'news/article/view/$1' --ajax 'news/article/preview/$1'
//! modrouter routes remove 'blog/(:num)'
//!
//! # Resolution without dispatch
//! modrouter forge admin/users/edit/7
//!
//! # Modules
//! modrouter modules list
//! modrouter modules status news
//! modrouter modules install news
//! modrouter modules uninstall news
//! ```
//!
//! Every command accepts `--config <FILE>` (or `MODR_CONFIG`).

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run, run_cli, Cli, Commands, ModuleCommands, RouteCommands};
