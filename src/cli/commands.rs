use crate::config::AppConfig;
use crate::context::AppContext;
use crate::otel::{init_logging_with_config, LogConfig};
use crate::request::RequestInfo;
use crate::route::{Replacement, Route, RouteCollection};
use anyhow::bail;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

/// Operator CLI for the module router
#[derive(Parser, Debug)]
#[command(name = "modrouter")]
#[command(about = "Module router operator CLI", long_about = None)]
pub struct Cli {
    /// Configuration file (YAML); defaults apply when omitted
    #[arg(short, long, global = true, env = "MODR_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect or edit the global route table
    Routes {
        #[command(subcommand)]
        command: RouteCommands,
    },
    /// Show how a path resolves, without dispatching it
    Forge {
        /// Request path, e.g. `admin/users/edit/7`
        path: String,

        /// Resolve as an AJAX request
        #[arg(long, default_value_t = false)]
        ajax: bool,
    },
    /// Inspect modules and run their install/uninstall lifecycle
    Modules {
        #[command(subcommand)]
        command: ModuleCommands,
    },
}

/// `routes` subcommands
#[derive(Subcommand, Debug)]
pub enum RouteCommands {
    /// Print every route in match order
    List,
    /// Add (or replace) a route and persist the table
    Add {
        /// Pattern, e.g. `blog/(:num)`
        pattern: String,

        /// Rewrite target, e.g. `news/article/view/$1`
        target: String,

        /// Rewrite target for AJAX requests
        #[arg(long)]
        ajax: Option<String>,
    },
    /// Remove a route by its pattern and persist the table
    Remove {
        /// Pattern exactly as listed
        pattern: String,
    },
}

/// `modules` subcommands
#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    /// List module directories and their install state
    List,
    /// Show one module's manifest and install state
    Status { name: String },
    /// Install a module
    Install { name: String },
    /// Uninstall a module
    Uninstall { name: String },
}

/// Parse arguments, initialize logging and run the command.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or the command fails.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Err(e) = init_logging_with_config(&LogConfig::from_env()) {
        eprintln!("Warning: {e:#}");
    }
    run(cli, &mut io::stdout().lock())
}

/// Run a parsed command, writing its report to `out`.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or the command fails.
pub fn run(cli: Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let config = AppConfig::from_file_and_env(cli.config.as_deref())?;
    let ctx = AppContext::new(config);

    match cli.command {
        Commands::Routes { command } => run_routes(&ctx, command, out),
        Commands::Forge { path, ajax } => {
            match ctx
                .router()
                .forge(&RequestInfo::internal(), &path, Some(ajax))?
            {
                Some(forged) => writeln!(
                    out,
                    "module={} controller={} action={} params={:?}",
                    forged.module.name(),
                    forged.controller,
                    forged.action,
                    forged.params.as_slice()
                )?,
                None => writeln!(out, "{path}: not routable (error/404)")?,
            }
            Ok(())
        }
        Commands::Modules { command } => run_modules(&ctx, command, out),
    }
}

fn run_routes(ctx: &AppContext, command: RouteCommands, out: &mut dyn Write) -> anyhow::Result<()> {
    let router = ctx.router();
    match command {
        RouteCommands::List => {
            let routes = router.fetch_routes()?;
            for route in routes.iter() {
                writeln!(out, "{}\t{}", route.source(), describe_target(route))?;
            }
        }
        RouteCommands::Add {
            pattern,
            target,
            ajax,
        } => {
            let replacement = match ajax {
                Some(ajax) => Replacement::with_ajax(target, ajax),
                None => Replacement::new(target),
            };
            let mut routes = RouteCollection::new();
            routes.add_pattern(&pattern, Some(replacement))?;
            router.add_routes(routes)?;
            writeln!(out, "added {pattern}")?;
        }
        RouteCommands::Remove { pattern } => {
            if !router.remove_route(&pattern)? {
                bail!("no route with pattern '{pattern}'");
            }
            writeln!(out, "removed {pattern}")?;
        }
    }
    Ok(())
}

fn run_modules(ctx: &AppContext, command: ModuleCommands, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        ModuleCommands::List => {
            for name in ctx.modules().discovered() {
                let status = match ctx.module(name) {
                    Ok(module) => {
                        let state = if module.is_installed()? { "installed" } else { "available" };
                        format!("{state}\t{}", module.manifest().version())
                    }
                    Err(_) => "invalid\t-".to_string(),
                };
                writeln!(out, "{name}\t{status}")?;
            }
        }
        ModuleCommands::Status { name } => {
            let module = ctx.module(&name)?;
            writeln!(
                out,
                "{name} version={} installed={} has_admin={}",
                module.manifest().version(),
                module.is_installed()?,
                module.has_admin()
            )?;
        }
        ModuleCommands::Install { name } => {
            ctx.module(&name)?.install()?;
            writeln!(out, "installed {name}")?;
        }
        ModuleCommands::Uninstall { name } => {
            ctx.module(&name)?.uninstall()?;
            writeln!(out, "uninstalled {name}")?;
        }
    }
    Ok(())
}

fn describe_target(route: &Route) -> String {
    match route.replacement() {
        None => "-".to_string(),
        Some(Replacement { normal, ajax: None }) => normal.clone(),
        Some(Replacement {
            normal,
            ajax: Some(ajax),
        }) => format!("{normal} (ajax: {ajax})"),
    }
}
