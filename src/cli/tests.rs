//! Unit tests for CLI commands

use crate::cli::{run, Cli, Commands, ModuleCommands, RouteCommands};
use clap::Parser;
use std::path::{Path, PathBuf};

fn workspace() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("modrouter.yaml");
    std::fs::write(&config, "default_module: news\n").unwrap();
    let news = dir.path().join("modules").join("news");
    std::fs::create_dir_all(&news).unwrap();
    std::fs::write(news.join("module.toml"), "[info]\nversion = \"3.1\"\n").unwrap();
    std::fs::create_dir_all(dir.path().join("modules").join("broken")).unwrap();
    (dir, config)
}

fn exec(config: &Path, args: &[&str]) -> anyhow::Result<String> {
    let mut argv = vec!["modrouter", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    let mut out = Vec::new();
    run(cli, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_all_commands_parse() {
    let commands = vec![
        vec!["modrouter", "routes", "list"],
        vec!["modrouter", "routes", "add", "blog/(:num)", "news/article/$1"],
        vec!["modrouter", "routes", "remove", "blog/(:num)"],
        vec!["modrouter", "forge", "admin/users"],
        vec!["modrouter", "modules", "list"],
        vec!["modrouter", "modules", "status", "news"],
        vec!["modrouter", "modules", "install", "news"],
        vec!["modrouter", "modules", "uninstall", "news"],
    ];

    for args in commands {
        let cli = Cli::try_parse_from(&args);
        assert!(cli.is_ok(), "Failed to parse command: {:?}", args);
    }
}

#[test]
fn test_routes_add_with_ajax_flag() {
    let cli = Cli::try_parse_from([
        "modrouter",
        "routes",
        "add",
        "blog/(:num)",
        "news/article/view/$1",
        "--ajax",
        "news/article/preview/$1",
        "--config",
        "site.yaml",
    ])
    .unwrap();

    assert_eq!(cli.config.as_deref(), Some(Path::new("site.yaml")));
    match cli.command {
        Commands::Routes {
            command: RouteCommands::Add { pattern, ajax, .. },
        } => {
            assert_eq!(pattern, "blog/(:num)");
            assert_eq!(ajax.as_deref(), Some("news/article/preview/$1"));
        }
        other => panic!("Expected routes add, got {other:?}"),
    }
}

#[test]
fn test_modules_install_requires_name() {
    assert!(Cli::try_parse_from(["modrouter", "modules", "install"]).is_err());
    let cli = Cli::try_parse_from(["modrouter", "modules", "install", "news"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Modules {
            command: ModuleCommands::Install { ref name }
        } if name == "news"
    ));
}

#[test]
fn test_route_commands_persist() {
    let (dir, config) = workspace();

    let added = exec(&config, &["routes", "add", "blog/(:num)", "news/article/view/$1"]).unwrap();
    assert_eq!(added.trim(), "added blog/(:num)");
    assert!(dir.path().join("config").join("routes.json").exists());

    let listed = exec(&config, &["routes", "list"]).unwrap();
    assert_eq!(listed.trim(), "blog/(:num)\tnews/article/view/$1");

    exec(&config, &["routes", "remove", "blog/(:num)"]).unwrap();
    assert!(exec(&config, &["routes", "list"]).unwrap().is_empty());
    assert!(exec(&config, &["routes", "remove", "blog/(:num)"]).is_err());
}

#[test]
fn test_module_lifecycle_commands() {
    let (_dir, config) = workspace();

    let before = exec(&config, &["modules", "list"]).unwrap();
    assert_eq!(before, "broken\tinvalid\t-\nnews\tavailable\t3.1\n");

    exec(&config, &["modules", "install", "news"]).unwrap();
    let status = exec(&config, &["modules", "status", "news"]).unwrap();
    assert_eq!(status.trim(), "news version=3.1 installed=true has_admin=false");

    let forged = exec(&config, &["forge", "news/article/view/9"]).unwrap();
    assert_eq!(
        forged.trim(),
        "module=news controller=Article action=view params=[\"9\"]"
    );

    exec(&config, &["modules", "uninstall", "news"]).unwrap();
    let forged = exec(&config, &["forge", "news"]).unwrap();
    assert_eq!(forged.trim(), "news: not routable (error/404)");

    assert!(exec(&config, &["modules", "status", "broken"]).is_err());
}
