#![allow(dead_code)]

pub mod logging {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Install a test-writer subscriber once per test binary.
    /// Set `RUST_LOG=modrouter=debug` to see dispatch logs.
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });
    }
}

pub mod site {
    use modrouter::config::AppConfig;
    use modrouter::context::AppContext;
    use modrouter::dispatcher::{ActionContext, ActionOutput, Controller};
    use modrouter::store::{InMemoryModuleStore, ModuleRecord, ModuleStore};
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    pub type Calls = Arc<Mutex<Vec<String>>>;

    /// A temporary site:
    ///
    /// | module | manifest | installed | notes |
    /// |--------|----------|-----------|-------|
    /// | admin  | yes (`hasAdmin = true`) | yes | `Users`, `Admin` controllers |
    /// | news   | yes | yes | module route `latest` |
    /// | blog   | yes | yes | malformed `config/routes.json` |
    /// | error  | yes | yes | no controllers |
    /// | forum  | yes | no  | |
    /// | drafts | no  | no  | directory only |
    pub struct TestSite {
        pub dir: TempDir,
        pub ctx: AppContext,
        pub store: Arc<InMemoryModuleStore>,
        pub calls: Calls,
    }

    impl TestSite {
        pub fn new() -> Self {
            Self::with_config(|_| {})
        }

        pub fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
            super::logging::init();
            let dir = tempfile::tempdir().unwrap();
            let mut config = AppConfig::rooted_at(dir.path());
            tweak(&mut config);
            let root = config.modules_root.clone();

            write_module(&root, "admin", "[info]\nversion = \"2.0\"\n[config]\nhasAdmin = true\n");
            write_module(&root, "news", "[info]\nversion = \"1.3\"\n");
            write_module(&root, "blog", "[info]\nversion = \"0.9\"\n");
            write_module(&root, "error", "[info]\nversion = \"1.0\"\n");
            write_module(&root, "forum", "[info]\nversion = \"0.1\"\n");
            std::fs::create_dir_all(root.join("drafts")).unwrap();

            write_module_routes(&root, "news", r#"{ "news/latest": "news/article/view/latest" }"#);
            write_module_routes(&root, "blog", "[1, 2, 3]");

            let store = Arc::new(InMemoryModuleStore::with_records(
                ["admin", "news", "blog", "error"].map(|name| ModuleRecord {
                    name: name.to_string(),
                    version: "1.0".to_string(),
                }),
            ));
            let ctx = AppContext::with_store(config, Arc::clone(&store) as Arc<dyn ModuleStore>);
            let calls: Calls = Arc::new(Mutex::new(Vec::new()));

            let controllers = ctx.controllers();
            controllers.register(
                "admin",
                Controller::new("Users")
                    .action("index", record(&calls))
                    .action("edit", record(&calls))
                    .private_action("purge", record(&calls)),
            );
            controllers.register("admin", Controller::new("Admin").action("index", record(&calls)));
            controllers.register(
                "news",
                Controller::new("News").action("index", record(&calls)),
            );
            controllers.register(
                "news",
                Controller::new("Article")
                    .action("view", record(&calls))
                    .action("preview", record(&calls)),
            );
            controllers.register("news", Controller::new("Admin").action("index", record(&calls)));
            controllers.register("blog", Controller::new("Blog").action("index", record(&calls)));

            Self {
                dir,
                ctx,
                store,
                calls,
            }
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        pub fn modules_root(&self) -> PathBuf {
            self.ctx.config().modules_root.clone()
        }

        /// Recorded invocations, `module/Controller/action[params]`.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    pub fn write_module(root: &Path, name: &str, manifest: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("module.toml"), manifest).unwrap();
    }

    pub fn write_module_routes(root: &Path, name: &str, routes: &str) {
        let dir = root.join(name).join("config");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("routes.json"), routes).unwrap();
    }

    /// Action that records `module/Controller/action[params]` and returns it.
    pub fn record(
        calls: &Calls,
    ) -> impl Fn(&ActionContext<'_>, &[String]) -> anyhow::Result<ActionOutput> + Send + Sync + 'static
    {
        let calls = Arc::clone(calls);
        move |ctx: &ActionContext<'_>, params: &[String]| {
            let entry = format!(
                "{}/{}/{}{:?}",
                ctx.module.name(),
                ctx.controller,
                ctx.action,
                params
            );
            calls.lock().unwrap().push(entry.clone());
            Ok(ActionOutput::json(json!(entry)))
        }
    }
}
