//! Integration tests for the build and serve commands against recording
//! backend stubs.

use forgepack_core::{
    CommandArgs, CompileStats, Compiler, DevServer, DevServerHook, Error, Result, RunningServer,
    Service, built_in_plugins,
    interfaces::{DevServerContext, ServeSettings},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingCompiler {
    configs: Mutex<Vec<Value>>,
    errors: Vec<String>,
}

impl Compiler for RecordingCompiler {
    fn run(&self, config: &Value) -> Result<CompileStats> {
        self.configs.lock().unwrap().push(config.clone());
        Ok(CompileStats {
            errors: self.errors.clone(),
            ..Default::default()
        })
    }
}

struct RecordingDevServer {
    settings: Mutex<Option<ServeSettings>>,
    configs: Mutex<Vec<Value>>,
    hooks_seen: Mutex<usize>,
}

impl Default for RecordingDevServer {
    fn default() -> Self {
        Self {
            settings: Mutex::new(None),
            configs: Mutex::new(Vec::new()),
            hooks_seen: Mutex::new(0),
        }
    }
}

struct StoppedServer;

impl RunningServer for StoppedServer {
    fn wait_for_first_build(&self) -> Result<CompileStats> {
        Ok(CompileStats::default())
    }

    fn close(&self) {}
}

impl DevServer for RecordingDevServer {
    fn serve(
        &self,
        config: &Value,
        settings: &ServeSettings,
        hooks: &[DevServerHook],
    ) -> Result<Arc<dyn RunningServer>> {
        self.configs.lock().unwrap().push(config.clone());
        *self.settings.lock().unwrap() = Some(settings.clone());
        *self.hooks_seen.lock().unwrap() = hooks.len();
        Ok(Arc::new(StoppedServer))
    }
}

fn build_service(dir: &TempDir, compiler: Arc<RecordingCompiler>) -> Service {
    Service::with_plugins(dir.path(), built_in_plugins())
        .unwrap()
        .with_compiler(compiler)
}

#[test]
fn test_build_runs_one_production_config() {
    let dir = TempDir::new().unwrap();
    let compiler = Arc::new(RecordingCompiler::default());
    let mut service = build_service(&dir, Arc::clone(&compiler));
    service
        .run(Some("build"), &CommandArgs::parse(["build"]))
        .unwrap();

    let configs = compiler.configs.lock().unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0]["mode"], json!("production"));
    assert_eq!(configs[0]["optimization"]["minimize"], json!(true));
    // the target marker does not leak past the command
    assert_eq!(service.env("FORGEPACK_BUILD_TARGET"), None);
}

#[test]
fn test_build_cleans_output_directory_first() {
    let dir = TempDir::new().unwrap();
    let stale = dir.path().join("dist").join("stale.js");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "old").unwrap();

    let compiler = Arc::new(RecordingCompiler::default());
    let mut service = build_service(&dir, Arc::clone(&compiler));
    service
        .run(Some("build"), &CommandArgs::parse(["build"]))
        .unwrap();
    assert!(!stale.exists());
}

#[test]
fn test_build_no_clean_keeps_output_directory() {
    let dir = TempDir::new().unwrap();
    let stale = dir.path().join("dist").join("stale.js");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "old").unwrap();

    let compiler = Arc::new(RecordingCompiler::default());
    let mut service = build_service(&dir, Arc::clone(&compiler));
    service
        .run(Some("build"), &CommandArgs::parse(["build", "--no-clean"]))
        .unwrap();
    assert!(stale.exists());
}

#[test]
fn test_build_dest_flag_moves_output() {
    let dir = TempDir::new().unwrap();
    let compiler = Arc::new(RecordingCompiler::default());
    let mut service = build_service(&dir, Arc::clone(&compiler));
    service
        .run(Some("build"), &CommandArgs::parse(["build", "--dest", "out"]))
        .unwrap();

    let configs = compiler.configs.lock().unwrap();
    let path = configs[0]["output"]["path"].as_str().unwrap();
    assert!(path.ends_with("out"));
}

#[test]
fn test_lib_build_emits_three_configs_without_html() {
    let dir = TempDir::new().unwrap();
    let compiler = Arc::new(RecordingCompiler::default());
    let mut service = build_service(&dir, Arc::clone(&compiler));
    service
        .run(
            Some("build"),
            &CommandArgs::parse(["build", "--target", "lib", "--name", "widget"]),
        )
        .unwrap();

    let configs = compiler.configs.lock().unwrap();
    assert_eq!(configs.len(), 3);
    assert_eq!(configs[0]["output"]["filename"], json!("widget.common.js"));
    assert_eq!(configs[2]["output"]["filename"], json!("widget.umd.min.js"));
    // the app layer (html, chunk splitting) is skipped for lib targets
    for config in configs.iter() {
        assert!(
            !config["plugins"]
                .as_array()
                .unwrap()
                .iter()
                .any(|p| p["name"] == json!("html"))
        );
    }
}

#[test]
fn test_build_fails_on_compiler_errors() {
    let dir = TempDir::new().unwrap();
    let compiler = Arc::new(RecordingCompiler {
        configs: Mutex::new(Vec::new()),
        errors: vec!["module not found".to_string()],
    });
    let mut service = build_service(&dir, Arc::clone(&compiler));
    let err = service
        .run(Some("build"), &CommandArgs::parse(["build"]))
        .unwrap_err();
    assert!(matches!(err, Error::Build(_)));
}

fn middleware_plugin(
    api: &mut forgepack_core::PluginApi<'_>,
    _options: &forgepack_core::ProjectOptions,
) -> Result<()> {
    api.on_dev_server(Arc::new(|ctx: &mut dyn DevServerContext| {
        ctx.mount("/__status", "status endpoint");
        Ok(())
    }));
    Ok(())
}

#[test]
fn test_serve_passes_settings_and_dev_config() {
    let dir = TempDir::new().unwrap();
    let dev_server = Arc::new(RecordingDevServer::default());
    let mut plugins = built_in_plugins();
    plugins.push(forgepack_core::PluginDescriptor {
        id: "test:middleware",
        apply: middleware_plugin,
        default_modes: &[],
    });
    let mut service = Service::with_plugins(dir.path(), plugins)
        .unwrap()
        .with_dev_server(Arc::clone(&dev_server) as Arc<dyn DevServer>);
    service
        .run(
            Some("serve"),
            &CommandArgs::parse(["serve", "--host", "127.0.0.1"]),
        )
        .unwrap();

    let settings = dev_server.settings.lock().unwrap();
    let settings = settings.as_ref().unwrap();
    assert_eq!(settings.host, "127.0.0.1");
    assert!(settings.port >= 8080);

    let configs = dev_server.configs.lock().unwrap();
    assert_eq!(configs[0]["mode"], json!("development"));
    assert_eq!(configs[0]["devtool"], json!("cheap-module-eval-source-map"));
    assert!(
        configs[0]["plugins"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["name"] == json!("hmr"))
    );
    // plugin-registered dev-server hooks reach the backend
    assert_eq!(*dev_server.hooks_seen.lock().unwrap(), 1);
}

#[test]
fn test_serve_entry_positional_overrides_app_entry() {
    let dir = TempDir::new().unwrap();
    let dev_server = Arc::new(RecordingDevServer::default());
    let mut service = Service::with_plugins(dir.path(), built_in_plugins())
        .unwrap()
        .with_dev_server(Arc::clone(&dev_server) as Arc<dyn DevServer>);
    service
        .run(
            Some("serve"),
            &CommandArgs::parse(["serve", "--host", "127.0.0.1", "src/other.js"]),
        )
        .unwrap();

    let configs = dev_server.configs.lock().unwrap();
    let entry = configs[0]["entry"]["app"][0].as_str().unwrap();
    assert!(entry.ends_with("src/other.js"));
    assert!(std::path::Path::new(entry).is_absolute());
}
