//! The orchestrator: owns plugins, env, options and registrations, and
//! drives init, dispatch and composition.

use crate::chain::ChainedConfig;
use crate::command::{Command, CommandArgs};
use crate::env::load_env;
use crate::error::{Error, Result};
use crate::interfaces::{Compiler, DevServer, DevServerHook, NoopCompiler, NoopDevServer};
use crate::merge::{clone_rule_names, merge};
use crate::options::ProjectOptions;
use crate::plugin::{PluginApi, PluginDescriptor, built_in_plugins, validate_registry};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A queued chained mutation.
pub type ChainFn = Arc<dyn Fn(&mut ChainedConfig) -> Result<()> + Send + Sync>;

/// A queued raw mutation: either a function that edits the composed config
/// in place (optionally returning a partial to merge), or a literal partial.
#[derive(Clone)]
pub enum RawConfig {
    Func(Arc<dyn Fn(&mut Value) -> Result<Option<Value>> + Send + Sync>),
    Literal(Value),
}

/// Everything plugins registered during the apply phase.
#[derive(Default)]
pub struct Registrations {
    pub commands: IndexMap<String, Command>,
    pub chain_fns: Vec<ChainFn>,
    pub raw_fns: Vec<RawConfig>,
    pub dev_server_fns: Vec<DevServerHook>,
}

pub struct Service {
    context: PathBuf,
    initialized: bool,
    mode: Option<String>,
    env: BTreeMap<String, String>,
    plugins: Vec<PluginDescriptor>,
    modes: IndexMap<String, String>,
    project_options: ProjectOptions,
    registrations: Registrations,
    compiler: Arc<dyn Compiler>,
    dev_server: Arc<dyn DevServer>,
}

impl Service {
    /// Create a service over the built-in registry, with the environment
    /// seeded from the current process.
    pub fn new(context: impl Into<PathBuf>) -> Result<Self> {
        let mut service = Self::with_plugins(context, built_in_plugins())?;
        service.env = std::env::vars().collect();
        Ok(service)
    }

    /// Create a service over an explicit registry with an empty environment
    /// seed. Embedders provide env via [`Service::set_env`].
    pub fn with_plugins(
        context: impl Into<PathBuf>,
        plugins: Vec<PluginDescriptor>,
    ) -> Result<Self> {
        validate_registry(&plugins)?;

        let mut modes = IndexMap::new();
        for plugin in &plugins {
            for (command, mode) in plugin.default_modes {
                modes.insert((*command).to_string(), (*mode).to_string());
            }
        }

        Ok(Self {
            context: context.into(),
            initialized: false,
            mode: None,
            env: BTreeMap::new(),
            plugins,
            modes,
            project_options: ProjectOptions::default(),
            registrations: Registrations::default(),
            compiler: Arc::new(NoopCompiler),
            dev_server: Arc::new(NoopDevServer),
        })
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_dev_server(mut self, dev_server: Arc<dyn DevServer>) -> Self {
        self.dev_server = dev_server;
        self
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    /// The mode resolved at init, if the service has initialized.
    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }

    /// Default mode for a command, per the plugin registry.
    pub fn mode_for(&self, command: &str) -> Option<&str> {
        self.modes.get(command).map(String::as_str)
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn env_all(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn set_env(&mut self, key: &str, value: &str) {
        self.env.insert(key.to_string(), value.to_string());
    }

    pub fn remove_env(&mut self, key: &str) {
        self.env.remove(key);
    }

    pub fn options(&self) -> &ProjectOptions {
        &self.project_options
    }

    pub fn options_mut(&mut self) -> &mut ProjectOptions {
        &mut self.project_options
    }

    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.context.join(rel)
    }

    pub fn commands(&self) -> &IndexMap<String, Command> {
        &self.registrations.commands
    }

    pub fn compiler(&self) -> Arc<dyn Compiler> {
        Arc::clone(&self.compiler)
    }

    pub fn dev_server(&self) -> Arc<dyn DevServer> {
        Arc::clone(&self.dev_server)
    }

    pub fn dev_server_hooks(&self) -> Vec<DevServerHook> {
        self.registrations.dev_server_fns.clone()
    }

    /// Queue a chained mutation from outside the plugin system.
    pub fn chain_config<F>(&mut self, f: F)
    where
        F: Fn(&mut ChainedConfig) -> Result<()> + Send + Sync + 'static,
    {
        self.registrations.chain_fns.push(Arc::new(f) as ChainFn);
    }

    /// Queue a raw literal partial from outside the plugin system.
    pub fn configure(&mut self, partial: Value) {
        self.registrations.raw_fns.push(RawConfig::Literal(partial));
    }

    /// Initialize once: load env files, load project options, apply every
    /// plugin in registry order. Later calls are no-ops, whatever the mode.
    pub fn init(&mut self, mode: Option<&str>) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        self.mode = mode.map(String::from);

        load_env(&self.context, mode, &mut self.env);
        self.project_options = ProjectOptions::load(&self.context)?;
        debug!(
            mode = mode.unwrap_or("<none>"),
            context = %self.context.display(),
            "service initialized"
        );

        let plugin_ids: Vec<String> = self.plugins.iter().map(|p| p.id.to_string()).collect();
        for plugin in &self.plugins {
            let mut api = PluginApi::new(
                plugin.id,
                &self.context,
                &plugin_ids,
                &self.env,
                &mut self.registrations,
            );
            (plugin.apply)(&mut api, &self.project_options)?;
        }

        // the file-based raw mutation merges after every plugin's
        if let Some(partial) = self.project_options.configure.clone() {
            self.registrations.raw_fns.push(RawConfig::Literal(partial));
        }
        Ok(())
    }

    /// Resolve the mode for a command invocation and dispatch it.
    ///
    /// `--mode` beats the registry default. A missing command falls back to
    /// the help command with the arguments untouched, as does `--help` on a
    /// registered command; a named command gets its own name stripped from
    /// the arguments first. A name no plugin registered is an error even
    /// when `--help` is present.
    pub fn run(&mut self, name: Option<&str>, args: &CommandArgs) -> Result<()> {
        let mode = args
            .str_flag("mode")
            .map(String::from)
            .or_else(|| name.and_then(|n| self.modes.get(n).cloned()));
        self.init(mode.as_deref())?;

        if let Some(name) = name {
            if !self.registrations.commands.contains_key(name) {
                return Err(Error::CommandNotFound(name.to_string()));
            }
        }
        let (name, args) = match name {
            Some(name) if !args.wants_help() => (name, args.without_command_name()),
            _ => ("help", args.clone()),
        };

        let handler = match self.registrations.commands.get(name) {
            Some(command) => Arc::clone(&command.handler),
            None => return Err(Error::CommandNotFound(name.to_string())),
        };
        handler(self, &args)
    }

    /// Apply every chained mutation in order over a fresh builder tree
    /// seeded with the current env and options.
    pub fn resolve_chainable_config(&self) -> Result<ChainedConfig> {
        let mut chained =
            ChainedConfig::with_snapshot(self.env.clone(), self.project_options.clone());
        for f in &self.registrations.chain_fns {
            f(&mut chained)?;
        }
        Ok(chained)
    }

    /// Compose the final bundler configuration: flatten the chained tree,
    /// then layer every raw mutation on top, repairing rule-name metadata
    /// and exporting the entry-file list afterwards.
    pub fn resolve_bundler_config(&mut self) -> Result<Value> {
        let chained = self.resolve_chainable_config()?;
        let mut config = chained.to_config();
        let before_raw = config.clone();

        let mut merged_any = false;
        for raw in &self.registrations.raw_fns {
            match raw {
                RawConfig::Func(f) => {
                    if let Some(partial) = f(&mut config)? {
                        if !partial.is_object() {
                            return Err(Error::Composition(
                                "configure function must return an object".to_string(),
                            ));
                        }
                        config = merge(config, partial);
                        merged_any = true;
                    }
                }
                RawConfig::Literal(partial) => {
                    if !partial.is_object() {
                        return Err(Error::Composition(
                            "configure value must be an object".to_string(),
                        ));
                    }
                    config = merge(config, partial.clone());
                    merged_any = true;
                }
            }
        }

        // a structural merge replaces rule arrays wholesale, losing the
        // out-of-band name metadata
        if merged_any {
            clone_rule_names(
                config.pointer_mut("/module/rules"),
                before_raw.pointer("/module/rules"),
            );
        }

        self.check_public_path(&config)?;
        self.export_entry_files(&config)?;
        Ok(config)
    }

    /// For non-app build targets the deployment base is fixed; mutating
    /// `output.publicPath` directly would silently break it.
    fn check_public_path(&self, config: &Value) -> Result<()> {
        let target = self.env("FORGEPACK_BUILD_TARGET");
        if !matches!(target, Some(t) if t != "app") {
            return Ok(());
        }
        if let Some(public_path) = config.pointer("/output/publicPath").and_then(Value::as_str) {
            if public_path != self.project_options.public_path {
                return Err(Error::Composition(
                    "Do not modify output.publicPath directly. \
                     Use the \"publicPath\" option instead."
                        .to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Publish the absolute entry file list for downstream tooling.
    fn export_entry_files(&mut self, config: &Value) -> Result<()> {
        let mut files = Vec::new();
        match config.get("entry") {
            Some(Value::String(file)) => files.push(file.clone()),
            Some(Value::Array(items)) => {
                files.extend(items.iter().filter_map(Value::as_str).map(String::from));
            }
            Some(Value::Object(entries)) => {
                for entry in entries.values() {
                    match entry {
                        Value::String(file) => files.push(file.clone()),
                        Value::Array(items) => {
                            files.extend(items.iter().filter_map(Value::as_str).map(String::from));
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        let absolute: Vec<String> = files
            .iter()
            .map(|file| {
                let path = Path::new(file);
                if path.is_absolute() {
                    file.clone()
                } else {
                    self.context.join(path).to_string_lossy().into_owned()
                }
            })
            .collect();

        let serialized = serde_json::to_string(&absolute)?;
        self.env.insert("FORGEPACK_ENTRY_FILES".to_string(), serialized);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> Service {
        Service::with_plugins(dir.path(), built_in_plugins()).unwrap()
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir);
        service.init(Some("development")).unwrap();
        let commands_after_first = service.commands().len();

        service.init(Some("production")).unwrap();
        assert_eq!(service.commands().len(), commands_after_first);
        // the second mode is ignored
        assert_eq!(service.mode(), Some("development"));
    }

    #[test]
    fn test_registry_default_modes() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        assert_eq!(service.mode_for("build"), Some("production"));
        assert_eq!(service.mode_for("serve"), Some("development"));
        assert_eq!(service.mode_for("nope"), None);
    }

    #[test]
    fn test_run_unknown_command() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir);
        let err = service
            .run(Some("deploy"), &CommandArgs::parse(["deploy"]))
            .unwrap_err();
        assert!(matches!(err, Error::CommandNotFound(ref name) if name == "deploy"));
    }

    #[test]
    fn test_help_flag_does_not_rescue_unknown_command() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir);
        let err = service
            .run(Some("deploy"), &CommandArgs::parse(["deploy", "--help"]))
            .unwrap_err();
        assert!(matches!(err, Error::CommandNotFound(ref name) if name == "deploy"));
    }

    #[test]
    fn test_mode_flag_beats_registry_default() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir);
        service
            .run(
                Some("inspect"),
                &CommandArgs::parse(["inspect", "--mode", "production"]),
            )
            .unwrap();
        assert_eq!(service.mode(), Some("production"));
        assert_eq!(service.env("NODE_ENV"), Some("production"));
    }

    #[test]
    fn test_raw_literal_merges_over_chain_output() {
        let dir = TempDir::new().unwrap();
        let mut service = Service::with_plugins(dir.path(), Vec::new()).unwrap();
        service.chain_config(|cfg| {
            cfg.output().filename = Some("[name].js".to_string());
            cfg.output().public_path = Some("/".to_string());
            Ok(())
        });
        service.configure(json!({"output": {"filename": "bundle.js"}}));
        service.init(None).unwrap();

        let config = service.resolve_bundler_config().unwrap();
        assert_eq!(config["output"]["filename"], json!("bundle.js"));
        // untouched siblings survive the merge
        assert_eq!(config["output"]["publicPath"], json!("/"));
    }

    #[test]
    fn test_configure_fn_must_return_object() {
        let dir = TempDir::new().unwrap();
        let mut service = Service::with_plugins(dir.path(), Vec::new()).unwrap();
        service.init(None).unwrap();
        service.registrations.raw_fns.push(RawConfig::Func(Arc::new(
            |_config: &mut Value| Ok(Some(json!("not an object"))),
        )));

        let err = service.resolve_bundler_config().unwrap_err();
        assert!(matches!(err, Error::Composition(_)));
    }

    #[test]
    fn test_configure_literal_must_be_object() {
        let dir = TempDir::new().unwrap();
        let mut service = Service::with_plugins(dir.path(), Vec::new()).unwrap();
        service.init(None).unwrap();
        service.configure(json!(["not", "an", "object"]));

        let err = service.resolve_bundler_config().unwrap_err();
        assert!(matches!(err, Error::Composition(_)));
    }

    #[test]
    fn test_chain_mutations_see_current_options() {
        let dir = TempDir::new().unwrap();
        let mut service = Service::with_plugins(dir.path(), Vec::new()).unwrap();
        service.chain_config(|cfg| {
            let output_dir = cfg.options().output_dir.clone();
            cfg.output().path = Some(PathBuf::from(output_dir));
            Ok(())
        });
        service.init(None).unwrap();

        // a command tweaking options after init is observed on compose
        service.options_mut().output_dir = "custom-out".to_string();
        let config = service.resolve_bundler_config().unwrap();
        assert_eq!(config["output"]["path"], json!("custom-out"));
    }

    #[test]
    fn test_entry_files_are_exported_absolute() {
        let dir = TempDir::new().unwrap();
        let mut service = Service::with_plugins(dir.path(), Vec::new()).unwrap();
        service.chain_config(|cfg| {
            cfg.entry("app").push("./src/main.js".to_string());
            Ok(())
        });
        service.init(None).unwrap();
        service.resolve_bundler_config().unwrap();

        let files: Vec<String> =
            serde_json::from_str(service.env("FORGEPACK_ENTRY_FILES").unwrap()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(Path::new(&files[0]).is_absolute());
        assert!(files[0].ends_with("src/main.js"));
    }

    #[test]
    fn test_public_path_guard_for_non_app_targets() {
        let dir = TempDir::new().unwrap();
        let mut service = Service::with_plugins(dir.path(), Vec::new()).unwrap();
        service.chain_config(|cfg| {
            cfg.output().public_path = Some("/cdn/".to_string());
            Ok(())
        });
        service.init(None).unwrap();

        // fine while building the app
        assert!(service.resolve_bundler_config().is_ok());

        service.set_env("FORGEPACK_BUILD_TARGET", "lib");
        let err = service.resolve_bundler_config().unwrap_err();
        assert!(err.to_string().contains("publicPath"));
    }

    #[test]
    fn test_user_configure_literal_is_applied_last() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("forgepack.config.json"),
            r#"{"configure": {"devtool": "source-map"}}"#,
        )
        .unwrap();
        let mut service = Service::with_plugins(dir.path(), Vec::new()).unwrap();
        service.chain_config(|cfg| {
            cfg.devtool(false);
            Ok(())
        });
        service.init(None).unwrap();

        let config = service.resolve_bundler_config().unwrap();
        assert_eq!(config["devtool"], json!("source-map"));
    }
}
