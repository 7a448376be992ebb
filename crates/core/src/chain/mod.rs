//! The mutable builder tree that chain mutations operate on.
//!
//! Independent plugins address the same logical nodes by stable string keys
//! (entries, output, named rules, named plugins, optimization) so a later
//! mutation can find and adjust what an earlier one created. Accessors come
//! in two capabilities: `rule`/`plugin`/`entry` create the node if missing,
//! `get_*_mut` return `None` for a missing node, and `tap_*` treat a missing
//! node as a composition error (the mutation author asked for something
//! that was never created).

mod rule;

pub use rule::{LoaderUse, Rule};

use crate::error::{Error, Result};
use crate::options::ProjectOptions;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Output node of the builder tree.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub path: Option<PathBuf>,
    pub filename: Option<String>,
    pub chunk_filename: Option<String>,
    pub public_path: Option<String>,
    pub global_object: Option<String>,
    pub library: Option<String>,
    pub library_target: Option<String>,
}

/// Module resolution node.
#[derive(Debug, Clone, Default)]
pub struct Resolve {
    pub extensions: Vec<String>,
    pub modules: Vec<String>,
    pub alias: IndexMap<String, String>,
}

impl Resolve {
    /// Append extensions that are not present yet, keeping order.
    pub fn merge_extensions(&mut self, extensions: &[&str]) -> &mut Self {
        for ext in extensions {
            if !self.extensions.iter().any(|e| e == ext) {
                self.extensions.push((*ext).to_string());
            }
        }
        self
    }
}

/// A named plugin slot. The key is the addressable name, `use_plugin` binds
/// the implementation identifier and its arguments.
#[derive(Debug, Clone, Default)]
pub struct PluginNode {
    kind: Option<String>,
    args: Value,
}

impl PluginNode {
    pub fn use_plugin(&mut self, kind: &str, args: Value) -> &mut Self {
        self.kind = Some(kind.to_string());
        self.args = args;
        self
    }

    pub fn args_mut(&mut self) -> &mut Value {
        &mut self.args
    }

    fn to_value(&self, name: &str) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::String(name.to_string()));
        if let Some(kind) = &self.kind {
            obj.insert("use".to_string(), Value::String(kind.clone()));
        }
        if !self.args.is_null() {
            obj.insert("args".to_string(), self.args.clone());
        }
        Value::Object(obj)
    }
}

/// Optimization node: minimizer plugins by name plus chunk splitting.
#[derive(Debug, Clone, Default)]
pub struct Optimization {
    pub minimize: Option<bool>,
    pub split_chunks: Option<Value>,
    minimizers: IndexMap<String, PluginNode>,
}

impl Optimization {
    pub fn minimizer(&mut self, name: &str) -> &mut PluginNode {
        self.minimizers.entry(name.to_string()).or_default()
    }

    pub fn get_minimizer_mut(&mut self, name: &str) -> Option<&mut PluginNode> {
        self.minimizers.get_mut(name)
    }

    fn is_empty(&self) -> bool {
        self.minimize.is_none() && self.split_chunks.is_none() && self.minimizers.is_empty()
    }
}

/// The shared builder tree a chain mutation receives.
///
/// Carries read-only snapshots of the service environment and project
/// options, taken when composition starts. Mutations read both from here
/// rather than capturing them at registration time, so a command that
/// adjusts an option (`build --dest`) before composing is observed.
#[derive(Debug, Clone, Default)]
pub struct ChainedConfig {
    env: BTreeMap<String, String>,
    options: ProjectOptions,
    mode: Option<String>,
    context: Option<PathBuf>,
    devtool: Option<Value>,
    entries: IndexMap<String, Vec<String>>,
    output: Output,
    resolve: Resolve,
    resolve_loader_modules: Vec<String>,
    rules: IndexMap<String, Rule>,
    plugins: IndexMap<String, PluginNode>,
    optimization: Optimization,
    node: Map<String, Value>,
    dev_server: Map<String, Value>,
    extra: Map<String, Value>,
}

impl ChainedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_snapshot(env: BTreeMap<String, String>, options: ProjectOptions) -> Self {
        Self {
            env,
            options,
            ..Self::default()
        }
    }

    /// Read an environment value from the composition-time snapshot.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// The full environment snapshot.
    pub fn env_snapshot(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Project options as they stand at composition time.
    pub fn options(&self) -> &ProjectOptions {
        &self.options
    }

    pub fn mode(&mut self, mode: &str) -> &mut Self {
        self.mode = Some(mode.to_string());
        self
    }

    pub fn context(&mut self, context: impl Into<PathBuf>) -> &mut Self {
        self.context = Some(context.into());
        self
    }

    /// Set the devtool (a source-map kind string, or `false` to disable).
    pub fn devtool(&mut self, devtool: impl Into<Value>) -> &mut Self {
        self.devtool = Some(devtool.into());
        self
    }

    /// Add or fetch a named entry point.
    pub fn entry(&mut self, name: &str) -> &mut Vec<String> {
        self.entries.entry(name.to_string()).or_default()
    }

    pub fn get_entry_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        self.entries.get_mut(name)
    }

    pub fn clear_entries(&mut self) -> &mut Self {
        self.entries.clear();
        self
    }

    pub fn output(&mut self) -> &mut Output {
        &mut self.output
    }

    pub fn resolve(&mut self) -> &mut Resolve {
        &mut self.resolve
    }

    pub fn resolve_loader_modules(&mut self) -> &mut Vec<String> {
        &mut self.resolve_loader_modules
    }

    /// Add or fetch a named module rule.
    pub fn rule(&mut self, name: &str) -> &mut Rule {
        self.rules
            .entry(name.to_string())
            .or_insert_with(|| Rule::new(name))
    }

    pub fn get_rule_mut(&mut self, name: &str) -> Option<&mut Rule> {
        self.rules.get_mut(name)
    }

    /// Fetch a rule that must already exist; a missing node aborts
    /// composition.
    pub fn tap_rule(&mut self, name: &str) -> Result<&mut Rule> {
        self.rules
            .get_mut(name)
            .ok_or_else(|| Error::Composition(format!("rule \"{name}\" does not exist")))
    }

    pub fn remove_rule(&mut self, name: &str) -> &mut Self {
        self.rules.shift_remove(name);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    /// Add or fetch a named plugin slot.
    pub fn plugin(&mut self, name: &str) -> &mut PluginNode {
        self.plugins.entry(name.to_string()).or_default()
    }

    pub fn get_plugin_mut(&mut self, name: &str) -> Option<&mut PluginNode> {
        self.plugins.get_mut(name)
    }

    /// Fetch a plugin slot that must already exist.
    pub fn tap_plugin(&mut self, name: &str) -> Result<&mut PluginNode> {
        self.plugins
            .get_mut(name)
            .ok_or_else(|| Error::Composition(format!("plugin \"{name}\" does not exist")))
    }

    pub fn remove_plugin(&mut self, name: &str) -> &mut Self {
        self.plugins.shift_remove(name);
        self
    }

    pub fn optimization(&mut self) -> &mut Optimization {
        &mut self.optimization
    }

    pub fn node_shims(&mut self) -> &mut Map<String, Value> {
        &mut self.node
    }

    pub fn dev_server(&mut self) -> &mut Map<String, Value> {
        &mut self.dev_server
    }

    /// Set an arbitrary top-level configuration field.
    pub fn set(&mut self, key: &str, value: Value) -> &mut Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Flatten the tree into a plain configuration object. Rule-name
    /// metadata is attached out-of-band under `__ruleNames`.
    pub fn to_config(&self) -> Value {
        let mut cfg = Map::new();

        if let Some(mode) = &self.mode {
            cfg.insert("mode".to_string(), Value::String(mode.clone()));
        }
        if let Some(context) = &self.context {
            cfg.insert(
                "context".to_string(),
                Value::String(context.to_string_lossy().into_owned()),
            );
        }
        if let Some(devtool) = &self.devtool {
            cfg.insert("devtool".to_string(), devtool.clone());
        }
        if !self.entries.is_empty() {
            let mut entry = Map::new();
            for (name, files) in &self.entries {
                entry.insert(
                    name.clone(),
                    Value::Array(files.iter().map(|f| Value::String(f.clone())).collect()),
                );
            }
            cfg.insert("entry".to_string(), Value::Object(entry));
        }

        let output = self.output_value();
        if !output.as_object().map(Map::is_empty).unwrap_or(true) {
            cfg.insert("output".to_string(), output);
        }

        let resolve = self.resolve_value();
        if !resolve.as_object().map(Map::is_empty).unwrap_or(true) {
            cfg.insert("resolve".to_string(), resolve);
        }
        if !self.resolve_loader_modules.is_empty() {
            let mut resolve_loader = Map::new();
            resolve_loader.insert(
                "modules".to_string(),
                Value::Array(
                    self.resolve_loader_modules
                        .iter()
                        .map(|m| Value::String(m.clone()))
                        .collect(),
                ),
            );
            cfg.insert("resolveLoader".to_string(), Value::Object(resolve_loader));
        }

        if !self.rules.is_empty() {
            let rules: Vec<Value> = self.rules.values().map(|r| r.to_value(&[])).collect();
            let mut module = Map::new();
            module.insert("rules".to_string(), Value::Array(rules));
            cfg.insert("module".to_string(), Value::Object(module));
        }

        if !self.plugins.is_empty() {
            let plugins: Vec<Value> = self
                .plugins
                .iter()
                .map(|(name, plugin)| plugin.to_value(name))
                .collect();
            cfg.insert("plugins".to_string(), Value::Array(plugins));
        }

        if !self.optimization.is_empty() {
            let mut optimization = Map::new();
            if let Some(minimize) = self.optimization.minimize {
                optimization.insert("minimize".to_string(), Value::Bool(minimize));
            }
            if !self.optimization.minimizers.is_empty() {
                let minimizers: Vec<Value> = self
                    .optimization
                    .minimizers
                    .iter()
                    .map(|(name, plugin)| plugin.to_value(name))
                    .collect();
                optimization.insert("minimizer".to_string(), Value::Array(minimizers));
            }
            if let Some(split_chunks) = &self.optimization.split_chunks {
                optimization.insert("splitChunks".to_string(), split_chunks.clone());
            }
            cfg.insert("optimization".to_string(), Value::Object(optimization));
        }

        if !self.node.is_empty() {
            cfg.insert("node".to_string(), Value::Object(self.node.clone()));
        }
        if !self.dev_server.is_empty() {
            cfg.insert("devServer".to_string(), Value::Object(self.dev_server.clone()));
        }
        for (key, value) in &self.extra {
            cfg.insert(key.clone(), value.clone());
        }

        Value::Object(cfg)
    }

    fn output_value(&self) -> Value {
        let mut output = Map::new();
        if let Some(path) = &self.output.path {
            output.insert(
                "path".to_string(),
                Value::String(path.to_string_lossy().into_owned()),
            );
        }
        let string_fields = [
            ("filename", &self.output.filename),
            ("chunkFilename", &self.output.chunk_filename),
            ("publicPath", &self.output.public_path),
            ("globalObject", &self.output.global_object),
            ("library", &self.output.library),
            ("libraryTarget", &self.output.library_target),
        ];
        for (key, value) in string_fields {
            if let Some(value) = value {
                output.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        Value::Object(output)
    }

    fn resolve_value(&self) -> Value {
        let mut resolve = Map::new();
        if !self.resolve.extensions.is_empty() {
            resolve.insert(
                "extensions".to_string(),
                Value::Array(
                    self.resolve
                        .extensions
                        .iter()
                        .map(|e| Value::String(e.clone()))
                        .collect(),
                ),
            );
        }
        if !self.resolve.modules.is_empty() {
            resolve.insert(
                "modules".to_string(),
                Value::Array(
                    self.resolve
                        .modules
                        .iter()
                        .map(|m| Value::String(m.clone()))
                        .collect(),
                ),
            );
        }
        if !self.resolve.alias.is_empty() {
            let mut alias = Map::new();
            for (from, to) in &self.resolve.alias {
                alias.insert(from.clone(), Value::String(to.clone()));
            }
            resolve.insert("alias".to_string(), Value::Object(alias));
        }
        Value::Object(resolve)
    }
}
