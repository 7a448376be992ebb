//! The facade handed to plugins while they apply.
//!
//! Plugins never touch the service directly; everything they may do is a
//! method here, which keeps the apply phase auditable and lets the service
//! own all mutable state.

use crate::cache::{CacheConfig, gen_cache_config};
use crate::chain::ChainedConfig;
use crate::command::{Command, CommandHandler, CommandSpec};
use crate::error::Result;
use crate::interfaces::DevServerHook;
use crate::service::{ChainFn, RawConfig, Registrations};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub struct PluginApi<'a> {
    id: &'a str,
    context: &'a Path,
    plugin_ids: &'a [String],
    env: &'a BTreeMap<String, String>,
    registrations: &'a mut Registrations,
}

impl<'a> PluginApi<'a> {
    pub(crate) fn new(
        id: &'a str,
        context: &'a Path,
        plugin_ids: &'a [String],
        env: &'a BTreeMap<String, String>,
        registrations: &'a mut Registrations,
    ) -> Self {
        Self {
            id,
            context,
            plugin_ids,
            env,
            registrations,
        }
    }

    /// Id of the plugin currently applying.
    pub fn id(&self) -> &str {
        self.id
    }

    /// Project root.
    pub fn context(&self) -> &Path {
        self.context
    }

    /// Resolved environment, read-only during apply.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Resolve a project-relative path against the context.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.context.join(rel)
    }

    /// Whether a plugin is present, by full id or by the `built-in:`
    /// shorthand (`has_plugin("commands/serve")`).
    pub fn has_plugin(&self, query: &str) -> bool {
        self.plugin_ids
            .iter()
            .any(|id| id == query || *id == format!("built-in:{query}"))
    }

    /// Register a named command. A later registration under the same name
    /// replaces the earlier one.
    pub fn register_command(&mut self, name: &str, spec: CommandSpec, handler: CommandHandler) {
        if self.registrations.commands.contains_key(name) {
            debug!("plugin {} overrides command {}", self.id, name);
        }
        self.registrations.commands.insert(
            name.to_string(),
            Command {
                name: name.to_string(),
                spec,
                handler,
            },
        );
    }

    /// Queue a chained mutation, applied in registration order.
    pub fn chain_config<F>(&mut self, f: F)
    where
        F: Fn(&mut ChainedConfig) -> Result<()> + Send + Sync + 'static,
    {
        self.registrations.chain_fns.push(Arc::new(f) as ChainFn);
    }

    /// Queue a raw mutation function, applied after every chained mutation.
    pub fn configure_fn<F>(&mut self, f: F)
    where
        F: Fn(&mut Value) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.registrations.raw_fns.push(RawConfig::Func(Arc::new(f)));
    }

    /// Queue a raw literal object, deep-merged over the composed config.
    pub fn configure(&mut self, partial: Value) {
        self.registrations.raw_fns.push(RawConfig::Literal(partial));
    }

    /// Register a hook run when a dev server starts.
    pub fn on_dev_server(&mut self, hook: DevServerHook) {
        self.registrations.dev_server_fns.push(hook);
    }

    /// Derive cache settings for a caching loader owned by this plugin.
    pub fn gen_cache_config(
        &self,
        id: &str,
        partial_identifier: Value,
        config_dependencies: &[&str],
    ) -> Result<CacheConfig> {
        gen_cache_config(self.context, self.env, id, partial_identifier, config_dependencies)
    }
}
