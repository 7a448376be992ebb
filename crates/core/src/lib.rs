//! forgepack-core: a pluggable build-configuration orchestrator.
//!
//! A [`Service`] owns a plugin registry, the project environment and the
//! user's options. Plugins register commands and queue configuration
//! mutations; composition applies chained mutations over a builder tree,
//! flattens it, and deep-merges raw mutations on top.

pub mod cache;
pub mod chain;
pub mod client_env;
pub mod command;
pub mod commands;
pub mod config_plugins;
pub mod env;
pub mod error;
pub mod interfaces;
pub mod merge;
pub mod options;
pub mod plugin;
pub mod service;

pub use chain::ChainedConfig;
pub use command::{Command, CommandArgs, CommandHandler, CommandSpec};
pub use error::{Error, Result};
pub use interfaces::{CompileStats, Compiler, DevServer, DevServerHook, RunningServer};
pub use options::ProjectOptions;
pub use plugin::{ApplyFn, PluginApi, PluginDescriptor, built_in_plugins};
pub use service::{ChainFn, RawConfig, Service};
