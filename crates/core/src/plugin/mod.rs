//! Plugin registry.
//!
//! Every piece of behavior, including the built-in commands and the stock
//! config layers, arrives through a plugin. Plugins are applied once during
//! service init, in registry order, and do all their work through the
//! [`PluginApi`] facade.

pub mod api;

pub use api::PluginApi;

use crate::commands;
use crate::config_plugins;
use crate::error::{Error, Result};
use crate::options::ProjectOptions;

/// A plugin's entry point.
pub type ApplyFn = fn(&mut PluginApi<'_>, &ProjectOptions) -> Result<()>;

/// A registered plugin.
#[derive(Clone, Copy)]
pub struct PluginDescriptor {
    pub id: &'static str,
    pub apply: ApplyFn,
    /// Default mode per command this plugin registers, e.g. `("build",
    /// "production")`. Folded into the service's mode table at startup.
    pub default_modes: &'static [(&'static str, &'static str)],
}

/// The stock registry: command plugins first, then the config layers in
/// composition order.
pub fn built_in_plugins() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor {
            id: "built-in:commands/help",
            apply: commands::help::apply,
            default_modes: &[],
        },
        PluginDescriptor {
            id: "built-in:commands/serve",
            apply: commands::serve::apply,
            default_modes: &[("serve", "development")],
        },
        PluginDescriptor {
            id: "built-in:commands/build",
            apply: commands::build::apply,
            default_modes: &[("build", "production")],
        },
        PluginDescriptor {
            id: "built-in:commands/inspect",
            apply: commands::inspect::apply,
            default_modes: &[("inspect", "development")],
        },
        PluginDescriptor {
            id: "built-in:config/base",
            apply: config_plugins::base::apply,
            default_modes: &[],
        },
        PluginDescriptor {
            id: "built-in:config/css",
            apply: config_plugins::css::apply,
            default_modes: &[],
        },
        PluginDescriptor {
            id: "built-in:config/prod",
            apply: config_plugins::prod::apply,
            default_modes: &[],
        },
        PluginDescriptor {
            id: "built-in:config/app",
            apply: config_plugins::app::apply,
            default_modes: &[],
        },
        PluginDescriptor {
            id: "built-in:config/transpile",
            apply: config_plugins::transpile::apply,
            default_modes: &[],
        },
    ]
}

/// Reject registries a service cannot safely start with.
pub fn validate_registry(plugins: &[PluginDescriptor]) -> Result<()> {
    let mut seen = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        if plugin.id.is_empty() {
            return Err(Error::Startup("plugin with empty id".to_string()));
        }
        if seen.contains(&plugin.id) {
            return Err(Error::Startup(format!(
                "duplicate plugin id: {}",
                plugin.id
            )));
        }
        seen.push(plugin.id);
    }
    Ok(())
}
