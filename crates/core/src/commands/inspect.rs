//! The inspect command: print the composed configuration, or a slice of it.

use crate::command::{CommandArgs, CommandSpec};
use crate::error::Result;
use crate::merge::RULE_NAMES_KEY;
use crate::options::ProjectOptions;
use crate::plugin::PluginApi;
use crate::service::Service;
use serde_json::{Value, json};
use std::sync::Arc;

pub fn apply(api: &mut PluginApi<'_>, _options: &ProjectOptions) -> Result<()> {
    api.register_command(
        "inspect",
        CommandSpec::new(
            "print the composed bundler configuration",
            "forgepack inspect [options] [path.to.field]",
        )
        .option("--mode", "specify env mode (default: development)")
        .option("--rules", "list all named module rules")
        .option("--plugins", "list all named plugins")
        .option("--rule", "print a single module rule by name")
        .option("--plugin", "print a single plugin by name"),
        Arc::new(run),
    );
    Ok(())
}

fn run(service: &mut Service, args: &CommandArgs) -> Result<()> {
    let config = service.resolve_bundler_config()?;

    let output = if args.bool_flag("rules").unwrap_or(false) {
        json!(rule_names(&config))
    } else if args.bool_flag("plugins").unwrap_or(false) {
        json!(plugin_names(&config))
    } else if let Some(name) = args.str_flag("rule") {
        find_rule(&config, name).cloned().unwrap_or(Value::Null)
    } else if let Some(name) = args.str_flag("plugin") {
        find_plugin(&config, name).cloned().unwrap_or(Value::Null)
    } else if let Some(path) = args.positionals.first() {
        lookup_path(&config, path).cloned().unwrap_or(Value::Null)
    } else {
        config
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn rule_names(config: &Value) -> Vec<&str> {
    config
        .pointer("/module/rules")
        .and_then(Value::as_array)
        .map(|rules| {
            rules
                .iter()
                .filter_map(|rule| rule[RULE_NAMES_KEY][0].as_str())
                .collect()
        })
        .unwrap_or_default()
}

fn plugin_names(config: &Value) -> Vec<&str> {
    config
        .get("plugins")
        .and_then(Value::as_array)
        .map(|plugins| {
            plugins
                .iter()
                .filter_map(|plugin| plugin["name"].as_str())
                .collect()
        })
        .unwrap_or_default()
}

fn find_rule<'a>(config: &'a Value, name: &str) -> Option<&'a Value> {
    config
        .pointer("/module/rules")?
        .as_array()?
        .iter()
        .find(|rule| rule[RULE_NAMES_KEY][0].as_str() == Some(name))
}

fn find_plugin<'a>(config: &'a Value, name: &str) -> Option<&'a Value> {
    config
        .get("plugins")?
        .as_array()?
        .iter()
        .find(|plugin| plugin["name"].as_str() == Some(name))
}

/// Descend a dotted path; numeric segments index into arrays.
fn lookup_path<'a>(config: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = config;
    for segment in path.split('.') {
        current = match current {
            Value::Object(obj) => obj.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Value {
        json!({
            "output": {"path": "/proj/dist"},
            "module": {"rules": [
                {"test": "a", RULE_NAMES_KEY: ["images"]},
                {"test": "b", RULE_NAMES_KEY: ["svg"]}
            ]},
            "plugins": [{"name": "html", "use": "HtmlPlugin"}]
        })
    }

    #[test]
    fn test_rule_and_plugin_listings() {
        assert_eq!(rule_names(&config()), ["images", "svg"]);
        assert_eq!(plugin_names(&config()), ["html"]);
    }

    #[test]
    fn test_find_rule_by_name() {
        let config = config();
        let rule = find_rule(&config, "svg").unwrap();
        assert_eq!(rule["test"], json!("b"));
        assert!(find_rule(&config, "nope").is_none());
    }

    #[test]
    fn test_lookup_dotted_path() {
        let config = config();
        assert_eq!(lookup_path(&config, "output.path"), Some(&json!("/proj/dist")));
        assert_eq!(
            lookup_path(&config, "module.rules.1.test"),
            Some(&json!("b"))
        );
        assert!(lookup_path(&config, "output.missing").is_none());
    }
}
