//! Command registration and CLI argument parsing.

use crate::error::Result;
use crate::service::Service;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Handler invoked when a command is dispatched. Handlers receive the
/// service mutably so they can adjust options and env before composing.
pub type CommandHandler = Arc<dyn Fn(&mut Service, &CommandArgs) -> Result<()> + Send + Sync>;

/// Metadata shown by the help command.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub description: String,
    pub usage: String,
    pub options: IndexMap<String, String>,
}

impl CommandSpec {
    pub fn new(description: &str, usage: &str) -> Self {
        Self {
            description: description.to_string(),
            usage: usage.to_string(),
            options: IndexMap::new(),
        }
    }

    pub fn option(mut self, flag: &str, help: &str) -> Self {
        self.options.insert(flag.to_string(), help.to_string());
        self
    }
}

/// A registered command: its help metadata plus the handler to run.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub spec: CommandSpec,
    pub handler: CommandHandler,
}

/// Parsed command-line arguments.
///
/// `positionals` holds everything that was not a flag, `flags` holds flag
/// values keyed by name, and `raw` keeps the original token stream for
/// handlers that forward it unchanged.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    pub positionals: Vec<String>,
    pub flags: IndexMap<String, Value>,
    pub raw: Vec<String>,
}

impl CommandArgs {
    /// Parse a raw token list.
    ///
    /// Supported forms: `--flag` (true), `--no-flag` (false), `--flag=value`,
    /// `--flag value` (when the next token is not itself a flag), and short
    /// clusters like `-ab` (each letter true). Values that look like numbers
    /// or booleans are coerced.
    pub fn parse<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut positionals = Vec::new();
        let mut flags = IndexMap::new();

        let mut i = 0;
        while i < raw.len() {
            let token = &raw[i];
            if let Some(body) = token.strip_prefix("--") {
                if body.is_empty() {
                    // `--` ends flag parsing
                    positionals.extend(raw[i + 1..].iter().cloned());
                    break;
                }
                if let Some((key, value)) = body.split_once('=') {
                    flags.insert(key.to_string(), coerce(value));
                } else if let Some(key) = body.strip_prefix("no-") {
                    flags.insert(key.to_string(), Value::Bool(false));
                } else if i + 1 < raw.len() && !raw[i + 1].starts_with('-') {
                    flags.insert(body.to_string(), coerce(&raw[i + 1]));
                    i += 1;
                } else {
                    flags.insert(body.to_string(), Value::Bool(true));
                }
            } else if let Some(body) = token.strip_prefix('-') {
                if body.is_empty() {
                    positionals.push(token.clone());
                } else {
                    for ch in body.chars() {
                        flags.insert(ch.to_string(), Value::Bool(true));
                    }
                }
            } else {
                positionals.push(token.clone());
            }
            i += 1;
        }

        Self {
            positionals,
            flags,
            raw,
        }
    }

    /// Drop the leading positional (the command name itself) and its raw
    /// token, so handlers see only their own arguments.
    pub fn without_command_name(&self) -> Self {
        let mut stripped = self.clone();
        if !stripped.positionals.is_empty() {
            let name = stripped.positionals.remove(0);
            if let Some(pos) = stripped.raw.iter().position(|t| *t == name) {
                stripped.raw.remove(pos);
            }
        }
        stripped
    }

    pub fn flag(&self, name: &str) -> Option<&Value> {
        self.flags.get(name)
    }

    pub fn bool_flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).and_then(Value::as_bool)
    }

    pub fn str_flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).and_then(Value::as_str)
    }

    /// Whether the user asked for help (`--help` or `-h`).
    pub fn wants_help(&self) -> bool {
        self.bool_flag("help").unwrap_or(false) || self.bool_flag("h").unwrap_or(false)
    }
}

fn coerce(value: &str) -> Value {
    match value {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = value.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_mixed_tokens() {
        let args = CommandArgs::parse(["build", "--target", "lib", "--dest=out", "src/index.js"]);
        assert_eq!(args.positionals, ["build", "src/index.js"]);
        assert_eq!(args.str_flag("target"), Some("lib"));
        assert_eq!(args.str_flag("dest"), Some("out"));
    }

    #[test]
    fn test_negated_and_bare_flags() {
        let args = CommandArgs::parse(["serve", "--open", "--no-clean"]);
        assert_eq!(args.bool_flag("open"), Some(true));
        assert_eq!(args.bool_flag("clean"), Some(false));
    }

    #[test]
    fn test_short_cluster_and_value_coercion() {
        let args = CommandArgs::parse(["-ab", "--port", "9090", "--modern=false"]);
        assert_eq!(args.bool_flag("a"), Some(true));
        assert_eq!(args.bool_flag("b"), Some(true));
        assert_eq!(args.flag("port"), Some(&json!(9090)));
        assert_eq!(args.bool_flag("modern"), Some(false));
    }

    #[test]
    fn test_double_dash_stops_flag_parsing() {
        let args = CommandArgs::parse(["inspect", "--", "--rules"]);
        assert_eq!(args.positionals, ["inspect", "--rules"]);
        assert!(args.flags.is_empty());
    }

    #[test]
    fn test_without_command_name_strips_first_positional() {
        let args = CommandArgs::parse(["build", "--target", "lib", "entry.js"]);
        let stripped = args.without_command_name();
        assert_eq!(stripped.positionals, ["entry.js"]);
        assert_eq!(stripped.raw, ["--target", "lib", "entry.js"]);
        // flags are untouched
        assert_eq!(stripped.str_flag("target"), Some("lib"));
    }

    #[test]
    fn test_wants_help() {
        assert!(CommandArgs::parse(["build", "--help"]).wants_help());
        assert!(CommandArgs::parse(["-h"]).wants_help());
        assert!(!CommandArgs::parse(["build"]).wants_help());
    }
}
