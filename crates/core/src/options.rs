//! Project options: defaults, schema validation and normalization.
//!
//! User options come from an optional `forgepack.config.json` at the project
//! root. They are validated against a declared shape, normalized, then
//! deep-default-merged over the hard-coded defaults.

use crate::error::{Error, Result};
use crate::merge::defaults_deep;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::warn;

/// File name of the optional project configuration at the project root.
pub const CONFIG_FILE: &str = "forgepack.config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectOptions {
    /// Project deployment base
    pub public_path: String,

    /// Where to output built files
    pub output_dir: String,

    /// Where to put static assets (js/css/img/font/...)
    pub assets_dir: String,

    /// Filename for index.html (relative to output_dir)
    pub index_path: String,

    /// Whether filenames contain a content hash part
    pub filename_hashing: bool,

    /// Dependencies to run through the transpile loader
    pub transpile_dependencies: Vec<String>,

    /// Source maps for production builds?
    pub production_source_map: bool,

    /// Parallelize expensive loaders (defaults to true on multi-core machines)
    pub parallel: bool,

    /// Multi-page configuration: page name -> entry (string, array or object)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Map<String, Value>>,

    pub css: CssOptions,

    /// true | false | "error" | "warning" | "default"
    pub lint_on_save: Value,

    /// Options forwarded to the dev server
    pub dev_server: Value,

    /// Options bag for third-party plugins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_options: Option<Value>,

    /// Literal partial configuration merged over the composed one
    /// (the file-based counterpart of a raw mutation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CssOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_module_extension: Option<bool>,
    /// true | false | object of extract-plugin options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loader_options: Option<Map<String, Value>>,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            public_path: "/".to_string(),
            output_dir: "dist".to_string(),
            assets_dir: String::new(),
            index_path: "index.html".to_string(),
            filename_hashing: true,
            transpile_dependencies: Vec::new(),
            production_source_map: false,
            parallel: has_multiple_cores(),
            pages: None,
            css: CssOptions::default(),
            lint_on_save: Value::String("default".to_string()),
            dev_server: json!({
                "host": "0.0.0.0",
                "port": 8080,
            }),
            plugin_options: None,
            configure: None,
        }
    }
}

impl ProjectOptions {
    /// Load user options from the project root, merged over defaults.
    /// A missing config file is not an error.
    pub fn load(context: &Path) -> Result<Self> {
        let user = load_user_options(context)?;
        let defaults = serde_json::to_value(ProjectOptions::default())?;
        let merged = defaults_deep(user, defaults);
        Ok(serde_json::from_value(merged)?)
    }

    /// Return the path an asset should be emitted under, honoring `assets_dir`.
    pub fn asset_path(&self, file_path: &str) -> String {
        if self.assets_dir.is_empty() {
            file_path.to_string()
        } else {
            format!("{}/{}", self.assets_dir.trim_end_matches('/'), file_path)
        }
    }

    /// Whether CSS should be extracted into its own files for this env.
    pub fn extract_css(&self, node_env: Option<&str>) -> bool {
        match &self.css.extract {
            Some(Value::Bool(b)) => *b,
            Some(Value::Object(_)) => true,
            _ => node_env == Some("production"),
        }
    }
}

fn has_multiple_cores() -> bool {
    std::thread::available_parallelism()
        .map(|n| n.get() > 1)
        .unwrap_or(false)
}

/// Read, normalize and validate the raw user options from the project root.
pub fn load_user_options(context: &Path) -> Result<Value> {
    let config_path = context.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = std::fs::read_to_string(&config_path)?;
    let mut raw: Value = serde_json::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {CONFIG_FILE}: {e}")))?;

    normalize_options(&mut raw);
    validate_options(&raw)?;

    Ok(raw)
}

/// Normalize raw user options in place: slash conventions and the
/// deprecated `css.modules` alias.
pub fn normalize_options(raw: &mut Value) {
    let Some(obj) = raw.as_object_mut() else {
        return;
    };

    // css.modules is the deprecated spelling of css.requireModuleExtension
    if let Some(css) = obj.get_mut("css").and_then(Value::as_object_mut) {
        if let Some(modules) = css.get("modules").and_then(Value::as_bool) {
            if css.contains_key("requireModuleExtension") {
                warn!(
                    "both \"css.modules\" and \"css.requireModuleExtension\" are set in {CONFIG_FILE}; \
                     \"css.modules\" will be ignored"
                );
            } else {
                warn!(
                    "\"css.modules\" in {CONFIG_FILE} is deprecated, \
                     please use \"css.requireModuleExtension\" instead"
                );
                css.insert("requireModuleExtension".to_string(), Value::Bool(!modules));
            }
        }
    }

    if let Some(Value::String(public_path)) = obj.get_mut("publicPath") {
        *public_path = ensure_slash(public_path);
    }
    if let Some(Value::String(output_dir)) = obj.get_mut("outputDir") {
        *output_dir = output_dir.trim_end_matches('/').to_string();
    }
}

/// Ensure a leading and trailing slash on a deployment base path, unless it
/// is a full URL; a leading `./` is stripped.
fn ensure_slash(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let mut out = value.to_string();
    let is_url = out.starts_with("http://") || out.starts_with("https://");
    if !is_url && !out.starts_with('/') && !out.starts_with('.') {
        out.insert(0, '/');
    }
    if !out.ends_with('/') {
        out.push('/');
    }
    if let Some(stripped) = out.strip_prefix("./") {
        out = stripped.to_string();
    }
    out
}

/// Expected shape of a raw option value.
#[derive(Debug, Clone, Copy)]
enum Kind {
    Bool,
    Str,
    Obj,
    Arr,
    BoolOrObj,
    LintSetting,
    Pages,
    Css,
}

const SCHEMA: &[(&str, Kind)] = &[
    ("publicPath", Kind::Str),
    ("outputDir", Kind::Str),
    ("assetsDir", Kind::Str),
    ("indexPath", Kind::Str),
    ("filenameHashing", Kind::Bool),
    ("transpileDependencies", Kind::Arr),
    ("productionSourceMap", Kind::Bool),
    ("parallel", Kind::Bool),
    ("devServer", Kind::Obj),
    ("pages", Kind::Pages),
    ("css", Kind::Css),
    ("lintOnSave", Kind::LintSetting),
    ("pluginOptions", Kind::Obj),
    ("configure", Kind::Obj),
];

const CSS_SCHEMA: &[(&str, Kind)] = &[
    ("modules", Kind::Bool),
    ("requireModuleExtension", Kind::Bool),
    ("extract", Kind::BoolOrObj),
    ("sourceMap", Kind::Bool),
    ("loaderOptions", Kind::Obj),
];

/// Validate raw user options against the declared shape. Reports the
/// offending path and message; unknown keys are rejected.
pub fn validate_options(raw: &Value) -> Result<()> {
    let Some(obj) = raw.as_object() else {
        return Err(Error::validation("<root>", "expected an object"));
    };

    for (key, value) in obj {
        let Some((_, kind)) = SCHEMA.iter().find(|(name, _)| name == key) else {
            return Err(Error::validation(key, "unknown option"));
        };
        check_kind(key, value, *kind)?;
    }
    Ok(())
}

fn check_kind(path: &str, value: &Value, kind: Kind) -> Result<()> {
    match kind {
        Kind::Bool if value.is_boolean() => Ok(()),
        Kind::Str if value.is_string() => Ok(()),
        Kind::Obj if value.is_object() => Ok(()),
        Kind::Arr if value.is_array() => Ok(()),
        Kind::BoolOrObj if value.is_boolean() || value.is_object() => Ok(()),
        Kind::LintSetting => match value {
            Value::Bool(_) => Ok(()),
            Value::String(s) if matches!(s.as_str(), "error" | "warning" | "default") => Ok(()),
            _ => Err(Error::validation(
                path,
                "expected true, false, \"error\", \"warning\" or \"default\"",
            )),
        },
        Kind::Pages => validate_pages(path, value),
        Kind::Css => {
            let Some(css) = value.as_object() else {
                return Err(Error::validation(path, "expected an object"));
            };
            for (key, value) in css {
                let full_path = format!("{path}.{key}");
                let Some((_, kind)) = CSS_SCHEMA.iter().find(|(name, _)| name == key) else {
                    return Err(Error::validation(full_path, "unknown option"));
                };
                check_kind(&full_path, value, *kind)?;
            }
            Ok(())
        }
        Kind::Bool => Err(Error::validation(path, "expected a boolean")),
        Kind::Str => Err(Error::validation(path, "expected a string")),
        Kind::Obj => Err(Error::validation(path, "expected an object")),
        Kind::Arr => Err(Error::validation(path, "expected an array")),
        Kind::BoolOrObj => Err(Error::validation(path, "expected a boolean or an object")),
    }
}

fn validate_pages(path: &str, value: &Value) -> Result<()> {
    let Some(pages) = value.as_object() else {
        return Err(Error::validation(path, "expected an object"));
    };
    for (name, page) in pages {
        let full_path = format!("{path}.{name}");
        match page {
            Value::String(_) => {}
            Value::Array(items) if items.iter().all(Value::is_string) => {}
            Value::Object(obj) => match obj.get("entry") {
                Some(Value::String(_)) => {}
                Some(Value::Array(items)) if items.iter().all(Value::is_string) => {}
                _ => {
                    return Err(Error::validation(
                        format!("{full_path}.entry"),
                        "expected a string or an array of strings",
                    ));
                }
            },
            _ => {
                return Err(Error::validation(
                    full_path,
                    "expected a string, an array of strings or an object with an entry",
                ));
            }
        }
    }
    Ok(())
}
