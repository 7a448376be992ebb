//! The app layer: html generation, chunk splitting, hashed filenames and
//! static file copying. Skipped entirely for non-app build targets.

use crate::chain::ChainedConfig;
use crate::error::{Error, Result};
use crate::options::ProjectOptions;
use crate::plugin::PluginApi;
use serde_json::{Map, Value, json};
use std::path::Path;

pub fn apply(api: &mut PluginApi<'_>, _options: &ProjectOptions) -> Result<()> {
    let context = api.context().to_path_buf();

    api.chain_config(move |cfg| {
        if matches!(cfg.env("FORGEPACK_BUILD_TARGET"), Some(target) if target != "app") {
            return Ok(());
        }
        let options = cfg.options().clone();
        let is_prod = cfg.env("NODE_ENV") == Some("production");

        let filename = if is_prod && options.filename_hashing {
            options.asset_path("js/[name].[contenthash:8].js")
        } else {
            options.asset_path("js/[name].js")
        };
        cfg.output().filename = Some(filename.clone());
        cfg.output().chunk_filename = Some(filename);

        cfg.optimization().split_chunks = Some(json!({
            "cacheGroups": {
                "vendors": {
                    "name": "chunk-vendors",
                    "test": r"[\\/]node_modules[\\/]",
                    "priority": -10,
                    "chunks": "initial",
                },
                "common": {
                    "name": "chunk-common",
                    "minChunks": 2,
                    "priority": -20,
                    "chunks": "initial",
                    "reuseExistingChunk": true,
                },
            }
        }));

        match &options.pages {
            Some(pages) => multi_page(cfg, &context, pages)?,
            None => {
                cfg.plugin("html").use_plugin(
                    "HtmlPlugin",
                    json!({
                        "template": html_template(&context, "index"),
                        "filename": options.index_path,
                    }),
                );
            }
        }

        if is_prod {
            cfg.plugin("named-chunks")
                .use_plugin("NamedChunksPlugin", Value::Null);
        }

        let public_dir = context.join("public");
        if public_dir.is_dir() {
            cfg.plugin("copy").use_plugin(
                "CopyPlugin",
                json!([{
                    "from": public_dir.to_string_lossy(),
                    "toType": "dir",
                    "ignore": ["index.html", ".DS_Store"],
                }]),
            );
        }
        Ok(())
    });
    Ok(())
}

/// One html plugin and one entry per page, replacing the default app entry.
fn multi_page(
    cfg: &mut ChainedConfig,
    context: &Path,
    pages: &Map<String, Value>,
) -> Result<()> {
    cfg.clear_entries();
    for (name, page) in pages {
        let (entries, template, filename, title) = page_fields(context, name, page)?;
        *cfg.entry(name) = entries;

        let mut args = json!({
            "template": template,
            "filename": filename,
            "chunks": ["chunk-vendors", "chunk-common", name],
        });
        if let Some(title) = title {
            args["title"] = json!(title);
        }
        cfg.plugin(&format!("html-{name}")).use_plugin("HtmlPlugin", args);
    }
    Ok(())
}

type PageFields = (Vec<String>, String, String, Option<String>);

fn page_fields(context: &Path, name: &str, page: &Value) -> Result<PageFields> {
    let entries = match page {
        Value::String(entry) => vec![entry.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Value::Object(obj) => match obj.get("entry") {
            Some(Value::String(entry)) => vec![entry.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => {
                return Err(Error::Config(format!(
                    "page \"{name}\" is missing an entry"
                )));
            }
        },
        _ => {
            return Err(Error::Config(format!(
                "page \"{name}\" must be a string, an array or an object"
            )));
        }
    };

    let obj = page.as_object();
    let template = obj
        .and_then(|o| o.get("template"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| html_template(context, name));
    let filename = obj
        .and_then(|o| o.get("filename"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("{name}.html"));
    let title = obj
        .and_then(|o| o.get("title"))
        .and_then(Value::as_str)
        .map(String::from);

    Ok((entries, template, ensure_html_suffix(filename), title))
}

/// Prefer a page-dedicated template under public/, falling back to the
/// shared index template.
fn html_template(context: &Path, name: &str) -> String {
    let dedicated = context.join("public").join(format!("{name}.html"));
    if dedicated.is_file() {
        return dedicated.to_string_lossy().into_owned();
    }
    context
        .join("public")
        .join("index.html")
        .to_string_lossy()
        .into_owned()
}

fn ensure_html_suffix(filename: String) -> String {
    if filename.ends_with(".html") {
        filename
    } else {
        format!("{filename}.html")
    }
}
