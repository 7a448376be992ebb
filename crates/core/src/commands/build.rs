//! The build command: compose a production config and run the compiler
//! backend over it, once for app builds and per output format for library
//! builds.

use crate::command::{CommandArgs, CommandSpec};
use crate::error::{Error, Result};
use crate::merge::merge;
use crate::options::ProjectOptions;
use crate::plugin::PluginApi;
use crate::service::Service;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

pub fn apply(api: &mut PluginApi<'_>, _options: &ProjectOptions) -> Result<()> {
    api.register_command(
        "build",
        CommandSpec::new(
            "produce a production-ready bundle in the output directory",
            "forgepack build [options] [entry]",
        )
        .option("--mode", "specify env mode (default: production)")
        .option("--dest", "specify output directory")
        .option("--target", "app | lib (default: app)")
        .option("--name", "name for lib mode (default: entry filename)")
        .option("--no-clean", "do not remove the output directory before building"),
        Arc::new(run),
    );
    Ok(())
}

fn run(service: &mut Service, args: &CommandArgs) -> Result<()> {
    let target = args.str_flag("target").unwrap_or("app").to_string();
    if target != "app" && target != "lib" {
        return Err(Error::Config(format!(
            "invalid build target \"{target}\" (expected \"app\" or \"lib\")"
        )));
    }
    let clean = args.bool_flag("clean").unwrap_or(true);

    if let Some(dest) = args.str_flag("dest") {
        service.options_mut().output_dir = dest.trim_end_matches('/').to_string();
    }
    if let Some(entry) = args.positionals.first() {
        let entry = service.resolve(entry).to_string_lossy().into_owned();
        service.configure(json!({"entry": {"app": [entry]}}));
    }

    service.set_env("FORGEPACK_BUILD_TARGET", &target);
    info!(
        "Building for {}...",
        service.env("NODE_ENV").unwrap_or("production")
    );

    let config = service.resolve_bundler_config()?;
    let configs = if target == "lib" {
        lib_configs(config, args)
    } else {
        vec![config]
    };

    let output_dir = service.resolve(&service.options().output_dir);
    if clean {
        // a missing output directory is already clean
        let _ = std::fs::remove_dir_all(&output_dir);
    }

    let stats = service.compiler().run_multi(&configs)?;
    service.remove_env("FORGEPACK_BUILD_TARGET");

    if stats.has_errors() {
        for e in &stats.errors {
            error!("{e}");
        }
        return Err(Error::Build("compilation produced errors".to_string()));
    }

    info!(
        "Build complete. The {} directory is ready to be deployed.",
        service.options().output_dir
    );
    Ok(())
}

/// A library build emits one config per output format: a commonjs bundle,
/// a umd bundle and a minified umd bundle.
fn lib_configs(config: Value, args: &CommandArgs) -> Vec<Value> {
    let name = args
        .str_flag("name")
        .map(String::from)
        .or_else(|| entry_stem(&config))
        .unwrap_or_else(|| "lib".to_string());

    let formats = [
        ("common", "commonjs2", false),
        ("umd", "umd", false),
        ("umd.min", "umd", true),
    ];
    formats
        .iter()
        .map(|(suffix, library_target, minimize)| {
            let mut partial = json!({
                "output": {
                    "filename": format!("{name}.{suffix}.js"),
                    "libraryTarget": library_target,
                    "library": name,
                }
            });
            if *minimize {
                partial["optimization"] = json!({"minimize": true});
            }
            merge(config.clone(), partial)
        })
        .collect()
}

fn entry_stem(config: &Value) -> Option<String> {
    let entries = config.get("entry")?.as_object()?;
    let first = entries.values().next()?;
    let file = match first {
        Value::String(file) => file.as_str(),
        Value::Array(items) => items.first()?.as_str()?,
        _ => return None,
    };
    Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}
