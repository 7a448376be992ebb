//! The serve command: compose a development config and hand it to the
//! dev-server backend.

use crate::command::{CommandArgs, CommandSpec};
use crate::error::{Error, Result};
use crate::interfaces::ServeSettings;
use crate::merge::merge;
use crate::options::ProjectOptions;
use crate::plugin::PluginApi;
use crate::service::Service;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::sync::Arc;
use tracing::{info, warn};

const PORT_SCAN_RANGE: u16 = 100;

pub fn apply(api: &mut PluginApi<'_>, _options: &ProjectOptions) -> Result<()> {
    api.register_command(
        "serve",
        CommandSpec::new(
            "start a development server with rebuild-on-change",
            "forgepack serve [options] [entry]",
        )
        .option("--mode", "specify env mode (default: development)")
        .option("--host", "specify host (default: 0.0.0.0)")
        .option("--port", "specify port (default: 8080)")
        .option("--https", "use https")
        .option("--open", "open browser on server start"),
        Arc::new(run),
    );

    api.chain_config(|cfg| {
        // development-only ergonomics; production and test configs are
        // composed without them even when serve registered the mutation
        if matches!(cfg.env("NODE_ENV"), Some("production") | Some("test")) {
            return Ok(());
        }
        let show_progress = cfg
            .options()
            .dev_server
            .get("progress")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        cfg.devtool("cheap-module-eval-source-map");
        cfg.output().global_object = Some("(typeof self !== 'undefined' ? self : this)".to_string());
        cfg.plugin("hmr").use_plugin("HotModuleReplacementPlugin", Value::Null);
        if show_progress {
            cfg.plugin("progress").use_plugin("ProgressPlugin", Value::Null);
        }
        Ok(())
    });
    Ok(())
}

fn run(service: &mut Service, args: &CommandArgs) -> Result<()> {
    info!("Starting development server...");

    if let Some(entry) = args.positionals.first() {
        let entry = service.resolve(entry).to_string_lossy().into_owned();
        service.configure(json!({"entry": {"app": [entry]}}));
    }

    let config = service.resolve_bundler_config()?;
    let server_options = merge(
        config.get("devServer").cloned().unwrap_or_else(|| json!({})),
        service.options().dev_server.clone(),
    );

    let host = args
        .str_flag("host")
        .map(String::from)
        .or_else(|| service.env("HOST").map(String::from))
        .or_else(|| server_options.get("host").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let requested_port = args
        .flag("port")
        .and_then(Value::as_u64)
        .or_else(|| service.env("PORT").and_then(|p| p.parse().ok()))
        .or_else(|| server_options.get("port").and_then(Value::as_u64))
        .unwrap_or(8080) as u16;
    let port = find_free_port(&host, requested_port)?;

    let settings = ServeSettings {
        host: host.clone(),
        port,
        https: args.bool_flag("https").unwrap_or(false),
        open: args.bool_flag("open").unwrap_or(false),
        public_url: server_options.get("public").and_then(Value::as_str).map(String::from),
    };

    let hooks = service.dev_server_hooks();
    let server = service.dev_server().serve(&config, &settings, &hooks)?;

    let closer = Arc::clone(&server);
    if let Err(e) = ctrlc::set_handler(move || {
        closer.close();
        std::process::exit(0);
    }) {
        warn!("could not install shutdown handler: {e}");
    }

    let stats = server.wait_for_first_build()?;
    for warning in &stats.warnings {
        warn!("{warning}");
    }
    if stats.has_errors() {
        for error in &stats.errors {
            tracing::error!("{error}");
        }
    }

    let scheme = if settings.https { "https" } else { "http" };
    println!();
    println!("  App running at:");
    println!("  - Local:   {scheme}://localhost:{port}/");
    if host != "localhost" && host != "127.0.0.1" {
        println!("  - Network: {scheme}://{host}:{port}/");
    }
    println!();

    server.wait_until_stopped()
}

/// Find the first free port at or above the requested one. Bounded so a
/// fully occupied range fails loudly instead of scanning forever.
fn find_free_port(host: &str, requested: u16) -> Result<u16> {
    let bind_host = if host == "0.0.0.0" { "0.0.0.0" } else { host };
    for offset in 0..PORT_SCAN_RANGE {
        let Some(port) = requested.checked_add(offset) else {
            break;
        };
        if TcpListener::bind((bind_host, port)).is_ok() {
            return Ok(port);
        }
    }
    Err(Error::Server(format!(
        "no free port found between {requested} and {}",
        requested.saturating_add(PORT_SCAN_RANGE)
    )))
}
