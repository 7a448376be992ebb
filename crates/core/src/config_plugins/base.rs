//! The base layer: entry, output, resolution, static asset rules and the
//! always-on plugins every other layer builds upon.

use crate::client_env::resolve_client_env;
use crate::error::Result;
use crate::options::ProjectOptions;
use crate::plugin::PluginApi;
use serde_json::{Value, json};

const INLINE_ASSET_LIMIT: u32 = 4096;

pub fn apply(api: &mut PluginApi<'_>, _options: &ProjectOptions) -> Result<()> {
    let context = api.context().to_path_buf();

    api.chain_config(move |cfg| {
        let options = cfg.options().clone();
        let client_env = resolve_client_env(&options, cfg.env_snapshot());

        cfg.mode("development");
        cfg.context(context.clone());
        if cfg.get_entry_mut("app").is_none() {
            cfg.entry("app").push("./src/main.js".to_string());
        }

        cfg.output().path = Some(context.join(&options.output_dir));
        cfg.output().filename = Some("[name].js".to_string());
        cfg.output().public_path = Some(options.public_path.clone());

        cfg.resolve()
            .merge_extensions(&[".mjs", ".js", ".jsx", ".json", ".wasm"]);
        cfg.resolve().modules = vec!["node_modules".to_string()];
        cfg.resolve().alias.insert(
            "@".to_string(),
            context.join("src").to_string_lossy().into_owned(),
        );
        cfg.resolve_loader_modules().push("node_modules".to_string());

        let hash = if options.filename_hashing { ".[hash:8]" } else { "" };
        let inline = |dir: &str| {
            json!({
                "limit": INLINE_ASSET_LIMIT,
                "fallback": {
                    "loader": "file-loader",
                    "options": {
                        "name": options.asset_path(&format!("{dir}/[name]{hash}.[ext]")),
                    }
                }
            })
        };

        cfg.rule("images")
            .test(r"\.(png|jpe?g|gif|webp)(\?.*)?$")
            .use_loader("url-loader")
            .options(inline("img"));
        // svg must keep its url for SMIL/fragment references, never inlined
        cfg.rule("svg")
            .test(r"\.(svg)(\?.*)?$")
            .use_loader("file-loader")
            .options(json!({
                "name": options.asset_path(&format!("img/[name]{hash}.[ext]")),
            }));
        cfg.rule("media")
            .test(r"\.(mp4|webm|ogg|mp3|wav|flac|aac)(\?.*)?$")
            .use_loader("url-loader")
            .options(inline("media"));
        cfg.rule("fonts")
            .test(r"\.(woff2?|eot|ttf|otf)(\?.*)?$")
            .use_loader("url-loader")
            .options(inline("fonts"));

        let pug = cfg.rule("pug");
        pug.test(r"\.pug$");
        pug.one_of("pug-embedded")
            .resource_query("template")
            .use_loader("pug-plain-loader");
        let template = pug.one_of("pug-template");
        template.use_loader("raw-loader");
        template.use_loader("pug-plain-loader");

        let shims = cfg.node_shims();
        shims.insert("setImmediate".to_string(), json!(false));
        for module in ["dgram", "fs", "net", "tls", "child_process"] {
            shims.insert(module.to_string(), json!("empty"));
        }

        cfg.plugin("process-env").use_plugin(
            "DefinePlugin",
            json!({"process.env": Value::Object(client_env)}),
        );
        cfg.plugin("case-sensitive-paths")
            .use_plugin("CaseSensitivePathsPlugin", Value::Null);
        cfg.plugin("friendly-errors")
            .use_plugin("FriendlyErrorsPlugin", Value::Null);
        Ok(())
    });
    Ok(())
}
