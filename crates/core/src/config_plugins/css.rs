//! The css layer: style rules for plain css and scss, extracted into files
//! for production-like envs and served inline otherwise.

use crate::error::Result;
use crate::merge::merge;
use crate::options::ProjectOptions;
use crate::plugin::PluginApi;
use serde_json::json;

pub fn apply(api: &mut PluginApi<'_>, _options: &ProjectOptions) -> Result<()> {
    api.chain_config(|cfg| {
        let options = cfg.options().clone();
        let extract = options.extract_css(cfg.env("NODE_ENV"));
        let source_map = options.css.source_map.unwrap_or(false);
        let loader_options = options.css.loader_options.clone().unwrap_or_default();

        let css_loader_options = json!({
            "sourceMap": source_map,
            "importLoaders": 2,
        });
        let style_loader = if extract { "extract-css-loader" } else { "style-loader" };

        let css = cfg.rule("css");
        css.test(r"\.css$");
        css.use_loader(style_loader);
        css.use_loader("css-loader").options(css_loader_options.clone());

        let scss = cfg.rule("scss");
        scss.test(r"\.scss$");
        scss.use_loader(style_loader);
        scss.use_loader("css-loader").options(css_loader_options);
        scss.use_loader("sass-loader").options(merge(
            json!({"sourceMap": source_map}),
            loader_options.get("scss").cloned().unwrap_or_else(|| json!({})),
        ));

        if extract {
            let hash = if options.filename_hashing && cfg.env("NODE_ENV") == Some("production") {
                ".[contenthash:8]"
            } else {
                ""
            };
            cfg.plugin("extract-css").use_plugin(
                "ExtractCssPlugin",
                json!({
                    "filename": options.asset_path(&format!("css/[name]{hash}.css")),
                    "chunkFilename": options.asset_path(&format!("css/[name]{hash}.css")),
                }),
            );
        }
        Ok(())
    });
    Ok(())
}
