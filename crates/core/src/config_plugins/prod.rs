//! The prod layer: minification, deterministic module ids and source-map
//! policy. Only active when NODE_ENV is production.

use crate::error::Result;
use crate::options::ProjectOptions;
use crate::plugin::PluginApi;
use serde_json::json;

pub fn apply(api: &mut PluginApi<'_>, _options: &ProjectOptions) -> Result<()> {
    api.chain_config(|cfg| {
        if cfg.env("NODE_ENV") != Some("production") {
            return Ok(());
        }
        let options = cfg.options().clone();

        cfg.mode("production");
        if options.production_source_map {
            cfg.devtool("source-map");
        } else {
            cfg.devtool(false);
        }

        // keep chunk hashes stable across builds
        cfg.plugin("hash-module-ids")
            .use_plugin("HashedModuleIdsPlugin", json!({"hashDigest": "hex"}));

        cfg.optimization().minimize = Some(true);
        cfg.optimization().minimizer("terser").use_plugin(
            "TerserPlugin",
            json!({
                "parallel": options.parallel,
                "sourceMap": options.production_source_map,
                "terserOptions": {
                    "compress": {
                        "arrows": false,
                        "collapse_vars": false,
                        "comparisons": false,
                        "computed_props": false,
                        "hoist_funs": false,
                        "hoist_props": false,
                        "inline": false,
                        "loops": false,
                        "negate_iife": false,
                        "properties": false,
                        "reduce_funcs": false,
                        "reduce_vars": false,
                        "switches": false,
                        "toplevel": false,
                        "typeofs": false,
                        "booleans": true,
                        "if_return": true,
                        "sequences": true,
                        "unused": true,
                        "conditionals": true,
                        "dead_code": true,
                        "evaluate": true,
                    },
                    "mangle": {"safari10": true},
                },
            }),
        );
        Ok(())
    });
    Ok(())
}
