//! The transpile layer: runs project javascript through the transpile
//! loader with a persistent, fingerprinted cache.

use crate::error::Result;
use crate::options::{CONFIG_FILE, ProjectOptions};
use crate::plugin::PluginApi;
use serde_json::json;

pub fn apply(api: &mut PluginApi<'_>, options: &ProjectOptions) -> Result<()> {
    let cache = api.gen_cache_config(
        "transpile",
        json!({"transpileDependencies": options.transpile_dependencies}),
        &[CONFIG_FILE, ".browserslistrc"],
    )?;
    let context = api.context().to_path_buf();

    api.chain_config(move |cfg| {
        let options = cfg.options().clone();
        let rule = cfg.rule("js");
        rule.test(r"\.m?jsx?$");
        rule.include(context.join("src").to_string_lossy().into_owned());
        // opted-in dependencies are transpiled too, everything else under
        // node_modules is shipped as-is
        for dependency in &options.transpile_dependencies {
            rule.include(
                context
                    .join("node_modules")
                    .join(dependency)
                    .to_string_lossy()
                    .into_owned(),
            );
        }
        rule.use_loader("transpile-loader").options(json!({
            "cacheDirectory": cache.cache_directory.to_string_lossy(),
            "cacheIdentifier": cache.cache_identifier,
            "parallel": options.parallel,
        }));
        Ok(())
    });
    Ok(())
}
