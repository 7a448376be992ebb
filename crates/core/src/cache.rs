//! Cache-key derivation for downstream caching layers.
//!
//! The identifier must change whenever a toolchain version, a fingerprint
//! input or a watched config file changes, and must be byte-identical for
//! identical inputs so caches survive across processes.

use crate::error::Result;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Options handed to a caching loader or plugin.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheConfig {
    pub cache_directory: PathBuf,
    pub cache_identifier: String,
}

/// Derive a deterministic cache configuration.
///
/// The identifier is a content hash over the forgepack version, the current
/// NODE_ENV, the caller-provided fingerprint inputs, and the contents of
/// every watched file that exists (missing files are skipped, so a file
/// appearing later also changes the key).
pub fn gen_cache_config(
    context: &Path,
    env: &BTreeMap<String, String>,
    id: &str,
    partial_identifier: Value,
    config_dependencies: &[&str],
) -> Result<CacheConfig> {
    let mut fingerprint = Map::new();
    fingerprint.insert(
        "forgepack".to_string(),
        json!(env!("CARGO_PKG_VERSION")),
    );
    fingerprint.insert(
        "env".to_string(),
        json!(env.get("NODE_ENV").map(String::as_str).unwrap_or_default()),
    );
    fingerprint.insert("partial".to_string(), partial_identifier);

    let mut files = Vec::new();
    for dependency in config_dependencies {
        let path = context.join(dependency);
        if path.is_file() {
            let contents = std::fs::read(&path)?;
            files.push(json!({
                "file": dependency,
                "hash": format!("{:x}", md5::compute(&contents)),
            }));
        }
    }
    fingerprint.insert("configFiles".to_string(), Value::Array(files));

    let serialized = serde_json::to_string(&Value::Object(fingerprint))?;
    let cache_identifier = format!("{:x}", md5::compute(serialized.as_bytes()));

    Ok(CacheConfig {
        cache_directory: context.join(".forgepack").join("cache").join(id),
        cache_identifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env() -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("NODE_ENV".to_string(), "development".to_string());
        env
    }

    #[test]
    fn test_identical_inputs_yield_identical_key() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("forgepack.config.json"), "{}").unwrap();

        let a = gen_cache_config(
            dir.path(),
            &env(),
            "transpile",
            json!({"loader": "1.2.3"}),
            &["forgepack.config.json"],
        )
        .unwrap();
        let b = gen_cache_config(
            dir.path(),
            &env(),
            "transpile",
            json!({"loader": "1.2.3"}),
            &["forgepack.config.json"],
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_change_changes_key() {
        let dir = TempDir::new().unwrap();
        let a = gen_cache_config(dir.path(), &env(), "t", json!({"v": "1"}), &[]).unwrap();
        let b = gen_cache_config(dir.path(), &env(), "t", json!({"v": "2"}), &[]).unwrap();
        assert_ne!(a.cache_identifier, b.cache_identifier);
    }

    #[test]
    fn test_watched_file_change_changes_key() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("forgepack.config.json");
        std::fs::write(&config, r#"{"outputDir": "dist"}"#).unwrap();
        let a = gen_cache_config(dir.path(), &env(), "t", json!({}), &["forgepack.config.json"])
            .unwrap();

        std::fs::write(&config, r#"{"outputDir": "build"}"#).unwrap();
        let b = gen_cache_config(dir.path(), &env(), "t", json!({}), &["forgepack.config.json"])
            .unwrap();
        assert_ne!(a.cache_identifier, b.cache_identifier);
    }

    #[test]
    fn test_missing_watched_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let cache = gen_cache_config(dir.path(), &env(), "t", json!({}), &["nope.json"]).unwrap();
        assert!(!cache.cache_identifier.is_empty());
        assert!(cache.cache_directory.ends_with(".forgepack/cache/t"));
    }
}
