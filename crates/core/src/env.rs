//! Environment file loading with mode-aware precedence.
//!
//! Up to four files are consulted per run, highest priority first:
//! `.env.<mode>.local`, `.env.<mode>`, `.env.local`, `.env`. A key is only
//! applied if nothing of higher priority (an earlier file, or the real
//! environment the map was seeded from) set it already. Missing files are
//! skipped silently; malformed files are logged and skipped.

use dotenv::Error as DotenvError;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Candidate env file names for a mode, highest priority first.
pub fn env_file_candidates(mode: Option<&str>) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(mode) = mode {
        candidates.push(format!(".env.{mode}.local"));
        candidates.push(format!(".env.{mode}"));
    }
    candidates.push(".env.local".to_string());
    candidates.push(".env".to_string());
    candidates
}

/// Load env files from `context` into `env`, then default NODE_ENV from the
/// mode if nothing set it.
pub fn load_env(context: &Path, mode: Option<&str>, env: &mut BTreeMap<String, String>) {
    for candidate in env_file_candidates(mode) {
        load_env_file(&context.join(candidate), env);
    }

    // NODE_ENV defaults to "development" unless the mode is production or
    // test; values from env files or the real environment take priority.
    if let Some(mode) = mode {
        if !env.contains_key("NODE_ENV") {
            let default_node_env = if mode == "production" || mode == "test" {
                "production"
            } else {
                "development"
            };
            env.insert("NODE_ENV".to_string(), default_node_env.to_string());
        }
    }
}

fn load_env_file(path: &Path, env: &mut BTreeMap<String, String>) {
    let iter = match dotenv::from_path_iter(path) {
        Ok(iter) => iter,
        Err(DotenvError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!("Failed to read env file {}: {}", path.display(), e);
            return;
        }
    };

    for item in iter {
        match item {
            Ok((key, value)) => {
                // first setter wins
                env.entry(key).or_insert(value);
            }
            Err(e) => {
                warn!("Skipping malformed env file {}: {}", path.display(), e);
                return;
            }
        }
    }
    debug!("Loaded env file {}", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(dir: &TempDir, mode: Option<&str>) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        load_env(dir.path(), mode, &mut env);
        env
    }

    #[test]
    fn test_candidate_order_with_mode() {
        assert_eq!(
            env_file_candidates(Some("production")),
            [".env.production.local", ".env.production", ".env.local", ".env"]
        );
        assert_eq!(env_file_candidates(None), [".env.local", ".env"]);
    }

    #[test]
    fn test_mode_local_file_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env.production.local"), "K=prod-local\n").unwrap();
        std::fs::write(dir.path().join(".env.production"), "K=prod\n").unwrap();
        std::fs::write(dir.path().join(".env.local"), "K=local\n").unwrap();
        std::fs::write(dir.path().join(".env"), "K=base\nONLY_BASE=1\n").unwrap();

        let env = load(&dir, Some("production"));
        assert_eq!(env.get("K").map(String::as_str), Some("prod-local"));
        // lower-priority files still contribute keys nothing else set
        assert_eq!(env.get("ONLY_BASE").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_real_environment_wins_over_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env"), "K=from-file\n").unwrap();

        let mut env = BTreeMap::new();
        env.insert("K".to_string(), "from-process".to_string());
        load_env(dir.path(), None, &mut env);
        assert_eq!(env.get("K").map(String::as_str), Some("from-process"));
    }

    #[test]
    fn test_missing_files_are_skipped_silently() {
        let dir = TempDir::new().unwrap();
        let env = load(&dir, Some("development"));
        assert_eq!(env.get("NODE_ENV").map(String::as_str), Some("development"));
    }

    #[test]
    fn test_malformed_file_is_non_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env"), "GOOD=1\n%%% not an assignment\n").unwrap();
        std::fs::write(dir.path().join(".env.local"), "OTHER=2\n").unwrap();

        let env = load(&dir, None);
        // the malformed file is abandoned, the rest of the run continues
        assert_eq!(env.get("OTHER").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_node_env_defaults_from_mode() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            load(&dir, Some("production")).get("NODE_ENV").map(String::as_str),
            Some("production")
        );
        assert_eq!(
            load(&dir, Some("test")).get("NODE_ENV").map(String::as_str),
            Some("production")
        );
        assert_eq!(
            load(&dir, Some("development")).get("NODE_ENV").map(String::as_str),
            Some("development")
        );
        assert!(load(&dir, None).get("NODE_ENV").is_none());
    }

    #[test]
    fn test_env_file_does_not_override_earlier_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env.test"), "NODE_ENV=test\n").unwrap();
        let env = load(&dir, Some("test"));
        // file value beats the mode-derived default
        assert_eq!(env.get("NODE_ENV").map(String::as_str), Some("test"));
    }
}
