//! Environment values exposed to the built client bundle.

use crate::options::ProjectOptions;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const CLIENT_PREFIX: &str = "APP_";

/// Collect the env values a bundle may see: every `APP_*` key, `NODE_ENV`,
/// and `BASE_URL` derived from the deployment base path.
pub fn resolve_client_env(
    options: &ProjectOptions,
    env: &BTreeMap<String, String>,
) -> Map<String, Value> {
    let mut client = Map::new();
    for (key, value) in env {
        if key.starts_with(CLIENT_PREFIX) || key == "NODE_ENV" {
            client.insert(key.clone(), Value::String(value.clone()));
        }
    }
    client.insert(
        "BASE_URL".to_string(),
        Value::String(options.public_path.clone()),
    );
    client
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_prefixed_keys_and_node_env_pass_through() {
        let mut env = BTreeMap::new();
        env.insert("APP_API_URL".to_string(), "https://api".to_string());
        env.insert("NODE_ENV".to_string(), "production".to_string());
        env.insert("SECRET_TOKEN".to_string(), "hunter2".to_string());

        let client = resolve_client_env(&ProjectOptions::default(), &env);
        assert_eq!(client["APP_API_URL"], "https://api");
        assert_eq!(client["NODE_ENV"], "production");
        assert!(!client.contains_key("SECRET_TOKEN"));
        assert_eq!(client["BASE_URL"], "/");
    }
}
