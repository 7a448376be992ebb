//! Deep-merge primitives for configuration objects.
//!
//! Two merge flavors share one rule set: objects merge key-by-key
//! recursively, arrays and scalars replace wholesale. `merge` lets the
//! overlay win (raw mutations over the flattened chain output);
//! `defaults_deep` is the same operation with user options as the overlay
//! over hard-coded defaults.

use serde_json::Value;

/// Key under which a flattened rule carries its human-readable name path.
///
/// The metadata is out-of-band: structural merges that replace a rule list
/// discard it, and [`clone_rule_names`] re-attaches it afterwards.
pub const RULE_NAMES_KEY: &str = "__ruleNames";

/// Deep-merge `overlay` into `base`. Overlay wins at every leaf.
pub fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge(existing.take(), value)
                    }
                    _ => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Merge user-supplied options over defaults: the user value wins at every
/// leaf, objects merge recursively, arrays and scalars replace.
pub fn defaults_deep(user: Value, defaults: Value) -> Value {
    merge(defaults, user)
}

/// Re-attach rule-name metadata from a pre-merge rule list onto the
/// corresponding post-merge list, by index alignment, recursing into
/// nested `oneOf` groups.
///
/// This is a heuristic: a raw mutation that reorders or removes rules can
/// silently mis-attach names. Introspection tooling accepts that trade-off.
pub fn clone_rule_names(to: Option<&mut Value>, from: Option<&Value>) {
    let (Some(Value::Array(to)), Some(Value::Array(from))) = (to, from) else {
        return;
    };
    for (i, pre) in from.iter().enumerate() {
        let Some(post) = to.get_mut(i) else {
            continue;
        };
        if let Some(names) = pre.get(RULE_NAMES_KEY) {
            if let Some(obj) = post.as_object_mut() {
                obj.insert(RULE_NAMES_KEY.to_string(), names.clone());
            }
        }
        clone_rule_names(post.get_mut("oneOf"), pre.get("oneOf"));
    }
}
