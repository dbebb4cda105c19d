//! Deep merge of skeleton values.
//!
//! Used to layer option tiers and to apply a file store's override over the
//! loaded document. Sequences are replaced entirely, not concatenated.

use serde_json::Value;

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Mappings merge recursively; keys keep their position in `base`, new
///   keys are appended in overlay order
/// - Sequences and scalars in the overlay replace the base
/// - A null overlay keeps the base (null means "not specified")
///
/// # Example
/// ```
/// use serde_json::json;
/// use hotmarkup::config::deep_merge;
///
/// let base = json!({"db": {"host": "localhost", "port": 5432}, "tags": ["a"]});
/// let overlay = json!({"db": {"port": 6432}, "tags": ["b"]});
/// assert_eq!(
///     deep_merge(base, overlay),
///     json!({"db": {"host": "localhost", "port": 6432}, "tags": ["b"]})
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.get_mut(&key) {
                    Some(slot) => deep_merge(slot.take(), overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge values in order, later ones taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
