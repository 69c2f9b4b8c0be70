//! Deep merge of the prepared tree with an optional parent override tree.

use serde_json::Value;

/// Merge the prepared tree with the parent-supplied override tree.
///
/// With no parent the prepared tree passes through structurally unchanged.
/// Otherwise the merge is deep and recursive: for every path present in
/// `parent`, the parent's value wins; where both sides hold an object the
/// merge recurses instead of overwriting wholesale; keys present only in
/// `loaded` survive. Scalar and array conflicts are replaced outright,
/// arrays are never merged element-wise.
///
/// This is what lets an enclosing scope override strings supplied by a
/// dynamically loaded inner scope without the loader knowing about it.
pub fn merge(loaded: &Value, parent: Option<&Value>) -> Value {
    match parent {
        None => loaded.clone(),
        Some(parent) => deep_merge(loaded, parent),
    }
}

fn deep_merge(loaded: &Value, parent: &Value) -> Value {
    match (loaded, parent) {
        (Value::Object(loaded_map), Value::Object(parent_map)) => {
            let mut out = loaded_map.clone();
            for (key, parent_value) in parent_map {
                let merged = match out.get(key) {
                    Some(loaded_value) => deep_merge(loaded_value, parent_value),
                    None => parent_value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        // Any non-object pairing: parent replaces loaded outright.
        _ => parent.clone(),
    }
}
