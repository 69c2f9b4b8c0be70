//! Scoping transforms applied to freshly imported data: shred (extract a
//! named sub-tree) and alias (re-wrap under a new top-level key).

use serde_json::{Map, Value};
use tracing::debug;

/// Apply shred and alias to the imported raw tree.
///
/// The input is never mutated; the returned value is built from a
/// structural copy. Shred always precedes alias. A shred key absent from
/// the raw data is a soft condition: the working value becomes
/// [`Value::Null`] and flows on, it does not fail the cycle. Callers that
/// depend on the shredded branch must ensure the key exists.
pub fn prepare(raw: &Value, shred: Option<&str>, alias: Option<&str>) -> Value {
    let mut data = raw.clone();

    if let Some(key) = shred {
        data = match data {
            Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
            _ => Value::Null,
        };
        if data.is_null() {
            debug!(key, "shred key absent in loaded data");
        }
    }

    if let Some(key) = alias {
        let mut wrapped = Map::new();
        wrapped.insert(key.to_string(), data);
        data = Value::Object(wrapped);
    }

    data
}
