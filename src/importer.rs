//! Raw language-data import: one language-code resolution per cycle, then
//! strategy execution over the supplied loaders.

use futures::future::try_join_all;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::loader::{LangCodeResolver, LoaderSpec, SharedLoader, Strategy};

/// Import raw language data for one load cycle.
///
/// The language code is resolved exactly once, before any loader runs, and
/// the same code is passed to every loader in the cycle. A missing loader
/// spec fails with [`LoadError::Configuration`] without invoking the
/// resolver at all.
///
/// Single-loader path: one invocation, result unwrapped from any
/// module-`default` envelope. Multi-loader path: all loaders started
/// concurrently, fail-fast, their unwrapped results combined by shallow
/// top-level overlay in sequence order (later entries win per top-level
/// key). An empty sequence yields an empty object.
pub async fn import_lang_data(
    spec: Option<&LoaderSpec>,
    resolver: &dyn LangCodeResolver,
) -> Result<Value, LoadError> {
    match Strategy::select(spec) {
        Strategy::NoLoader => Err(LoadError::Configuration),
        Strategy::Single(loader) => {
            let code = resolve_code(resolver, "single").await?;
            let raw = loader
                .load(&code)
                .await
                .map_err(|source| LoadError::Loader { index: 0, source })?;
            Ok(unwrap_default_envelope(raw))
        }
        Strategy::Multi(loaders) => {
            let code = resolve_code(resolver, "multi").await?;
            let results = load_all(loaders, &code).await?;
            Ok(overlay(results))
        }
    }
}

/// The one language-code resolution of the cycle; runs only after the
/// strategy decision ruled out the no-loader case.
async fn resolve_code(
    resolver: &dyn LangCodeResolver,
    strategy: &'static str,
) -> Result<String, LoadError> {
    let code = resolver.resolve().await.map_err(LoadError::Resolution)?;
    debug!(code = %code, strategy, "language code resolved");
    Ok(code)
}

/// Invoke every loader concurrently with the same code. One failure fails
/// the whole set; successful siblings are discarded.
async fn load_all(loaders: &[SharedLoader], code: &str) -> Result<Vec<Value>, LoadError> {
    try_join_all(loaders.iter().enumerate().map(|(index, loader)| {
        let future = loader.load(code);
        async move { future.await.map_err(|source| LoadError::Loader { index, source }) }
    }))
    .await
}

/// Combine ordered loader results by top-level overlay: later entries
/// override earlier ones per top-level key. Nested conflicts are not deep
/// merged here; layering is wholesale per namespace.
fn overlay(results: Vec<Value>) -> Value {
    let mut combined = Map::new();

    for (index, result) in results.into_iter().enumerate() {
        match unwrap_default_envelope(result) {
            Value::Object(map) => combined.extend(map),
            Value::Null => {}
            other => {
                warn!(
                    index,
                    kind = value_kind(&other),
                    "skipping non-object layer in multi-loader combination"
                );
            }
        }
    }

    Value::Object(combined)
}

/// Unwrap a module-like envelope: an object whose only key is `"default"`
/// stands for its payload. Anything else passes through untouched.
fn unwrap_default_envelope(raw: Value) -> Value {
    match raw {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("default") => {
            map.remove("default").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
