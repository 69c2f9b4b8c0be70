//! Ready-made loader constructors for common fetch shapes.
//!
//! These are adapters at the loader's own boundary; the core pipeline only
//! ever sees the [`LangLoader`] contract.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::loader::SharedLoader;

/// Loader that reads `{dir}/{code}.json` and parses it as a language tree.
///
/// The file is read per invocation; there is no caching across cycles.
pub fn from_dir(dir: impl Into<PathBuf>) -> SharedLoader {
    let dir = dir.into();
    Arc::new(move |code: String| {
        let path = dir.join(format!("{code}.json"));
        async move {
            debug!(path = %path.display(), "reading language file");
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read language file {}", path.display()))?;
            let tree: Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("invalid JSON in language file {}", path.display()))?;
            Ok(tree)
        }
    })
}

/// Adapt a page-keyed fetcher into a loader.
///
/// The fetcher receives the fixed page name instead of the language code;
/// resolving the code still happens once per cycle like for any other
/// loader, the adapted fetcher just does not consume it.
pub fn for_page<F, Fut>(page: impl Into<String>, fetch: F) -> SharedLoader
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
{
    let page = page.into();
    Arc::new(move |_code: String| fetch(page.clone()))
}
