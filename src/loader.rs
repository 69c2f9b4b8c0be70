//! Loader and resolver interfaces, and the strategy decision over the
//! shape of the supplied loader spec.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;

/// Resolves the current language code.
///
/// Called at most once per load cycle; every loader in that cycle observes
/// the code this call produced. Failure is propagated, never retried.
pub trait LangCodeResolver: Send + Sync {
    fn resolve(&self) -> BoxFuture<'static, Result<String>>;
}

impl<F, Fut> LangCodeResolver for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    fn resolve(&self) -> BoxFuture<'static, Result<String>> {
        Box::pin(self())
    }
}

/// Fetches raw language data for a language code.
///
/// The result may be wrapped in a module-like envelope (an object with a
/// single `"default"` key); the importer unwraps it before use, so
/// implementations are free to return either form.
pub trait LangLoader: Send + Sync {
    fn load(&self, code: &str) -> BoxFuture<'static, Result<Value>>;
}

impl<F, Fut> LangLoader for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn load(&self, code: &str) -> BoxFuture<'static, Result<Value>> {
        Box::pin(self(code.to_string()))
    }
}

/// A loader shared across the cycle machinery.
pub type SharedLoader = Arc<dyn LangLoader>;

/// Wrap a loader (typically an async closure) for use in a [`LoaderSpec`].
pub fn shared<L>(loader: L) -> SharedLoader
where
    L: LangLoader + 'static,
{
    Arc::new(loader)
}

/// The loader shape supplied for one cycle: a single loader or an ordered
/// sequence of loaders. Absence is expressed as `Option::None` at the
/// cycle-config level.
#[derive(Clone)]
pub enum LoaderSpec {
    /// One loader; its (unwrapped) result is the raw tree.
    Single(SharedLoader),
    /// An ordered sequence, all invoked concurrently with the same code
    /// and combined by top-level overlay in sequence order. An empty
    /// sequence is legal and combines to an empty object.
    Multi(Vec<SharedLoader>),
}

impl LoaderSpec {
    /// Spec for a single loader.
    pub fn single<L>(loader: L) -> Self
    where
        L: LangLoader + 'static,
    {
        Self::Single(Arc::new(loader))
    }

    /// Spec for an ordered sequence of loaders.
    pub fn multi<I>(loaders: I) -> Self
    where
        I: IntoIterator<Item = SharedLoader>,
    {
        Self::Multi(loaders.into_iter().collect())
    }
}

impl std::fmt::Debug for LoaderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(_) => f.write_str("LoaderSpec::Single"),
            Self::Multi(loaders) => write!(f, "LoaderSpec::Multi({})", loaders.len()),
        }
    }
}

/// The load strategy decided from the loader spec's shape.
///
/// Decided once at cycle start, not re-checked per call. `NoLoader` always
/// fails the import with a configuration error.
pub enum Strategy<'a> {
    Single(&'a SharedLoader),
    Multi(&'a [SharedLoader]),
    NoLoader,
}

impl<'a> Strategy<'a> {
    /// Pure decision over the spec's shape; no side effects.
    pub fn select(spec: Option<&'a LoaderSpec>) -> Self {
        match spec {
            Some(LoaderSpec::Single(loader)) => Self::Single(loader),
            Some(LoaderSpec::Multi(loaders)) => Self::Multi(loaders),
            None => Self::NoLoader,
        }
    }
}
