//! The load-cycle controller: single-flight orchestration of import,
//! prepare, and merge, with abandonment guarding every completion.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::importer::import_lang_data;
use crate::loader::{LangCodeResolver, LoaderSpec};
use crate::merge::merge;
use crate::prepare::prepare;

/// Receives the final merged tree, at most once per successful cycle.
///
/// This is the boundary to whatever mechanism makes the tree available to
/// downstream consumers; the controller only promises that `deliver` is
/// called once on success and never on failure or after abandonment.
pub trait LangSink: Send + Sync {
    fn deliver(&self, tree: Value);
}

impl<F> LangSink for F
where
    F: Fn(Value) + Send + Sync,
{
    fn deliver(&self, tree: Value) {
        self(tree)
    }
}

/// Inputs held fixed for the lifetime of one load cycle.
pub struct CycleConfig {
    resolver: Arc<dyn LangCodeResolver>,
    loader: Option<LoaderSpec>,
    shred: Option<String>,
    alias: Option<String>,
    parent: Option<Value>,
}

impl CycleConfig {
    pub fn new(resolver: Arc<dyn LangCodeResolver>) -> Self {
        Self {
            resolver,
            loader: None,
            shred: None,
            alias: None,
            parent: None,
        }
    }

    /// Set the loader spec. Leaving it unset makes the cycle fail with a
    /// configuration error on start.
    pub fn with_loader(mut self, loader: LoaderSpec) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Extract only this top-level key from the loaded data.
    pub fn with_shred(mut self, key: impl Into<String>) -> Self {
        self.shred = Some(key.into());
        self
    }

    /// Re-wrap the (possibly shredded) data under this key.
    pub fn with_alias(mut self, key: impl Into<String>) -> Self {
        self.alias = Some(key.into());
        self
    }

    /// Override data from the enclosing scope; wins over loaded data in
    /// the final deep merge.
    pub fn with_parent(mut self, parent: Value) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Observable cycle states. `Loaded` and `Failed` are terminal; the
/// controller never retries or reloads on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Loading,
    Loaded,
    Failed,
}

struct CycleInner {
    state: CycleState,
    abandoned: bool,
    lang: Option<Value>,
}

/// One load cycle: resolve, load, prepare, merge, deliver.
///
/// `start` is single-flight: overlapping calls while a load is in flight,
/// or after the cycle reached a terminal state, are no-ops. An abandoned
/// cycle discards any in-flight completion instead of applying it.
pub struct LoadCycle {
    config: CycleConfig,
    sink: Arc<dyn LangSink>,
    inner: Mutex<CycleInner>,
}

impl LoadCycle {
    pub fn new(config: CycleConfig, sink: Arc<dyn LangSink>) -> Self {
        Self {
            config,
            sink,
            inner: Mutex::new(CycleInner {
                state: CycleState::Idle,
                abandoned: false,
                lang: None,
            }),
        }
    }

    /// Run the cycle once.
    ///
    /// The first call moves the cycle from `Idle` to `Loading` and runs
    /// the pipeline; any call arriving while the cycle is not `Idle`
    /// returns `Ok(())` without touching anything. On success the merged
    /// tree is stored, delivered to the sink, and the cycle ends in
    /// `Loaded`. On failure the error is reported once via `warn!`, the
    /// cycle ends in `Failed`, and the error is returned to the owner.
    pub async fn start(&self) -> Result<(), LoadError> {
        {
            let mut inner = self.lock_inner();
            if inner.abandoned || inner.state != CycleState::Idle {
                debug!(state = ?inner.state, "load cycle start ignored");
                return Ok(());
            }
            inner.state = CycleState::Loading;
        }

        let result = self.run_pipeline().await;

        let mut inner = self.lock_inner();
        if inner.abandoned {
            debug!("load cycle abandoned in flight, discarding result");
            return Ok(());
        }

        match result {
            Ok(tree) => {
                inner.lang = Some(tree.clone());
                inner.state = CycleState::Loaded;
                drop(inner);
                self.sink.deliver(tree);
                Ok(())
            }
            Err(err) => {
                inner.state = CycleState::Failed;
                warn!(error = %err, "load cycle failed");
                Err(err)
            }
        }
    }

    /// Mark the cycle as abandoned: its owning scope is gone.
    ///
    /// An import already in flight runs to completion (there is no
    /// cancellation signal to the loaders) but its result is discarded and
    /// the sink is never invoked.
    pub fn abandon(&self) {
        let mut inner = self.lock_inner();
        inner.abandoned = true;
        inner.lang = None;
    }

    /// Current state of the cycle.
    pub fn state(&self) -> CycleState {
        self.lock_inner().state
    }

    /// The merged tree, available only once the cycle is `Loaded`.
    ///
    /// `Loading` and `Failed` are indistinguishable here: both read as
    /// "not yet available".
    pub fn lang(&self) -> Option<Value> {
        self.lock_inner().lang.clone()
    }

    async fn run_pipeline(&self) -> Result<Value, LoadError> {
        let raw = import_lang_data(self.config.loader.as_ref(), self.config.resolver.as_ref())
            .await?;
        let prepared = prepare(&raw, self.config.shred.as_deref(), self.config.alias.as_deref());
        Ok(merge(&prepared, self.config.parent.as_ref()))
    }

    fn lock_inner(&self) -> MutexGuard<'_, CycleInner> {
        // The lock is only held across state reads and writes, never
        // across an await, so poisoning means a panic mid-update.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::loader::shared;
    use serde_json::json;

    fn fixed_resolver(code: &str) -> Arc<dyn LangCodeResolver> {
        let code = code.to_string();
        Arc::new(move || {
            let code = code.clone();
            async move { anyhow::Ok(code) }
        })
    }

    fn counting_sink() -> (Arc<dyn LangSink>, Arc<AtomicUsize>) {
        let deliveries = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&deliveries);
        let sink: Arc<dyn LangSink> = Arc::new(move |_tree: Value| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (sink, deliveries)
    }

    #[tokio::test]
    async fn test_successful_cycle_reaches_loaded() {
        let config = CycleConfig::new(fixed_resolver("en"))
            .with_loader(LoaderSpec::single(|_code: String| async {
                anyhow::Ok(json!({ "hello": "Hello" }))
            }));
        let (sink, deliveries) = counting_sink();
        let cycle = LoadCycle::new(config, sink);

        cycle.start().await.expect("cycle should succeed");

        assert_eq!(cycle.state(), CycleState::Loaded);
        assert_eq!(cycle.lang(), Some(json!({ "hello": "Hello" })));
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_pipeline_shred_alias_parent() {
        let config = CycleConfig::new(fixed_resolver("en"))
            .with_loader(LoaderSpec::single(|_code: String| async {
                anyhow::Ok(json!({ "page": { "title": "Home", "footer": "v1" } }))
            }))
            .with_shred("page")
            .with_alias("ns")
            .with_parent(json!({ "ns": { "title": "Start" } }));
        let (sink, _) = counting_sink();
        let cycle = LoadCycle::new(config, sink);

        cycle.start().await.expect("cycle should succeed");

        assert_eq!(
            cycle.lang(),
            Some(json!({ "ns": { "title": "Start", "footer": "v1" } }))
        );
    }

    #[tokio::test]
    async fn test_failed_cycle_exposes_no_tree_and_skips_sink() {
        let config = CycleConfig::new(fixed_resolver("en")).with_loader(LoaderSpec::single(
            |_code: String| async { anyhow::bail!("fetch failed") },
        ));
        let (sink, deliveries) = counting_sink();
        let cycle = LoadCycle::new(config, sink);

        let err = cycle.start().await.expect_err("cycle should fail");

        assert!(matches!(err, LoadError::Loader { .. }));
        assert_eq!(cycle.state(), CycleState::Failed);
        assert_eq!(cycle.lang(), None);
        assert_eq!(deliveries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_loader_fails_cycle() {
        let config = CycleConfig::new(fixed_resolver("en"));
        let (sink, deliveries) = counting_sink();
        let cycle = LoadCycle::new(config, sink);

        let err = cycle.start().await.expect_err("cycle should fail");

        assert!(matches!(err, LoadError::Configuration));
        assert_eq!(cycle.state(), CycleState::Failed);
        assert_eq!(deliveries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_is_noop_after_loaded() {
        let loads = Arc::new(AtomicUsize::new(0));
        let config = {
            let loads = Arc::clone(&loads);
            CycleConfig::new(fixed_resolver("en")).with_loader(LoaderSpec::single(
                move |_code: String| {
                    loads.fetch_add(1, Ordering::SeqCst);
                    async { anyhow::Ok(json!({})) }
                },
            ))
        };
        let (sink, deliveries) = counting_sink();
        let cycle = LoadCycle::new(config, sink);

        cycle.start().await.expect("first start should succeed");
        cycle.start().await.expect("second start should be a no-op");

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_cycle_does_not_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let config = {
            let attempts = Arc::clone(&attempts);
            CycleConfig::new(fixed_resolver("en")).with_loader(LoaderSpec::single(
                move |_code: String| {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { anyhow::bail!("still down") }
                },
            ))
        };
        let (sink, _) = counting_sink();
        let cycle = LoadCycle::new(config, sink);

        let _ = cycle.start().await;
        cycle.start().await.expect("restart of failed cycle is a no-op");

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(cycle.state(), CycleState::Failed);
    }

    #[tokio::test]
    async fn test_abandoned_cycle_never_starts() {
        let loads = Arc::new(AtomicUsize::new(0));
        let config = {
            let loads = Arc::clone(&loads);
            CycleConfig::new(fixed_resolver("en")).with_loader(LoaderSpec::single(
                move |_code: String| {
                    loads.fetch_add(1, Ordering::SeqCst);
                    async { anyhow::Ok(json!({})) }
                },
            ))
        };
        let (sink, deliveries) = counting_sink();
        let cycle = LoadCycle::new(config, sink);

        cycle.abandon();
        cycle.start().await.expect("start after abandon is a no-op");

        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(deliveries.load(Ordering::SeqCst), 0);
        assert_eq!(cycle.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn test_abandon_in_flight_discards_result() {
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let release_rx = Arc::new(Mutex::new(Some(release_rx)));

        let config = CycleConfig::new(fixed_resolver("en")).with_loader(LoaderSpec::single(
            move |_code: String| {
                let release_rx = Arc::clone(&release_rx);
                async move {
                    let rx = release_rx
                        .lock()
                        .unwrap()
                        .take()
                        .expect("loader invoked once");
                    let _ = rx.await;
                    anyhow::Ok(json!({ "late": true }))
                }
            },
        ));
        let (sink, deliveries) = counting_sink();
        let cycle = Arc::new(LoadCycle::new(config, sink));

        let in_flight = {
            let cycle = Arc::clone(&cycle);
            tokio::spawn(async move { cycle.start().await })
        };

        // Wait until the load is actually in flight, then tear down.
        while cycle.state() != CycleState::Loading {
            tokio::task::yield_now().await;
        }
        cycle.abandon();
        release_tx.send(()).expect("loader should still be waiting");

        in_flight
            .await
            .expect("task should not panic")
            .expect("abandoned completion reads as Ok");

        assert_eq!(deliveries.load(Ordering::SeqCst), 0);
        assert_eq!(cycle.lang(), None);
    }

    #[tokio::test]
    async fn test_overlapping_starts_are_single_flight() {
        let loads = Arc::new(AtomicUsize::new(0));
        let config = {
            let loads = Arc::clone(&loads);
            CycleConfig::new(fixed_resolver("en")).with_loader(LoaderSpec::single(
                move |_code: String| {
                    loads.fetch_add(1, Ordering::SeqCst);
                    async {
                        tokio::task::yield_now().await;
                        anyhow::Ok(json!({ "once": true }))
                    }
                },
            ))
        };
        let (sink, deliveries) = counting_sink();
        let cycle = Arc::new(LoadCycle::new(config, sink));

        let first = {
            let cycle = Arc::clone(&cycle);
            tokio::spawn(async move { cycle.start().await })
        };
        let second = {
            let cycle = Arc::clone(&cycle);
            tokio::spawn(async move { cycle.start().await })
        };

        first.await.expect("no panic").expect("start ok");
        second.await.expect("no panic").expect("start ok");

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
        assert_eq!(cycle.state(), CycleState::Loaded);
    }
}
