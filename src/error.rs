use thiserror::Error;

/// Fatal errors for a single load cycle.
///
/// Every variant ends the cycle: there are no retries and no fallback to
/// stale or default data. Caller-supplied resolvers and loaders report
/// their own failures as `anyhow::Error`, which is carried here as the
/// source so the owner can inspect the underlying cause.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No usable loader was supplied for this cycle.
    ///
    /// Surfaced before the language-code resolver is ever invoked, so a
    /// misconfigured cycle fails early instead of producing an empty tree.
    #[error("no loader was supplied for this load cycle")]
    Configuration,

    /// The language-code resolver failed or rejected.
    #[error("language code resolution failed")]
    Resolution(#[source] anyhow::Error),

    /// A loader failed. `index` is the loader's position in the spec
    /// (always 0 on the single-loader path).
    ///
    /// One failing loader fails the whole cycle; results from loaders
    /// that did succeed are discarded, never partially merged.
    #[error("language loader {index} failed")]
    Loader {
        index: usize,
        #[source]
        source: anyhow::Error,
    },
}
