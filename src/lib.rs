//! Async localization-tree loading, scoping, and merge pipeline.
//!
//! `langtree` turns caller-supplied loaders and a language-code resolver
//! into a single merged language tree for one scope of consumers:
//!
//! 1. the language code is resolved once per load cycle;
//! 2. raw data is fetched through one loader or a concurrent set of
//!    loaders, all observing the same code;
//! 3. the raw tree is optionally shredded (a sub-tree extracted) and
//!    aliased (re-wrapped under a new key);
//! 4. an optional parent override tree is deep-merged on top;
//! 5. the result is delivered to a sink exactly once.
//!
//! The [`LoadCycle`] controller owns one such cycle: starts are
//! single-flight, completed cycles never reload, and an abandoned cycle
//! discards its in-flight result instead of applying it.
//!
//! Trees are `serde_json::Value`s and opaque to the pipeline; every stage
//! returns a newly built value and never mutates its input. The crate does
//! no caching, no retries, and no locale negotiation.

mod cycle;
mod error;
mod importer;
mod loader;
pub mod loaders;
mod merge;
mod prepare;

pub use cycle::{CycleConfig, CycleState, LangSink, LoadCycle};
pub use error::LoadError;
pub use importer::import_lang_data;
pub use loader::{shared, LangCodeResolver, LangLoader, LoaderSpec, SharedLoader, Strategy};
pub use merge::merge;
pub use prepare::prepare;
