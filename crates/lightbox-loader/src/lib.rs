#![forbid(unsafe_code)]

//! Strategy-chain media loader.
//!
//! Given a URL, [`ChainLoader`] tries an ordered list of loading strategies,
//! each producing progress events and a final [`ResolvedHandle`] or failure.
//! Strategies are declarative: a new technique is added by appending a
//! [`LoadStrategy`] to the chain, never by branching inside it.
//!
//! The loader knows nothing about UI state; adapters in `lightbox-viewer`
//! wrap it with lifecycle-safe, cancellable load operations.
//!
//! ```ignore
//! use lightbox_loader::{ChainLoader, LoadRequest, ProgressReporter};
//!
//! let loader = ChainLoader::new(net, HandleStore::new());
//! let reporter = ProgressReporter::new(sink, cancel.clone());
//! let handle = loader.load(&request, &reporter, &cancel).await?;
//! ```

mod chain;
mod config;
mod error;
mod progress;
mod strategy;
pub mod strategies;
pub mod testing;

pub use chain::ChainLoader;
pub use config::{LoadAttemptConfig, LoadRequest};
pub use error::{LoadError, LoadResult};
pub use progress::{ProgressReporter, ProgressSink};
pub use strategies::{ElementHost, ElementLoad, ElementPhase};
pub use strategy::{Fetched, LoadStrategy};

pub use lightbox_core::ResolvedHandle;
