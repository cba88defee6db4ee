use std::{fmt, sync::Arc};

use lightbox_core::{HandleStore, ResolvedHandle};
use lightbox_net::Net;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    config::LoadRequest,
    error::{LoadError, LoadResult},
    progress::ProgressReporter,
    strategies::{ChunkedStream, DegradedFallback, ElementHost, ElementProgress, StreamingProgress},
    strategy::{Fetched, LoadStrategy},
};

/// Executes loading strategies in fixed priority order, stopping at the
/// first success.
///
/// A strategy failure (timeout or network error) advances the chain; there
/// is no retry within a strategy. When the whole chain fails, the loader
/// re-runs it up to `config.retries` additional times, resetting reported
/// progress for each re-run. The final failure is
/// [`LoadError::AllStrategiesExhausted`] carrying the last underlying error.
pub struct ChainLoader {
    strategies: Vec<Arc<dyn LoadStrategy>>,
    handles: HandleStore,
}

impl ChainLoader {
    /// The platform-free chain: streaming, chunked, degraded.
    pub fn new(net: Arc<dyn Net>, handles: HandleStore) -> Self {
        Self {
            strategies: vec![
                Arc::new(StreamingProgress::new(Arc::clone(&net))),
                Arc::new(ChunkedStream::new(Arc::clone(&net))),
                Arc::new(DegradedFallback::new(net)),
            ],
            handles,
        }
    }

    /// The full chain, with the platform's element primitive in its slot
    /// between chunked streaming and the degraded fallback.
    pub fn with_element_host(
        net: Arc<dyn Net>,
        host: Arc<dyn ElementHost>,
        handles: HandleStore,
    ) -> Self {
        Self {
            strategies: vec![
                Arc::new(StreamingProgress::new(Arc::clone(&net))),
                Arc::new(ChunkedStream::new(Arc::clone(&net))),
                Arc::new(ElementProgress::new(host)),
                Arc::new(DegradedFallback::new(net)),
            ],
            handles,
        }
    }

    /// A custom chain. Order is priority order.
    pub fn from_strategies(strategies: Vec<Arc<dyn LoadStrategy>>, handles: HandleStore) -> Self {
        Self {
            strategies,
            handles,
        }
    }

    pub fn handles(&self) -> &HandleStore {
        &self.handles
    }

    /// Run the chain (with re-runs) for one request.
    ///
    /// Progress flows through `reporter`; `cancel` aborts the load at the
    /// next suspension point. On success the reporter is completed (100)
    /// before the handle is returned.
    pub async fn load(
        &self,
        req: &LoadRequest,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> LoadResult<ResolvedHandle> {
        let chain_runs = req.config.retries.saturating_add(1);
        let mut last: Option<LoadError> = None;

        for run in 0..chain_runs {
            if cancel.is_cancelled() {
                return Err(LoadError::Cancelled);
            }
            if run > 0 {
                debug!(run, url = %req.url, "re-running strategy chain");
                reporter.reset();
            }

            match self.run_chain(req, reporter, cancel).await {
                Ok(fetched) => {
                    let handle = self.resolve(req, fetched);
                    reporter.complete();
                    return Ok(handle);
                }
                Err(LoadError::Cancelled) => return Err(LoadError::Cancelled),
                Err(e) => last = Some(e),
            }
        }

        Err(LoadError::AllStrategiesExhausted {
            last: Box::new(last.unwrap_or_else(|| LoadError::network("no applicable strategy"))),
        })
    }

    async fn run_chain(
        &self,
        req: &LoadRequest,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> LoadResult<Fetched> {
        let mut last: Option<LoadError> = None;

        for strategy in &self.strategies {
            if cancel.is_cancelled() {
                return Err(LoadError::Cancelled);
            }
            if !strategy.applies(req) {
                trace!(strategy = strategy.name(), "strategy inapplicable, skipped");
                continue;
            }

            let attempt = strategy.attempt(req, reporter, cancel);
            match tokio::time::timeout(req.config.timeout, attempt).await {
                Ok(Ok(fetched)) => {
                    debug!(strategy = strategy.name(), url = %req.url, "strategy succeeded");
                    return Ok(fetched);
                }
                Ok(Err(LoadError::Cancelled)) => return Err(LoadError::Cancelled),
                Ok(Err(e)) => {
                    warn!(strategy = strategy.name(), error = %e, "strategy failed, advancing");
                    last = Some(e);
                }
                Err(_) => {
                    warn!(strategy = strategy.name(), "strategy timed out, advancing");
                    last = Some(LoadError::StrategyTimeout);
                }
            }
        }

        Err(last.unwrap_or_else(|| LoadError::network("no applicable strategy")))
    }

    fn resolve(&self, req: &LoadRequest, fetched: Fetched) -> ResolvedHandle {
        match fetched {
            Fetched::Streamed => ResolvedHandle::Remote(req.url.clone()),
            Fetched::Bytes(bytes) if req.config.produce_local_handle => {
                ResolvedHandle::Object(self.handles.create(bytes))
            }
            Fetched::Bytes(_) => ResolvedHandle::Remote(req.url.clone()),
        }
    }
}

impl fmt::Debug for ChainLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("ChainLoader")
            .field("strategies", &names)
            .field("outstanding_handles", &self.handles.outstanding())
            .finish()
    }
}
