use std::sync::Arc;

use futures::StreamExt;
use lightbox_net::Net;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    config::LoadRequest,
    error::{LoadError, LoadResult},
    progress::ProgressReporter,
    strategy::{Fetched, LoadStrategy},
};

/// Ceiling for the synthetic estimate while the total is unknown. Staying
/// below 100 avoids a false completion signal before the final chunk.
const UNKNOWN_TOTAL_CAP: u64 = 95;

/// Bytes at which the synthetic estimate reaches half of its cap.
const ESTIMATE_HALFWAY_BYTES: u64 = 512 * 1024;

fn percent_of(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = ((loaded as f64 / total as f64) * 100.0).round() as u64;
    pct.min(100) as u8
}

/// Asymptotic ramp toward (but never reaching) `UNKNOWN_TOTAL_CAP`.
fn synthetic_estimate(loaded: u64) -> u8 {
    (UNKNOWN_TOTAL_CAP as u128 * loaded as u128 / (loaded as u128 + ESTIMATE_HALFWAY_BYTES as u128))
        as u8
}

/// Strategy 1: streaming with native byte-level progress.
///
/// Requires the server to advertise a total size; otherwise fails fast so
/// the chain can fall through to [`ChunkedStream`].
pub struct StreamingProgress {
    net: Arc<dyn Net>,
}

impl StreamingProgress {
    pub fn new(net: Arc<dyn Net>) -> Self {
        Self { net }
    }
}

#[async_trait::async_trait]
impl LoadStrategy for StreamingProgress {
    fn name(&self) -> &'static str {
        "streaming-progress"
    }

    async fn attempt(
        &self,
        req: &LoadRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> LoadResult<Fetched> {
        let body = self.net.fetch(req.url.clone()).await?;
        let Some(total) = body.total else {
            return Err(LoadError::network("total size unknown"));
        };

        let mut stream = body.stream;
        let mut buf = Vec::with_capacity(total as usize);
        let mut loaded: u64 = 0;

        loop {
            let chunk = tokio::select! {
                () = cancel.cancelled() => return Err(LoadError::Cancelled),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk?;
            loaded += chunk.len() as u64;
            buf.extend_from_slice(&chunk);
            progress.report(percent_of(loaded, total));
        }

        trace!(url = %req.url, loaded, total, "streaming fetch complete");
        Ok(Fetched::Bytes(buf.into()))
    }
}

/// Strategy 2: streaming via readable chunks.
///
/// Works with or without a known total. With one, reports real percent;
/// without one, reports a bounded synthetic estimate capped below 100 so
/// the UI never sees completion before the final chunk arrives.
pub struct ChunkedStream {
    net: Arc<dyn Net>,
}

impl ChunkedStream {
    pub fn new(net: Arc<dyn Net>) -> Self {
        Self { net }
    }
}

#[async_trait::async_trait]
impl LoadStrategy for ChunkedStream {
    fn name(&self) -> &'static str {
        "chunked-stream"
    }

    async fn attempt(
        &self,
        req: &LoadRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> LoadResult<Fetched> {
        let body = self.net.fetch(req.url.clone()).await?;
        let total = body.total;
        let mut stream = body.stream;
        let mut buf = Vec::new();
        let mut loaded: u64 = 0;

        loop {
            let chunk = tokio::select! {
                () = cancel.cancelled() => return Err(LoadError::Cancelled),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk?;
            loaded += chunk.len() as u64;
            buf.extend_from_slice(&chunk);
            let pct = match total {
                Some(total) => percent_of(loaded, total),
                None => synthetic_estimate(loaded),
            };
            progress.report(pct);
        }

        trace!(url = %req.url, loaded, ?total, "chunked fetch complete");
        Ok(Fetched::Bytes(buf.into()))
    }
}
