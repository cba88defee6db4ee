use std::{sync::Arc, time::Instant};

use lightbox_net::Net;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    config::LoadRequest,
    error::{LoadError, LoadResult},
    progress::ProgressReporter,
    strategy::{Fetched, LoadStrategy},
};

/// Ceiling for the elapsed-time ramp; the real completion event sets 100.
const RAMP_CAP: u64 = 95;

fn elapsed_ramp(elapsed: std::time::Duration, budget: std::time::Duration) -> u8 {
    let budget_ms = budget.as_millis().max(1);
    let pct = RAMP_CAP as u128 * elapsed.as_millis() / budget_ms;
    pct.min(RAMP_CAP as u128) as u8
}

/// Strategy 4: simulated degraded load. Last resort when
/// `allow_degraded_fallback` is set: synthesizes progress purely from
/// elapsed time while a raw buffered fetch runs with no byte feedback.
pub struct DegradedFallback {
    net: Arc<dyn Net>,
}

impl DegradedFallback {
    pub fn new(net: Arc<dyn Net>) -> Self {
        Self { net }
    }
}

#[async_trait::async_trait]
impl LoadStrategy for DegradedFallback {
    fn name(&self) -> &'static str {
        "degraded-fallback"
    }

    fn applies(&self, req: &LoadRequest) -> bool {
        req.config.allow_degraded_fallback
    }

    async fn attempt(
        &self,
        req: &LoadRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> LoadResult<Fetched> {
        let started = Instant::now();
        let fetch = self.net.get_bytes(req.url.clone());
        tokio::pin!(fetch);
        let mut interval = tokio::time::interval(req.config.poll_interval);

        loop {
            tokio::select! {
                () = cancel.cancelled() => return Err(LoadError::Cancelled),
                result = &mut fetch => {
                    let bytes = result?;
                    trace!(url = %req.url, len = bytes.len(), "degraded fetch complete");
                    return Ok(Fetched::Bytes(bytes));
                }
                _ = interval.tick() => {
                    progress.report(elapsed_ramp(started.elapsed(), req.config.timeout));
                }
            }
        }
    }
}
