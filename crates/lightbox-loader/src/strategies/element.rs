use std::sync::Arc;

use lightbox_core::MediaKind;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use url::Url;

use crate::{
    config::LoadRequest,
    error::{LoadError, LoadResult},
    progress::ProgressReporter,
    strategy::{Fetched, LoadStrategy},
};

/// Synthetic ramp ceiling while the element is still pending.
const RAMP_CAP: u8 = 97;

/// Coarse phase reported by a platform media primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementPhase {
    Pending,
    Loaded,
    Failed,
}

/// Platform hook that loads media through a native element primitive
/// (image/video element, texture upload, decoder warm-up). The core never
/// touches the primitive itself; it only polls the phase.
pub trait ElementHost: Send + Sync {
    fn begin(&self, url: &Url, kind: MediaKind) -> Box<dyn ElementLoad>;
}

/// One in-flight element load.
///
/// Dropping the value must stop any observation the host set up, even if
/// the underlying element keeps loading in the background.
pub trait ElementLoad: Send {
    fn phase(&self) -> ElementPhase;

    /// Stop observing early. Called on explicit aborts; drop covers the rest.
    fn cancel(&mut self);
}

/// Strategy 3: native-element progress.
///
/// The primitive exposes coarse or absent progress, so the strategy
/// synthesizes a monotone ramp of small random increments (capped below
/// 100) on a fixed polling interval, and reports completion only when the
/// element signals its own load event.
pub struct ElementProgress {
    host: Arc<dyn ElementHost>,
}

impl ElementProgress {
    pub fn new(host: Arc<dyn ElementHost>) -> Self {
        Self { host }
    }
}

fn bump(current: u8) -> u8 {
    current.saturating_add(fastrand::u8(2..=6)).min(RAMP_CAP)
}

#[async_trait::async_trait]
impl LoadStrategy for ElementProgress {
    fn name(&self) -> &'static str {
        "element-progress"
    }

    async fn attempt(
        &self,
        req: &LoadRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> LoadResult<Fetched> {
        let mut load = self.host.begin(&req.url, req.kind);
        let mut interval = tokio::time::interval(req.config.poll_interval);
        let mut synthetic: u8 = 0;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    load.cancel();
                    return Err(LoadError::Cancelled);
                }
                _ = interval.tick() => match load.phase() {
                    ElementPhase::Loaded => {
                        trace!(url = %req.url, "element signalled load");
                        return Ok(Fetched::Streamed);
                    }
                    ElementPhase::Failed => {
                        load.cancel();
                        return Err(LoadError::network("element load failed"));
                    }
                    ElementPhase::Pending => {
                        synthetic = bump(synthetic);
                        progress.report(synthetic);
                    }
                },
            }
        }
    }
}
