use std::{
    fmt,
    sync::Arc,
    sync::atomic::{AtomicU8, Ordering},
};

use tokio_util::sync::CancellationToken;

/// Callback receiving each newly reached progress percent.
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

/// Monotonic progress sink for a single load attempt.
///
/// Clamps to `0..=100`, drops non-increasing reports, and goes quiet once
/// the attempt's cancellation token fires so a disposed observer is never
/// called again. `reset()` starts a fresh attempt at 0.
pub struct ProgressReporter {
    last: AtomicU8,
    sink: ProgressSink,
    cancel: CancellationToken,
}

impl ProgressReporter {
    pub fn new(sink: ProgressSink, cancel: CancellationToken) -> Self {
        Self {
            last: AtomicU8::new(0),
            sink,
            cancel,
        }
    }

    /// Reporter that discards everything. Test and warm-up plumbing.
    pub fn discard(cancel: CancellationToken) -> Self {
        Self::new(Arc::new(|_| {}), cancel)
    }

    /// Report a percent value. Forwarded only if it advances the attempt.
    pub fn report(&self, percent: u8) {
        let pct = percent.min(100);
        if self.cancel.is_cancelled() {
            return;
        }
        let prev = self.last.fetch_max(pct, Ordering::AcqRel);
        if pct > prev {
            (self.sink)(pct);
        }
    }

    /// Force completion (100).
    pub fn complete(&self) {
        self.report(100);
    }

    /// Begin a new attempt: the next report starts from 0 again.
    pub fn reset(&self) {
        self.last.store(0, Ordering::Release);
    }

    /// Last percent reported within the current attempt.
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.last())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
