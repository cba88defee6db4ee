use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use lightbox_core::{MediaDescriptor, MediaId};
use lightbox_loader::{
    ChainLoader, LoadAttemptConfig, LoadError, LoadRequest, ProgressReporter, ProgressSink,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::state::{LoadFailure, LoadState};

/// Lifecycle-safe load driver for one media item.
///
/// Wraps a single [`ChainLoader`] load with an observable [`LoadState`] and
/// the operations the viewer needs: start, abort, reset, retry, dispose.
/// Every state update is gated on the attempt's cancellation token and the
/// disposed flag, so a callback can never fire into a torn-down observer.
pub struct ItemLoader {
    descriptor: MediaDescriptor,
    loader: Arc<ChainLoader>,
    config: LoadAttemptConfig,
    state_tx: watch::Sender<LoadState>,
    /// Token of the attempt in flight, if any. Also serializes terminal
    /// state commits against `dispose`.
    attempt: Mutex<Option<CancellationToken>>,
    disposed: AtomicBool,
}

impl ItemLoader {
    pub fn new(
        descriptor: MediaDescriptor,
        loader: Arc<ChainLoader>,
        config: LoadAttemptConfig,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(LoadState::idle());
        Arc::new(Self {
            descriptor,
            loader,
            config,
            state_tx,
            attempt: Mutex::new(None),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn descriptor(&self) -> &MediaDescriptor {
        &self.descriptor
    }

    pub fn id(&self) -> &MediaId {
        &self.descriptor.id
    }

    /// Current state snapshot.
    pub fn state(&self) -> LoadState {
        self.state_tx.borrow().clone()
    }

    /// Observe state changes. The receiver sees every terminal transition.
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state_tx.subscribe()
    }

    /// Begin loading. No-op while an attempt is already in flight or after
    /// disposal. A fresh start supersedes (and releases) any previously
    /// resolved handle.
    pub fn start(self: &Arc<Self>) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        // The check, the token install and the loading transition share the
        // lock; two racing starts cannot both claim the attempt slot.
        let token = {
            let mut attempt = self.attempt.lock();
            if self.disposed.load(Ordering::Acquire) {
                return;
            }
            if self.state_tx.borrow().is_loading {
                trace!(id = %self.id(), "start ignored: attempt already in flight");
                return;
            }
            let token = CancellationToken::new();
            if let Some(stale) = attempt.replace(token.clone()) {
                stale.cancel();
            }
            if let Some(handle) = self.state_tx.borrow().handle.clone() {
                handle.release();
            }
            self.state_tx.send_replace(LoadState::loading());
            token
        };
        trace!(id = %self.id(), url = %self.descriptor.url, "load started");

        let sink = self.progress_sink(token.clone());
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let reporter = ProgressReporter::new(sink, token.clone());
            let req = LoadRequest::new(this.descriptor.url.clone(), this.descriptor.kind)
                .with_config(this.config.clone());

            let result = tokio::select! {
                () = token.cancelled() => Err(LoadError::Cancelled),
                result = this.loader.load(&req, &reporter, &token) => result,
            };
            this.commit(&token, result);
        });
    }

    /// Cancel the attempt in flight, if any. Leaves no error behind: an
    /// abort is a lifecycle event, not a failure. Any resolved handle is
    /// retained for reuse.
    pub fn abort(&self) {
        let token = self.attempt.lock().take();
        if let Some(token) = token {
            token.cancel();
            trace!(id = %self.id(), "load aborted");
        }
        self.state_tx.send_modify(|s| s.is_loading = false);
    }

    /// Abort and return to the idle state, releasing any resolved handle.
    pub fn reset(&self) {
        self.abort();
        if let Some(handle) = self.state_tx.borrow().handle.clone() {
            handle.release();
        }
        self.state_tx.send_replace(LoadState::idle());
    }

    /// Reset and start a fresh attempt.
    pub fn retry(self: &Arc<Self>) {
        self.reset();
        self.start();
    }

    /// Tear the adapter down: cancel any attempt, release any handle, and
    /// refuse all further starts and state updates. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        // The lock orders this against a terminal commit racing us: either
        // the commit saw `disposed` and released its own handle, or it
        // published the handle before we got the lock and we release it.
        let mut attempt = self.attempt.lock();
        if let Some(token) = attempt.take() {
            token.cancel();
        }
        if let Some(handle) = self.state_tx.borrow().handle.clone() {
            handle.release();
        }
        self.state_tx.send_modify(|s| {
            s.is_loading = false;
            s.handle = None;
        });
        debug!(id = %self.id(), "adapter disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn progress_sink(self: &Arc<Self>, token: CancellationToken) -> ProgressSink {
        let this = Arc::clone(self);
        Arc::new(move |pct| {
            if token.is_cancelled() || this.disposed.load(Ordering::Acquire) {
                return;
            }
            this.state_tx.send_modify(|s| {
                if s.is_loading && pct > s.progress_percent {
                    s.progress_percent = pct;
                }
            });
        })
    }

    /// Publish the attempt's outcome, unless the attempt was cancelled or
    /// the adapter disposed while it ran.
    fn commit(
        &self,
        token: &CancellationToken,
        result: Result<lightbox_core::ResolvedHandle, LoadError>,
    ) {
        let attempt = self.attempt.lock();
        if token.is_cancelled() || self.disposed.load(Ordering::Acquire) {
            drop(attempt);
            // A handle resolved in the race window must not leak.
            if let Ok(handle) = result {
                handle.release();
            }
            return;
        }

        match result {
            Ok(handle) => {
                trace!(id = %self.id(), local = handle.is_local(), "load complete");
                self.state_tx.send_replace(LoadState {
                    is_loading: false,
                    progress_percent: 100,
                    error: None,
                    handle: Some(handle),
                });
            }
            // Cancellation without a cancelled token cannot happen; treat
            // it like an abort either way.
            Err(LoadError::Cancelled) => {
                self.state_tx.send_modify(|s| s.is_loading = false);
            }
            Err(err) => {
                debug!(id = %self.id(), error = %err, "load failed");
                let failure = LoadFailure::from(&err);
                self.state_tx.send_modify(|s| {
                    s.is_loading = false;
                    s.error = Some(failure);
                    s.handle = None;
                });
            }
        }
    }
}

impl std::fmt::Debug for ItemLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemLoader")
            .field("id", &self.descriptor.id)
            .field("state", &*self.state_tx.borrow())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
