//! Hand-rolled fakes for loader and viewer tests.
//!
//! No mock framework: scripted fakes keep failure injection explicit and
//! let tests count attempts per URL.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use lightbox_core::MediaKind;
use lightbox_net::{Net, NetError, RemoteBody};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    config::LoadRequest,
    error::{LoadError, LoadResult},
    progress::ProgressReporter,
    strategies::{ElementHost, ElementLoad, ElementPhase},
    strategy::{Fetched, LoadStrategy},
};

// ============================================================================
// FakeNet
// ============================================================================

#[derive(Clone)]
enum Route {
    /// Serve `bytes` in `chunk`-sized pieces; advertise a total or not.
    Body {
        bytes: Bytes,
        chunk: usize,
        advertise_len: bool,
    },
    /// Fail the request immediately.
    Fail,
    /// Never respond (for timeout tests).
    Stall,
}

/// In-memory `Net` implementation serving scripted routes.
#[derive(Clone, Default)]
pub struct FakeNet {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeNet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &Url, bytes: impl Into<Bytes>) -> &Self {
        self.serve_chunked(url, bytes, 8, true)
    }

    pub fn serve_chunked(
        &self,
        url: &Url,
        bytes: impl Into<Bytes>,
        chunk: usize,
        advertise_len: bool,
    ) -> &Self {
        self.routes.lock().insert(
            url.to_string(),
            Route::Body {
                bytes: bytes.into(),
                chunk: chunk.max(1),
                advertise_len,
            },
        );
        self
    }

    pub fn fail(&self, url: &Url) -> &Self {
        self.routes.lock().insert(url.to_string(), Route::Fail);
        self
    }

    pub fn stall(&self, url: &Url) -> &Self {
        self.routes.lock().insert(url.to_string(), Route::Stall);
        self
    }

    /// How many requests (fetch or get_bytes) hit a URL.
    pub fn hits(&self, url: &Url) -> usize {
        self.hits.lock().get(url.as_str()).copied().unwrap_or(0)
    }

    fn route(&self, url: &Url) -> Route {
        *self.hits.lock().entry(url.to_string()).or_insert(0) += 1;
        self.routes
            .lock()
            .get(url.as_str())
            .cloned()
            .unwrap_or(Route::Fail)
    }
}

impl std::fmt::Debug for FakeNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeNet")
            .field("routes", &self.routes.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Net for FakeNet {
    async fn fetch(&self, url: Url) -> Result<RemoteBody, NetError> {
        match self.route(&url) {
            Route::Body {
                bytes,
                chunk,
                advertise_len,
            } => {
                let total = advertise_len.then(|| bytes.len() as u64);
                let chunks: Vec<Result<Bytes, NetError>> = bytes
                    .chunks(chunk)
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect();
                Ok(RemoteBody {
                    total,
                    stream: Box::pin(futures::stream::iter(chunks)),
                })
            }
            Route::Fail => Err(NetError::http("fake route failure")),
            Route::Stall => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn get_bytes(&self, url: Url) -> Result<Bytes, NetError> {
        match self.route(&url) {
            Route::Body { bytes, .. } => Ok(bytes),
            Route::Fail => Err(NetError::http("fake route failure")),
            Route::Stall => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

// ============================================================================
// ScriptedStrategy
// ============================================================================

/// One scripted attempt outcome.
pub enum ScriptedOutcome {
    Succeed(Fetched),
    Fail(LoadError),
    /// Never complete; the chain's per-strategy timeout reaps it.
    Hang,
}

/// Strategy that replays a script of outcomes and records every attempt.
///
/// When the script runs out the last outcome repeats, so "always succeed"
/// and "always fail" need a single entry.
pub struct ScriptedStrategy {
    name: &'static str,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    last_repeats: bool,
    attempts: AtomicUsize,
    attempted_urls: Mutex<Vec<Url>>,
    /// Progress values emitted before each outcome resolves.
    reports: Vec<u8>,
}

impl ScriptedStrategy {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            script: Mutex::new(VecDeque::new()),
            last_repeats: true,
            attempts: AtomicUsize::new(0),
            attempted_urls: Mutex::new(Vec::new()),
            reports: Vec::new(),
        }
    }

    pub fn succeeding(name: &'static str, bytes: impl Into<Bytes>) -> Arc<Self> {
        Arc::new(Self::new(name).then(ScriptedOutcome::Succeed(Fetched::Bytes(bytes.into()))))
    }

    pub fn streamed(name: &'static str) -> Arc<Self> {
        Arc::new(Self::new(name).then(ScriptedOutcome::Succeed(Fetched::Streamed)))
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self::new(name).then(ScriptedOutcome::Fail(LoadError::network("scripted"))))
    }

    pub fn hanging(name: &'static str) -> Arc<Self> {
        Arc::new(Self::new(name).then(ScriptedOutcome::Hang))
    }

    pub fn then(self, outcome: ScriptedOutcome) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    pub fn with_reports(mut self, reports: Vec<u8>) -> Self {
        self.reports = reports;
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn attempts_for(&self, url: &Url) -> usize {
        self.attempted_urls
            .lock()
            .iter()
            .filter(|u| *u == url)
            .count()
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        let mut script = self.script.lock();
        if script.len() > 1 || !self.last_repeats {
            script
                .pop_front()
                .unwrap_or(ScriptedOutcome::Fail(LoadError::network("script exhausted")))
        } else {
            match script.front() {
                Some(ScriptedOutcome::Succeed(f)) => ScriptedOutcome::Succeed(f.clone()),
                Some(ScriptedOutcome::Fail(e)) => ScriptedOutcome::Fail(e.clone()),
                Some(ScriptedOutcome::Hang) => ScriptedOutcome::Hang,
                None => ScriptedOutcome::Fail(LoadError::network("script exhausted")),
            }
        }
    }
}

#[async_trait]
impl LoadStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn attempt(
        &self,
        req: &LoadRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> LoadResult<Fetched> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        self.attempted_urls.lock().push(req.url.clone());

        for pct in &self.reports {
            progress.report(*pct);
        }

        match self.next_outcome() {
            ScriptedOutcome::Succeed(fetched) => Ok(fetched),
            ScriptedOutcome::Fail(err) => Err(err),
            ScriptedOutcome::Hang => {
                cancel.cancelled().await;
                Err(LoadError::Cancelled)
            }
        }
    }
}

// ============================================================================
// GateStrategy
// ============================================================================

/// Strategy that blocks until its gate opens, then succeeds. Lets tests
/// hold a load in the `is_loading` state deliberately.
pub struct GateStrategy {
    open: tokio::sync::watch::Receiver<bool>,
    attempts: AtomicUsize,
}

/// Opens the matching [`GateStrategy`].
#[derive(Debug)]
pub struct Gate {
    tx: tokio::sync::watch::Sender<bool>,
}

impl Gate {
    pub fn open(&self) {
        let _ = self.tx.send(true);
    }
}

impl GateStrategy {
    pub fn new() -> (Arc<Self>, Gate) {
        let (tx, rx) = tokio::sync::watch::channel(false);
        (
            Arc::new(Self {
                open: rx,
                attempts: AtomicUsize::new(0),
            }),
            Gate { tx },
        )
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }
}

#[async_trait]
impl LoadStrategy for GateStrategy {
    fn name(&self) -> &'static str {
        "gate"
    }

    async fn attempt(
        &self,
        _req: &LoadRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> LoadResult<Fetched> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        progress.report(10);

        let mut open = self.open.clone();
        tokio::select! {
            () = cancel.cancelled() => Err(LoadError::Cancelled),
            result = open.wait_for(|v| *v) => match result {
                Ok(_) => Ok(Fetched::Streamed),
                Err(_) => Err(LoadError::network("gate dropped")),
            },
        }
    }
}

// ============================================================================
// ScriptedElementHost
// ============================================================================

/// Element host whose loads stay `Pending` for a fixed number of polls and
/// then resolve. `polls_until_loaded = None` means the element fails on the
/// first poll.
#[derive(Debug)]
pub struct ScriptedElementHost {
    polls_until_loaded: Option<u32>,
}

impl ScriptedElementHost {
    pub fn loads_after(polls: u32) -> Arc<Self> {
        Arc::new(Self {
            polls_until_loaded: Some(polls),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            polls_until_loaded: None,
        })
    }
}

struct ScriptedElementLoad {
    remaining: Mutex<Option<u32>>,
}

impl ElementLoad for ScriptedElementLoad {
    fn phase(&self) -> ElementPhase {
        let mut remaining = self.remaining.lock();
        match remaining.as_mut() {
            None => ElementPhase::Failed,
            Some(0) => ElementPhase::Loaded,
            Some(n) => {
                *n -= 1;
                ElementPhase::Pending
            }
        }
    }

    fn cancel(&mut self) {}
}

impl ElementHost for ScriptedElementHost {
    fn begin(&self, _url: &Url, _kind: MediaKind) -> Box<dyn ElementLoad> {
        Box::new(ScriptedElementLoad {
            remaining: Mutex::new(self.polls_until_loaded),
        })
    }
}
