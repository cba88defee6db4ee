use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use lightbox_core::{HandleStore, MediaDescriptor, MediaId};
use lightbox_loader::{ChainLoader, LoadAttemptConfig};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::{
    adapter::ItemLoader,
    error::ViewerError,
    input::NavCommand,
    state::LoadState,
};

/// Offsets that make up the prefetch window, in warm-up priority order.
const WINDOW_OFFSETS: [i64; 5] = [0, 1, -1, 2, -2];

/// How many navigation steps an adapter may sit outside the window before
/// it is evicted.
const EVICTION_GRACE_STEPS: u32 = 1;

/// Where the viewer is in its presentation lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session; nothing to render.
    Closed,
    /// First item of a fresh session is loading.
    Loading,
    /// Navigation happened; the outgoing item is stale and the incoming
    /// one has not reached a terminal state yet.
    Transitioning,
    /// The current item is renderable.
    Idle,
    /// The current item's load failed; the UI shows the failure and may
    /// offer a retry.
    Error,
}

struct Session {
    items: Vec<MediaDescriptor>,
    current: usize,
    /// Distinguishes this session from any earlier one; monitors spawned
    /// for a replaced session compare against it and stand down.
    epoch: u64,
    /// Bumped on every foreground change; stale monitors compare against
    /// it and stand down.
    generation: u64,
    adapters: HashMap<MediaId, Arc<ItemLoader>>,
    /// Items whose background warm-up already completed.
    completed_prefetch: HashSet<MediaId>,
    /// Consecutive navigation steps each adapter has spent outside the
    /// prefetch window.
    steps_outside: HashMap<MediaId, u32>,
}

impl Session {
    fn adapter_for(
        &mut self,
        index: usize,
        loader: &Arc<ChainLoader>,
        config: &LoadAttemptConfig,
    ) -> Arc<ItemLoader> {
        let descriptor = self.items[index].clone();
        self.adapters
            .entry(descriptor.id.clone())
            .or_insert_with(|| ItemLoader::new(descriptor, Arc::clone(loader), config.clone()))
            .clone()
    }

    fn current_id(&self) -> &MediaId {
        &self.items[self.current].id
    }

    /// Advance eviction bookkeeping after a navigation and collect the
    /// adapters that have overstayed outside the window.
    fn step_eviction(&mut self) -> Vec<Arc<ItemLoader>> {
        let window: HashSet<MediaId> = prefetch_window(self.current, self.items.len())
            .into_iter()
            .map(|i| self.items[i].id.clone())
            .collect();

        // Anything back inside the window sheds its counter.
        self.steps_outside.retain(|id, _| !window.contains(id));

        let outside: Vec<MediaId> = self
            .adapters
            .keys()
            .filter(|id| !window.contains(*id))
            .cloned()
            .collect();

        let mut evicted = Vec::new();
        for id in outside {
            let steps = self.steps_outside.entry(id.clone()).or_insert(0);
            *steps += 1;
            if *steps > EVICTION_GRACE_STEPS {
                if let Some(adapter) = self.adapters.remove(&id) {
                    trace!(%id, "evicting adapter outside prefetch window");
                    evicted.push(adapter);
                }
                self.completed_prefetch.remove(&id);
                self.steps_outside.remove(&id);
            }
        }
        evicted
    }
}

/// The indices the orchestrator keeps warm around `current`, deduplicated,
/// current first.
fn prefetch_window(current: usize, len: usize) -> Vec<usize> {
    let mut window = Vec::with_capacity(WINDOW_OFFSETS.len());
    if len == 0 {
        return window;
    }
    for offset in WINDOW_OFFSETS {
        let index = (current as i64 + offset).rem_euclid(len as i64) as usize;
        if !window.contains(&index) {
            window.push(index);
        }
    }
    window
}

/// Viewer navigation orchestrator.
///
/// Owns the ordered media sequence and the cursor. Navigation wraps at both
/// ends, cancels the outgoing foreground load, reuses already-resolved
/// items, keeps the prefetch window warm in the background and evicts
/// adapters that drift out of range. `close` releases every handle the
/// session produced.
pub struct Viewer {
    loader: Arc<ChainLoader>,
    config: LoadAttemptConfig,
    phase_tx: watch::Sender<SessionPhase>,
    session: Mutex<Option<Session>>,
    epochs: AtomicU64,
}

impl Viewer {
    pub fn new(loader: Arc<ChainLoader>, config: LoadAttemptConfig) -> Arc<Self> {
        let (phase_tx, _) = watch::channel(SessionPhase::Closed);
        Arc::new(Self {
            loader,
            config,
            phase_tx,
            session: Mutex::new(None),
            epochs: AtomicU64::new(0),
        })
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase_tx.borrow()
    }

    /// Observe phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.session.lock().as_ref().map(|s| s.current)
    }

    /// Load state of the current item, if a session is open.
    pub fn current_state(&self) -> Option<LoadState> {
        let slot = self.session.lock();
        let session = slot.as_ref()?;
        session
            .adapters
            .get(session.current_id())
            .map(|a| a.state())
    }

    /// Whether prev/next navigation is meaningful (more than one item).
    pub fn has_navigation(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| s.items.len() > 1)
    }

    pub fn item_count(&self) -> usize {
        self.session.lock().as_ref().map_or(0, |s| s.items.len())
    }

    /// The store backing locally materialized handles.
    pub fn handles(&self) -> &HandleStore {
        self.loader.handles()
    }

    /// Open a session over `items` starting at `start_index`.
    ///
    /// An empty sequence is a no-op; a prior session is closed first.
    pub fn open(
        self: &Arc<Self>,
        items: Vec<MediaDescriptor>,
        start_index: usize,
    ) -> Result<(), ViewerError> {
        if items.is_empty() {
            debug!("open with no items, ignoring");
            return Ok(());
        }
        if start_index >= items.len() {
            return Err(ViewerError::InvalidIndex {
                index: start_index,
                len: items.len(),
            });
        }
        self.close();
        debug!(items = items.len(), start_index, "opening viewer session");

        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed) + 1;
        let foreground = {
            let mut slot = self.session.lock();
            let mut session = Session {
                items,
                current: start_index,
                epoch,
                generation: 0,
                adapters: HashMap::new(),
                completed_prefetch: HashSet::new(),
                steps_outside: HashMap::new(),
            };
            let foreground = session.adapter_for(start_index, &self.loader, &self.config);
            *slot = Some(session);
            foreground
        };

        self.phase_tx.send_replace(SessionPhase::Loading);
        foreground.start();
        self.monitor_foreground(foreground, epoch, 0);
        self.warm_prefetch();
        Ok(())
    }

    /// Move the cursor to `index`.
    ///
    /// Same-index navigation is a no-op. Otherwise the outgoing load (if
    /// still in flight) is aborted before the incoming item starts; a
    /// previously resolved incoming item renders without a fresh load.
    pub fn navigate_to(self: &Arc<Self>, index: usize) -> Result<(), ViewerError> {
        struct Move {
            outgoing: Option<Arc<ItemLoader>>,
            incoming: Arc<ItemLoader>,
            evicted: Vec<Arc<ItemLoader>>,
            epoch: u64,
            generation: u64,
        }

        let step = {
            let mut slot = self.session.lock();
            let Some(session) = slot.as_mut() else {
                return Ok(());
            };
            if index >= session.items.len() {
                return Err(ViewerError::InvalidIndex {
                    index,
                    len: session.items.len(),
                });
            }
            if index == session.current {
                trace!(index, "navigation to current index ignored");
                return Ok(());
            }

            session.generation += 1;
            let outgoing = session.adapters.get(session.current_id()).cloned();
            let incoming = session.adapter_for(index, &self.loader, &self.config);
            session.current = index;
            let evicted = session.step_eviction();
            Move {
                outgoing,
                incoming,
                evicted,
                epoch: session.epoch,
                generation: session.generation,
            }
        };

        debug!(index, "navigating");
        self.phase_tx.send_replace(SessionPhase::Transitioning);

        // The outgoing item is hidden from this instant. Abort only an
        // in-flight load; a resolved handle stays cached for revisits.
        if let Some(outgoing) = step.outgoing {
            if outgoing.state().is_loading {
                outgoing.abort();
            }
        }

        let incoming_state = step.incoming.state();
        if !incoming_state.is_complete() && !incoming_state.is_loading {
            step.incoming.start();
        }
        for adapter in step.evicted {
            adapter.dispose();
        }

        self.monitor_foreground(step.incoming, step.epoch, step.generation);
        self.warm_prefetch();
        Ok(())
    }

    /// Navigate forward, wrapping past the last item.
    pub fn next(self: &Arc<Self>) -> Result<(), ViewerError> {
        self.step(1)
    }

    /// Navigate backward, wrapping past the first item.
    pub fn previous(self: &Arc<Self>) -> Result<(), ViewerError> {
        self.step(-1)
    }

    fn step(self: &Arc<Self>, delta: i64) -> Result<(), ViewerError> {
        let target = {
            let slot = self.session.lock();
            let Some(session) = slot.as_ref() else {
                return Ok(());
            };
            (session.current as i64 + delta).rem_euclid(session.items.len() as i64) as usize
        };
        self.navigate_to(target)
    }

    /// Apply a mapped input command.
    pub fn apply(self: &Arc<Self>, command: NavCommand) -> Result<(), ViewerError> {
        match command {
            NavCommand::Next => self.next(),
            NavCommand::Previous => self.previous(),
            NavCommand::Close => {
                self.close();
                Ok(())
            }
            NavCommand::JumpTo(index) => self.navigate_to(index),
        }
    }

    /// Restart the current item's load after a failure.
    pub fn retry_current(self: &Arc<Self>) {
        let (adapter, epoch, generation) = {
            let mut slot = self.session.lock();
            let Some(session) = slot.as_mut() else {
                return;
            };
            session.generation += 1;
            let adapter = session.adapter_for(session.current, &self.loader, &self.config);
            (adapter, session.epoch, session.generation)
        };

        debug!(id = %adapter.id(), "retrying current item");
        self.phase_tx.send_replace(SessionPhase::Loading);
        adapter.retry();
        self.monitor_foreground(adapter, epoch, generation);
    }

    /// Tear the session down: dispose every adapter (cancelling in-flight
    /// loads and releasing every resolved handle). Idempotent.
    pub fn close(&self) {
        let session = self.session.lock().take();
        let Some(session) = session else {
            return;
        };
        debug!(adapters = session.adapters.len(), "closing viewer session");
        for adapter in session.adapters.values() {
            adapter.dispose();
        }
        self.phase_tx.send_replace(SessionPhase::Closed);
    }

    /// Watch the foreground adapter until it settles, then move the phase
    /// out of loading/transitioning. A newer navigation (higher
    /// generation) supersedes this monitor.
    fn monitor_foreground(
        self: &Arc<Self>,
        adapter: Arc<ItemLoader>,
        epoch: u64,
        generation: u64,
    ) {
        let viewer = Arc::clone(self);
        tokio::spawn(async move {
            let mut rx = adapter.subscribe();
            loop {
                let state = rx.borrow_and_update().clone();
                if state.is_settled() {
                    viewer.finish_foreground(&adapter, &state, epoch, generation);
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        });
    }

    fn finish_foreground(
        &self,
        adapter: &ItemLoader,
        state: &LoadState,
        epoch: u64,
        generation: u64,
    ) {
        let mut slot = self.session.lock();
        let Some(session) = slot.as_mut() else {
            return;
        };
        if session.epoch != epoch
            || session.generation != generation
            || session.current_id() != adapter.id()
        {
            return;
        }

        if state.is_complete() {
            session.completed_prefetch.insert(adapter.id().clone());
            self.phase_tx.send_replace(SessionPhase::Idle);
        } else if state.is_failed() {
            self.phase_tx.send_replace(SessionPhase::Error);
        }
        // Settled without handle or error means aborted; a newer
        // navigation owns the phase then.
    }

    /// Start background loads for window neighbours that are not already
    /// complete or in flight.
    fn warm_prefetch(self: &Arc<Self>) {
        let (epoch, to_start) = {
            let mut slot = self.session.lock();
            let Some(session) = slot.as_mut() else {
                return;
            };
            let window = prefetch_window(session.current, session.items.len());
            let mut to_start: Vec<Arc<ItemLoader>> = Vec::new();
            // Skip the window head: that is the foreground item.
            for index in window.into_iter().skip(1) {
                let id = session.items[index].id.clone();
                if session.completed_prefetch.contains(&id) {
                    continue;
                }
                let adapter = session.adapter_for(index, &self.loader, &self.config);
                let state = adapter.state();
                if state.is_complete() {
                    session.completed_prefetch.insert(id);
                    continue;
                }
                if state.is_loading {
                    continue;
                }
                to_start.push(adapter);
            }
            (session.epoch, to_start)
        };

        for adapter in to_start {
            trace!(id = %adapter.id(), "prefetching");
            adapter.start();
            self.monitor_prefetch(adapter, epoch);
        }
    }

    /// Record a prefetch completion; a prefetch failure is logged and
    /// swallowed, never surfaced.
    fn monitor_prefetch(self: &Arc<Self>, adapter: Arc<ItemLoader>, epoch: u64) {
        let viewer = Arc::clone(self);
        tokio::spawn(async move {
            let mut rx = adapter.subscribe();
            loop {
                let state = rx.borrow_and_update().clone();
                if state.is_settled() {
                    if state.is_complete() {
                        let mut slot = viewer.session.lock();
                        if let Some(session) = slot.as_mut() {
                            // Same id in a later session is a different item
                            // lifecycle; only this session's bookkeeping.
                            if session.epoch == epoch
                                && session.adapters.contains_key(adapter.id())
                            {
                                session.completed_prefetch.insert(adapter.id().clone());
                            }
                        }
                    } else if let Some(failure) = &state.error {
                        debug!(id = %adapter.id(), %failure, "prefetch failed, ignoring");
                    }
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        });
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("phase", &self.phase())
            .field("current_index", &self.current_index())
            .field("items", &self.item_count())
            .finish_non_exhaustive()
    }
}
