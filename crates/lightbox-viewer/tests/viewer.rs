use std::{sync::Arc, time::Duration};

use lightbox_core::{HandleStore, MediaDescriptor, MediaKind};
use lightbox_loader::{
    ChainLoader, LoadAttemptConfig,
    testing::{FakeNet, ScriptedStrategy},
};
use lightbox_viewer::{LoadState, SessionPhase, Viewer, ViewerError, input::NavCommand};
use url::Url;

fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn item_url(index: usize) -> Url {
    Url::parse(&format!("https://cdn.example.com/item{index}.jpg")).unwrap()
}

fn items(count: usize) -> Vec<MediaDescriptor> {
    (0..count)
        .map(|i| MediaDescriptor::new(format!("item-{i}"), MediaKind::Photo, item_url(i)))
        .collect()
}

fn fast_config() -> LoadAttemptConfig {
    LoadAttemptConfig::default()
        .with_timeout(Duration::from_millis(100))
        .with_retries(0)
        .with_degraded_fallback(false)
}

fn scripted_viewer() -> (Arc<Viewer>, Arc<ScriptedStrategy>, HandleStore) {
    let strategy = ScriptedStrategy::succeeding("net", &b"jpeg bytes"[..]);
    let store = HandleStore::new();
    let loader = Arc::new(ChainLoader::from_strategies(
        vec![strategy.clone()],
        store.clone(),
    ));
    (Viewer::new(loader, fast_config()), strategy, store)
}

fn net_viewer(net: Arc<FakeNet>) -> (Arc<Viewer>, HandleStore) {
    let store = HandleStore::new();
    let loader = Arc::new(ChainLoader::new(net, store.clone()));
    (Viewer::new(loader, fast_config()), store)
}

async fn wait_phase(viewer: &Viewer, expected: SessionPhase) {
    let mut rx = viewer.watch_phase();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|p| *p == expected))
        .await
        .unwrap_or_else(|_| panic!("phase never reached {expected:?}"))
        .unwrap();
}

async fn settle() {
    // Let background prefetch tasks run to completion.
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn open_with_no_items_is_a_noop() {
    let (viewer, strategy, _) = scripted_viewer();

    viewer.open(Vec::new(), 0).unwrap();

    assert_eq!(viewer.phase(), SessionPhase::Closed);
    assert_eq!(viewer.current_index(), None);
    assert_eq!(strategy.attempts(), 0);
}

#[tokio::test]
async fn open_rejects_out_of_bounds_start_index() {
    let (viewer, _, _) = scripted_viewer();

    let err = viewer.open(items(3), 3).unwrap_err();

    assert_eq!(err, ViewerError::InvalidIndex { index: 3, len: 3 });
    assert_eq!(viewer.phase(), SessionPhase::Closed);
}

#[tokio::test]
async fn open_loads_the_start_item_to_idle() {
    let (viewer, _, _) = scripted_viewer();

    viewer.open(items(3), 1).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;

    assert_eq!(viewer.current_index(), Some(1));
    let state = viewer.current_state().unwrap();
    assert!(state.is_complete());
    assert_eq!(state.progress_percent, 100);
}

#[tokio::test]
async fn navigation_wraps_in_both_directions() {
    let (viewer, _, _) = scripted_viewer();
    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;

    viewer.next().unwrap();
    assert_eq!(viewer.current_index(), Some(1));
    viewer.next().unwrap();
    assert_eq!(viewer.current_index(), Some(2));
    viewer.next().unwrap();
    assert_eq!(viewer.current_index(), Some(0));

    viewer.previous().unwrap();
    assert_eq!(viewer.current_index(), Some(2));
    viewer.previous().unwrap();
    assert_eq!(viewer.current_index(), Some(1));
    viewer.previous().unwrap();
    assert_eq!(viewer.current_index(), Some(0));
}

#[tokio::test]
async fn navigating_to_the_current_index_is_ignored() {
    let (viewer, _, _) = scripted_viewer();
    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;

    viewer.navigate_to(0).unwrap();

    // No transition happened; the phase never left idle.
    assert_eq!(viewer.phase(), SessionPhase::Idle);
    assert_eq!(viewer.current_index(), Some(0));
}

#[tokio::test]
async fn navigate_to_rejects_out_of_bounds_index() {
    let (viewer, _, _) = scripted_viewer();
    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;

    let err = viewer.navigate_to(7).unwrap_err();

    assert_eq!(err, ViewerError::InvalidIndex { index: 7, len: 3 });
    assert_eq!(viewer.current_index(), Some(0));
}

#[tokio::test]
async fn revisiting_a_loaded_item_does_not_reload_it() {
    let (viewer, strategy, _) = scripted_viewer();
    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;

    assert_eq!(strategy.attempts_for(&item_url(0)), 1);

    viewer.navigate_to(1).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    viewer.navigate_to(0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;

    // The cached handle was reused; no second load for item 0.
    assert_eq!(strategy.attempts_for(&item_url(0)), 1);
    assert!(viewer.current_state().unwrap().is_complete());
}

#[tokio::test]
async fn close_releases_every_handle() {
    let (viewer, _, store) = scripted_viewer();
    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;

    // Foreground plus both prefetched neighbours hold local handles.
    assert_eq!(store.outstanding(), 3);

    viewer.close();

    assert_eq!(store.outstanding(), 0);
    assert_eq!(viewer.phase(), SessionPhase::Closed);
    assert_eq!(viewer.current_index(), None);

    // Closing again is harmless.
    viewer.close();
    assert_eq!(viewer.phase(), SessionPhase::Closed);
}

#[tokio::test]
async fn foreground_failure_surfaces_and_retry_recovers() {
    let net = Arc::new(FakeNet::new());
    net.fail(&item_url(0));
    net.serve(&item_url(1), &b"b"[..]);
    net.serve(&item_url(2), &b"c"[..]);
    let (viewer, _) = net_viewer(net.clone());

    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Error).await;

    let state = viewer.current_state().unwrap();
    assert!(state.is_failed());
    assert!(state.handle.is_none());

    // The outage clears; a retry brings the item up.
    net.serve(&item_url(0), &b"a"[..]);
    viewer.retry_current();
    wait_phase(&viewer, SessionPhase::Idle).await;
    assert!(viewer.current_state().unwrap().is_complete());
}

#[tokio::test]
async fn prefetch_failure_never_surfaces() {
    let net = Arc::new(FakeNet::new());
    net.serve(&item_url(0), &b"a"[..]);
    net.fail(&item_url(1));
    net.serve(&item_url(2), &b"c"[..]);
    let (viewer, _) = net_viewer(net);

    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;

    assert_eq!(viewer.phase(), SessionPhase::Idle);
    let state = viewer.current_state().unwrap();
    assert!(state.is_complete());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn single_item_session_has_no_navigation() {
    let (viewer, strategy, _) = scripted_viewer();
    viewer.open(items(1), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;

    assert!(!viewer.has_navigation());
    assert_eq!(viewer.item_count(), 1);

    viewer.next().unwrap();
    viewer.previous().unwrap();

    assert_eq!(viewer.current_index(), Some(0));
    assert_eq!(viewer.phase(), SessionPhase::Idle);
    assert_eq!(strategy.attempts(), 1);
}

#[tokio::test]
async fn abandoned_load_cannot_flip_the_phase_later() {
    trace_init();
    let net = Arc::new(FakeNet::new());
    net.stall(&item_url(0));
    net.serve(&item_url(1), &b"b"[..]);
    let (viewer, _) = net_viewer(net);

    viewer.open(items(2), 0).unwrap();
    assert_eq!(viewer.phase(), SessionPhase::Loading);

    // Leave the stalled item behind while it is still in flight.
    viewer.navigate_to(1).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;

    // Give the abandoned attempt time to run out its strategy clocks; its
    // outcome must not disturb the current item.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(viewer.phase(), SessionPhase::Idle);
    assert!(viewer.current_state().unwrap().is_complete());
}

#[tokio::test]
async fn adapters_far_outside_the_window_are_evicted() {
    trace_init();
    let (viewer, _, store) = scripted_viewer();
    viewer.open(items(8), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;

    // Window around 0 is {0, 1, 7, 2, 6}.
    assert_eq!(store.outstanding(), 5);

    viewer.navigate_to(1).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;
    // Item 6 left the window one step ago; still within grace.

    viewer.navigate_to(2).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;

    // Two steps outside: item 6 is gone. Alive: {0, 1, 2, 3, 4, 7}.
    assert_eq!(store.outstanding(), 6);

    viewer.close();
    assert_eq!(store.outstanding(), 0);
}

#[tokio::test]
async fn input_commands_drive_the_viewer() {
    let (viewer, _, _) = scripted_viewer();
    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;

    viewer.apply(NavCommand::Next).unwrap();
    assert_eq!(viewer.current_index(), Some(1));

    viewer.apply(NavCommand::JumpTo(2)).unwrap();
    assert_eq!(viewer.current_index(), Some(2));

    viewer.apply(NavCommand::Close).unwrap();
    assert_eq!(viewer.phase(), SessionPhase::Closed);
}

#[tokio::test]
async fn reopening_replaces_the_previous_session() {
    let (viewer, _, store) = scripted_viewer();
    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;
    assert_eq!(store.outstanding(), 3);

    viewer.open(items(2), 1).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;

    assert_eq!(viewer.item_count(), 2);
    assert_eq!(viewer.current_index(), Some(1));
    // Old session's handles were all released; only the new pair remains.
    assert_eq!(store.outstanding(), 2);
}

#[tokio::test]
async fn reopening_with_the_same_items_prefetches_afresh() {
    let (viewer, strategy, _) = scripted_viewer();
    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;
    assert_eq!(strategy.attempts_for(&item_url(1)), 1);
    assert_eq!(strategy.attempts_for(&item_url(2)), 1);

    // Same ids, new session: nothing from the old session's prefetch
    // bookkeeping may suppress the new warm-up.
    viewer.open(items(3), 0).unwrap();
    wait_phase(&viewer, SessionPhase::Idle).await;
    settle().await;

    assert_eq!(strategy.attempts_for(&item_url(1)), 2);
    assert_eq!(strategy.attempts_for(&item_url(2)), 2);
}

// Type-level check that observers get plain snapshots.
#[test]
fn load_state_snapshots_are_cloneable() {
    let state = LoadState::default();
    let copy = state.clone();
    assert!(!copy.is_loading);
}
