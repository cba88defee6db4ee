use std::fmt;

use lightbox_core::ResolvedHandle;
use lightbox_loader::LoadError;

/// Snapshot of one item's load, as the presentation layer sees it.
///
/// Invariant: `handle` is only ever set while `is_loading` is `false` and
/// `error` is `None`.
#[derive(Clone, Debug, Default)]
pub struct LoadState {
    pub is_loading: bool,
    /// Monotonic within an attempt, `0..=100`.
    pub progress_percent: u8,
    pub error: Option<LoadFailure>,
    pub handle: Option<ResolvedHandle>,
}

impl LoadState {
    pub(crate) fn idle() -> Self {
        Self::default()
    }

    pub(crate) fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    /// The load finished and produced a renderable handle.
    pub fn is_complete(&self) -> bool {
        !self.is_loading && self.error.is_none() && self.handle.is_some()
    }

    pub fn is_failed(&self) -> bool {
        !self.is_loading && self.error.is_some()
    }

    /// No attempt is in flight. Covers idle, aborted, completed and failed.
    pub fn is_settled(&self) -> bool {
        !self.is_loading
    }
}

/// User-presentable load failure. Cheap to clone and compare, unlike the
/// loader's error chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadFailure {
    Timeout,
    Network(String),
    /// Every strategy in the chain failed; carries the last cause.
    Exhausted(String),
}

impl From<&LoadError> for LoadFailure {
    fn from(err: &LoadError) -> Self {
        match err {
            LoadError::StrategyTimeout => Self::Timeout,
            LoadError::StrategyNetwork(msg) => Self::Network(msg.clone()),
            LoadError::AllStrategiesExhausted { last } => match last.as_ref() {
                LoadError::StrategyTimeout => Self::Timeout,
                other => Self::Exhausted(other.to_string()),
            },
            LoadError::Cancelled => Self::Network("cancelled".to_owned()),
        }
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "load timed out"),
            Self::Network(msg) => write!(f, "network failure: {msg}"),
            Self::Exhausted(msg) => write!(f, "all loading strategies failed: {msg}"),
        }
    }
}
