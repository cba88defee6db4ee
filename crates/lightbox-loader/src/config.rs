use std::time::Duration;

use lightbox_core::MediaKind;
use url::Url;

/// Per-load configuration. Immutable for the lifetime of one load attempt;
/// a retry creates a new attempt with the same config.
#[derive(Clone, Debug)]
pub struct LoadAttemptConfig {
    /// Deadline for each individual strategy attempt.
    pub timeout: Duration,
    /// Full-chain re-runs after the first chain failure.
    pub retries: u32,
    /// Materialize downloaded bytes into a local object handle on success.
    pub produce_local_handle: bool,
    /// Permit the simulated last-resort strategy.
    pub allow_degraded_fallback: bool,
    /// Polling cadence for strategies without byte-level feedback.
    pub poll_interval: Duration,
}

impl Default for LoadAttemptConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 2,
            produce_local_handle: true,
            allow_degraded_fallback: true,
            poll_interval: Duration::from_millis(150),
        }
    }
}

impl LoadAttemptConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_produce_local_handle(mut self, produce: bool) -> Self {
        self.produce_local_handle = produce;
        self
    }

    pub fn with_degraded_fallback(mut self, allow: bool) -> Self {
        self.allow_degraded_fallback = allow;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// One resource to load: what to fetch and how.
#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub url: Url,
    pub kind: MediaKind,
    pub config: LoadAttemptConfig,
}

impl LoadRequest {
    pub fn new(url: Url, kind: MediaKind) -> Self {
        Self {
            url,
            kind,
            config: LoadAttemptConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LoadAttemptConfig) -> Self {
        self.config = config;
        self
    }
}
