use std::time::Duration;

#[derive(Clone, Debug)]
pub struct NetOptions {
    pub request_timeout: Duration,
    /// Max idle connections per host. Set to 0 to disable pooling and reduce memory.
    pub pool_max_idle_per_host: usize,
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 0,
        }
    }
}

impl NetOptions {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = n;
        self
    }
}
