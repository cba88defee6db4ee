use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::{
    error::NetError,
    traits::{Net, RemoteBody},
};

/// Timeout decorator for Net implementations.
pub struct TimeoutNet<N> {
    inner: N,
    timeout: Duration,
}

impl<N: Net> TimeoutNet<N> {
    pub fn new(inner: N, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl<N: std::fmt::Debug> std::fmt::Debug for TimeoutNet<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutNet")
            .field("inner", &self.inner)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl<N: Net> Net for TimeoutNet<N> {
    async fn fetch(&self, url: Url) -> Result<RemoteBody, NetError> {
        // Only the request/response phase is bounded, not the body stream.
        tokio::time::timeout(self.timeout, self.inner.fetch(url))
            .await
            .map_err(|_| NetError::timeout())?
    }

    async fn get_bytes(&self, url: Url) -> Result<Bytes, NetError> {
        tokio::time::timeout(self.timeout, self.inner.get_bytes(url))
            .await
            .map_err(|_| NetError::timeout())?
    }
}
