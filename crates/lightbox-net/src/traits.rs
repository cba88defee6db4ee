use std::{pin::Pin, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use url::Url;

use crate::{error::NetError, timeout::TimeoutNet};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, NetError>> + Send>>;

/// A response body with whatever size knowledge the server volunteered.
///
/// `total` is `Some` only when the response carried a usable
/// Content-Length; progress strategies branch on it.
pub struct RemoteBody {
    pub total: Option<u64>,
    pub stream: ByteStream,
}

impl std::fmt::Debug for RemoteBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBody")
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Net: Send + Sync {
    /// Open a streaming response for a URL.
    async fn fetch(&self, url: Url) -> Result<RemoteBody, NetError>;

    /// Get all bytes from a URL in one buffered request.
    async fn get_bytes(&self, url: Url) -> Result<Bytes, NetError>;
}

pub trait NetExt: Net + Sized {
    /// Add a timeout layer covering the request/response phase.
    fn with_timeout(self, timeout: Duration) -> TimeoutNet<Self> {
        TimeoutNet::new(self, timeout)
    }
}

impl<T: Net> NetExt for T {}
