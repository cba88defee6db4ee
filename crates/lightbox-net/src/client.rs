use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::Client;
use url::Url;

use crate::{
    error::{NetError, NetResult},
    traits::{Net, RemoteBody},
    types::NetOptions,
};

#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: Client,
    options: NetOptions,
}

impl HttpClient {
    /// # Panics
    ///
    /// Panics if the `reqwest::Client` builder fails to build.
    #[must_use]
    pub fn new(options: NetOptions) -> Self {
        let inner = Client::builder()
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .build()
            .expect("failed to build reqwest client");
        Self { inner, options }
    }

    /// # Errors
    ///
    /// Returns [`NetError`] on HTTP failure or network error.
    pub async fn fetch(&self, url: Url) -> NetResult<RemoteBody> {
        <Self as Net>::fetch(self, url).await
    }

    /// # Errors
    ///
    /// Returns [`NetError`] on HTTP failure, timeout, or network error.
    pub async fn get_bytes(&self, url: Url) -> NetResult<Bytes> {
        <Self as Net>::get_bytes(self, url).await
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(NetOptions::default())
    }
}

#[async_trait]
impl Net for HttpClient {
    async fn fetch(&self, url: Url) -> Result<RemoteBody, NetError> {
        // No timeout here - progressive downloads can take arbitrary time.
        // The strategy chain bounds each attempt with its own deadline.
        let resp = self
            .inner
            .get(url.clone())
            .send()
            .await
            .map_err(NetError::from)?;
        let status = resp.status();

        if !status.is_success() {
            return Err(NetError::http_status(status.as_u16(), url.to_string()));
        }

        let total = resp.content_length();
        let stream = resp.bytes_stream().map_err(NetError::from);
        Ok(RemoteBody {
            total,
            stream: Box::pin(stream),
        })
    }

    async fn get_bytes(&self, url: Url) -> Result<Bytes, NetError> {
        let resp = self
            .inner
            .get(url.clone())
            .timeout(self.options.request_timeout)
            .send()
            .await
            .map_err(NetError::from)?;
        let status = resp.status();

        if !status.is_success() {
            return Err(NetError::http_status(status.as_u16(), url.to_string()));
        }

        resp.bytes().await.map_err(NetError::from)
    }
}
