use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{config::LoadRequest, error::LoadResult, progress::ProgressReporter};

/// What a successful strategy attempt produced.
#[derive(Clone, Debug)]
pub enum Fetched {
    /// The strategy downloaded the raw bytes; the chain decides whether to
    /// materialize a local object handle from them.
    Bytes(Bytes),
    /// The bytes live elsewhere (a platform element owns them); the chain
    /// resolves to the original URL.
    Streamed,
}

/// One interchangeable loading technique in the chain.
///
/// Implementations must be cancellation-aware: check the token at their
/// suspension points and stop emitting progress once it fires. The chain
/// additionally bounds every attempt with `config.timeout`, so a stalled
/// attempt is dropped rather than awaited forever.
#[async_trait]
pub trait LoadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy applies to the request at all. Inapplicable
    /// strategies are skipped without counting as failures.
    fn applies(&self, _req: &LoadRequest) -> bool {
        true
    }

    async fn attempt(
        &self,
        req: &LoadRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> LoadResult<Fetched>;
}
