use std::time::Duration;

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use bytes::Bytes;
use futures::StreamExt;
use lightbox_net::{HttpClient, Net, NetError, NetExt, NetOptions};
use tokio::net::TcpListener;
use url::Url;

// ============================================================================
// Test server infrastructure
// ============================================================================

struct TestServer {
    base_url: Url,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn new(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });

        tokio::spawn(async move {
            server.await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self, path: &str) -> Url {
        self.base_url.join(path).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

const BODY: &[u8] = b"0123456789abcdef0123456789abcdef";

fn router() -> Router {
    Router::new()
        .route("/photo.jpg", get(|| async { BODY }))
        .route(
            "/chunked.jpg",
            get(|| async {
                // Stream without a Content-Length header.
                let chunks: Vec<Result<Bytes, std::io::Error>> = BODY
                    .chunks(8)
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect();
                let stream = futures::stream::iter(chunks);
                axum::body::Body::from_stream(stream)
            }),
        )
        .route(
            "/missing.jpg",
            get(|| async { StatusCode::NOT_FOUND.into_response() }),
        )
        .route(
            "/slow.jpg",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                BODY
            }),
        )
}

async fn drain(mut stream: lightbox_net::ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn fetch_reports_content_length_and_streams_body() {
    let server = TestServer::new(router()).await;
    let client = HttpClient::new(NetOptions::default());

    let body = client.fetch(server.url("/photo.jpg")).await.unwrap();
    assert_eq!(body.total, Some(BODY.len() as u64));
    assert_eq!(drain(body.stream).await, BODY);
}

#[tokio::test]
async fn fetch_without_content_length_reports_unknown_total() {
    let server = TestServer::new(router()).await;
    let client = HttpClient::new(NetOptions::default());

    let body = client.fetch(server.url("/chunked.jpg")).await.unwrap();
    assert_eq!(body.total, None);
    assert_eq!(drain(body.stream).await, BODY);
}

#[tokio::test]
async fn get_bytes_buffers_whole_body() {
    let server = TestServer::new(router()).await;
    let client = HttpClient::new(NetOptions::default());

    let bytes = client.get_bytes(server.url("/photo.jpg")).await.unwrap();
    assert_eq!(&bytes[..], BODY);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = TestServer::new(router()).await;
    let client = HttpClient::new(NetOptions::default());

    let err = client
        .get_bytes(server.url("/missing.jpg"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(404));

    let err = client.fetch(server.url("/missing.jpg")).await.unwrap_err();
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn timeout_decorator_bounds_the_request_phase() {
    let server = TestServer::new(router()).await;
    let client = HttpClient::new(NetOptions::default()).with_timeout(Duration::from_millis(100));

    let err = client.fetch(server.url("/slow.jpg")).await.unwrap_err();
    assert!(matches!(err, NetError::Timeout));
}

#[tokio::test]
async fn request_timeout_option_applies_to_get_bytes() {
    let server = TestServer::new(router()).await;
    let client = HttpClient::new(
        NetOptions::default().with_request_timeout(Duration::from_millis(100)),
    );

    let err = client.get_bytes(server.url("/slow.jpg")).await.unwrap_err();
    assert!(err.is_timeout());
}
