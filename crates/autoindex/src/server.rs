//! HTTP transport: every GET path is an index query.

use autoindex_index::Index;
use autoindex_protocol::defaults;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::error;

pub fn router(index: Arc<Index>) -> Router {
    Router::new()
        .route("/", get(handle_query))
        .route("/*path", get(handle_query))
        .with_state(index)
        .layer(TimeoutLayer::new(Duration::from_secs(
            defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
        )))
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, index: Arc<Index>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(index))
        .with_graceful_shutdown(shutdown)
        .await
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, defaults::CONTENT_TYPE_JSON)],
        defaults::NOT_FOUND_BODY,
    )
        .into_response()
}

pub async fn handle_query(State(index): State<Arc<Index>>, uri: Uri) -> Response {
    let path = match urlencoding::decode(uri.path()) {
        Ok(path) => path.into_owned(),
        Err(_) => return not_found(),
    };

    // The probe does blocking filesystem I/O
    match tokio::task::spawn_blocking(move || index.query_bytes(&path)).await {
        Ok(Some(body)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, defaults::CONTENT_TYPE_JSON)],
            body,
        )
            .into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            error!("query task failed for {}: {}", uri.path(), e);
            not_found()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoindex_index::IndexConfig;
    use autoindex_logging::DiscardLogger;
    use tempfile::TempDir;

    fn index_for(dir: &TempDir) -> Arc<Index> {
        let config = IndexConfig {
            root: dir.path().to_path_buf(),
            shard_count: 16,
            ..IndexConfig::default()
        };
        Arc::new(Index::new(config, Arc::new(DiscardLogger)).unwrap())
    }

    async fn body_of(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_file_query() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"abc").unwrap();

        let uri = Uri::from_static("/a.txt");
        let resp = handle_query(State(index_for(&dir)), uri).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            defaults::CONTENT_TYPE_JSON
        );
        let body = body_of(resp).await;
        assert!(body.starts_with(r#"{"type":"file","mtime":"#));
        assert!(body.ends_with(r#""size":3}"#));
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("with space.txt"), b"").unwrap();

        let resp = handle_query(
            State(index_for(&dir)),
            Uri::from_static("/with%20space.txt"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_is_404() {
        let dir = TempDir::new().unwrap();

        let uri = Uri::from_static("/missing");
        let resp = handle_query(State(index_for(&dir)), uri).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(resp).await, defaults::NOT_FOUND_BODY);
    }

    #[tokio::test]
    async fn test_invalid_utf8_path_is_404() {
        let dir = TempDir::new().unwrap();

        let uri = Uri::from_static("/%FF%FE");
        let resp = handle_query(State(index_for(&dir)), uri).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
