//! HTTP shell for a feed
//!
//! `GET /` serves the feed report, `GET /?aggregate` runs an aggregation pass
//! first, `GET /?publish` answers with the feed's publish handler and
//! `GET /health` answers `ok`. Only compiled when the `server` feature is
//! enabled.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::feed::Feed;

#[derive(Clone)]
struct AppState {
    feed: Arc<Feed>,
    /// Serializes aggregation passes triggered over HTTP
    aggregate_lock: Arc<Mutex<()>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Create the router for `feed`
pub fn create_router(feed: Arc<Feed>) -> Router {
    let state = AppState {
        feed,
        aggregate_lock: Arc::new(Mutex::new(())),
    };

    Router::new()
        .route("/", get(get_feed))
        .route("/health", get(get_health))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

// ─────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────

/// GET / - feed report, GET /?aggregate - aggregate then report,
/// GET /?publish - publish handler response
async fn get_feed(
    Query(query): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    if query.contains_key("aggregate") {
        let _guard = state.aggregate_lock.lock().await;
        if let Err(e) = state.feed.aggregate().await {
            tracing::error!(feed = %state.feed.symbol(), error = %e, "Aggregation failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    } else if query.contains_key("publish") {
        return match state.feed.publish().await {
            Ok(Some(body)) => body.into_response(),
            Ok(None) => error_response(StatusCode::NOT_FOUND, "No publish handler configured"),
            Err(e) => {
                tracing::error!(feed = %state.feed.symbol(), error = %e, "Publish failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
    }

    match state.feed.report().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            tracing::error!(feed = %state.feed.symbol(), error = %e, "Report failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
async fn get_health() -> &'static str {
    "ok"
}

/// Start the HTTP server; returns on Ctrl-C
pub async fn start_server(feed: Arc<Feed>, bind: &str) -> anyhow::Result<()> {
    let app = create_router(feed);
    let listener = tokio::net::TcpListener::bind(bind).await?;

    tracing::info!("🖥️ Feed API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedBuilder;
    use crate::store::{MemoryStore, StateStore};
    use crate::types::EstimatorKind;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(Arc::new(FeedBuilder::new("BTC", "Bitcoin").build()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_report_route() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert("btc_median_data", r#"{"ts":42,"unit":"USD","price":123.0,"prices":[]}"#)
            .await;
        let feed = FeedBuilder::new("BTC", "Bitcoin")
            .estimator(EstimatorKind::Median, store)
            .build();

        let response = create_router(Arc::new(feed))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["aggregationType"], "median");
        assert_eq!(body["price"], 123.0);
        assert_eq!(body["ts"], 42);
    }

    #[tokio::test]
    async fn test_corrupt_state_is_server_error() {
        let store = Arc::new(MemoryStore::new());
        store.set("btc_twap_data", "not json").await.unwrap();
        let feed = FeedBuilder::new("BTC", "Bitcoin")
            .estimator(EstimatorKind::Twap, store)
            .build();

        let response = create_router(Arc::new(feed))
            .oneshot(Request::builder().uri("/?aggregate").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("btc_twap_data"));
    }

    #[tokio::test]
    async fn test_publish_route() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert("btc_twap_data", r#"{"ts":42,"unit":"USD","price":123.0,"prices":[]}"#)
            .await;
        let feed = FeedBuilder::new("BTC", "Bitcoin")
            .estimator(EstimatorKind::Twap, store)
            .publish_handler(|data| format!("{}@{}", data.price, data.ts))
            .build();

        let response = create_router(Arc::new(feed))
            .oneshot(Request::builder().uri("/?publish").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"123@42");
    }

    #[tokio::test]
    async fn test_publish_route_without_handler() {
        let app = create_router(Arc::new(FeedBuilder::new("BTC", "Bitcoin").build()));
        let response = app
            .oneshot(Request::builder().uri("/?publish").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
