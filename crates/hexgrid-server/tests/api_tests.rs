//! Router tests for plain HTTP requests.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use hexgrid_server::ws::FALLBACK_BODY;
use hexgrid_server::{AppState, AuthGate, BroadcastHub, build_router};
use hexgrid_store::MemoryStore;
use tower::ServiceExt;

fn make_test_state() -> Arc<AppState<MemoryStore>> {
    let hub = BroadcastHub::new(Arc::new(MemoryStore::default()), AuthGate::new("k"));
    Arc::new(AppState::new(hub, Duration::from_secs(60)))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn plain_get_on_root_returns_fixed_text() {
    let app = build_router(make_test_state());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, FALLBACK_BODY);
}

#[tokio::test]
async fn any_path_and_method_gets_the_same_answer() {
    for (method, uri) in [
        (Method::GET, "/some/where?key=k"),
        (Method::POST, "/"),
        (Method::GET, "/?key"),
    ] {
        let app = build_router(make_test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, FALLBACK_BODY);
    }
}

#[tokio::test]
async fn plain_requests_do_not_create_sessions() {
    let state = make_test_state();
    let app = build_router(Arc::clone(&state));
    app.oneshot(Request::builder().uri("/?key=k").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(state.hub.registry().is_empty().await);
}
