//! Axum router construction.
//!
//! The server has a single logical endpoint: any path accepts a
//! `WebSocket` upgrade, and plain requests get a fixed text body.

use std::sync::Arc;

use axum::Router;
use axum::routing::any;
use hexgrid_store::StateStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// CORS allows any origin so that the map UI can be served from
/// elsewhere.
pub fn build_router<S: StateStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", any(ws::connect::<S>))
        .fallback(ws::connect::<S>)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
