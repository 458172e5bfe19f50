//! Shared application state for the Axum server.

use std::time::Duration;

use hexgrid_store::StateStore;

use crate::hub::BroadcastHub;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
pub struct AppState<S> {
    /// The broadcast hub every connection talks to.
    pub hub: BroadcastHub<S>,
    /// Inactivity period after which a connection is closed.
    pub idle_timeout: Duration,
}

impl<S: StateStore> AppState<S> {
    /// Bundle a hub with transport settings.
    pub fn new(hub: BroadcastHub<S>, idle_timeout: Duration) -> Self {
        Self { hub, idle_timeout }
    }
}
