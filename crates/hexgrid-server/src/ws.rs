//! `WebSocket` transport for the broadcast hub.
//!
//! Every path answers. A `WebSocket` upgrade request becomes a session;
//! anything else gets [`FALLBACK_BODY`]. The credential is the first `key`
//! query parameter, and a missing or unparsable query means no credential.
//!
//! One task per connection multiplexes the session's outbound queue, the
//! socket and an idle deadline that is pushed back on every inbound frame.
//! Envelopes travel as binary frames; the invalid-action notice is a text
//! frame. Inbound text and binary frames are both treated as envelopes.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use hexgrid_store::StateStore;
use tokio::time::Instant;
use tracing::debug;

use crate::hub::Connection;
use crate::registry::Outbound;
use crate::state::AppState;

/// Body returned for plain HTTP requests.
pub const FALLBACK_BODY: &str = "Hello world!";

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConnectParams {
    /// The shared secret, if the client claims write access.
    pub key: Option<String>,
}

impl From<Vec<(String, String)>> for ConnectParams {
    /// Later repeats of `key` are ignored.
    fn from(pairs: Vec<(String, String)>) -> Self {
        let key = pairs
            .into_iter()
            .find_map(|(name, value)| (name == "key").then_some(value));
        Self { key }
    }
}

/// Upgrade to a `WebSocket` session, or answer plain HTTP with a fixed body.
///
/// # Route
///
/// Any method on `/` and every other path.
pub async fn connect<S: StateStore>(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    State(state): State<Arc<AppState<S>>>,
) -> Response {
    let Ok(upgrade) = upgrade else {
        return FALLBACK_BODY.into_response();
    };
    let credential = query
        .ok()
        .and_then(|Query(pairs)| ConnectParams::from(pairs).key);
    upgrade.on_upgrade(move |socket| handle_ws(socket, state, credential))
}

/// Drive one session until either side closes or it goes idle.
async fn handle_ws<S: StateStore>(
    mut socket: WebSocket,
    state: Arc<AppState<S>>,
    credential: Option<String>,
) {
    let hub = &state.hub;
    let Connection {
        id,
        mut outbound,
        admitted,
    } = hub.connect(credential).await;
    debug!(session = %id, admitted, "WebSocket client connected");

    let idle = state.idle_timeout;
    let deadline = tokio::time::sleep(idle);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            // Frames queued for this session by the hub.
            Some(item) = outbound.recv() => {
                let msg = match item {
                    Outbound::Frame(bytes) => Message::Binary(bytes),
                    Outbound::Notice(text) => Message::Text(text.into()),
                    Outbound::Close => {
                        if socket.send(Message::Close(None)).await.is_err() {
                            debug!(session = %id, "Close frame not delivered");
                        }
                        break;
                    }
                };
                if socket.send(msg).await.is_err() {
                    debug!(session = %id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            // Traffic from the client.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        deadline.as_mut().reset(Instant::now() + idle);
                        hub.handle_frame(id, &data).await;
                    }
                    Some(Ok(Message::Text(text))) => {
                        deadline.as_mut().reset(Instant::now() + idle);
                        hub.handle_frame(id, text.as_str().as_bytes()).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        deadline.as_mut().reset(Instant::now() + idle);
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(session = %id, "WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        deadline.as_mut().reset(Instant::now() + idle);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(session = %id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(session = %id, "WebSocket error: {e}");
                        break;
                    }
                }
            }
            () = &mut deadline => {
                debug!(session = %id, idle_secs = idle.as_secs(), "Closing idle WebSocket");
                if socket.send(Message::Close(None)).await.is_err() {
                    debug!(session = %id, "Close frame not delivered");
                }
                break;
            }
        }
    }

    hub.disconnect(id).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(query: &[(&str, &str)]) -> Vec<(String, String)> {
        query
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    #[test]
    fn first_key_wins_when_repeated() {
        let params = ConnectParams::from(pairs(&[("key", "first"), ("key", "second")]));
        assert_eq!(params.key.as_deref(), Some("first"));
    }

    #[test]
    fn other_parameters_are_ignored() {
        let params = ConnectParams::from(pairs(&[("room", "1"), ("key", "k")]));
        assert_eq!(params.key.as_deref(), Some("k"));
        assert_eq!(ConnectParams::from(pairs(&[("room", "1")])), ConnectParams::default());
    }

    #[test]
    fn empty_key_is_still_a_credential() {
        let params = ConnectParams::from(pairs(&[("key", "")]));
        assert_eq!(params.key.as_deref(), Some(""));
    }
}
