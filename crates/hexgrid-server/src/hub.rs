//! The broadcast hub: per-session protocol and fan-out.
//!
//! [`BroadcastHub`] mediates between the [`SessionRegistry`], the
//! [`AuthGate`], the [`StateStore`] and a [`Codec`]. The transport calls
//! three entry points:
//!
//! 1. [`connect`](BroadcastHub::connect) -- admission, topic membership
//!    and the `initial-hexagons` snapshot
//! 2. [`handle_frame`](BroadcastHub::handle_frame) -- decode, authorize,
//!    broadcast, persist
//! 3. [`disconnect`](BroadcastHub::disconnect) -- leave the registry
//!
//! Accepted updates are broadcast with the submitted payload first and
//! persisted afterwards by a single writer task. Broadcast and enqueue
//! happen under one lock, so the store applies updates in the order clients
//! saw them. A persistence failure is logged and counted but never reaches
//! clients and never retracts the broadcast.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::Bytes;
use hexgrid_store::{StateStore, UpdateOutcome};
use hexgrid_types::{ClientAction, HexagonUpdate, INVALID_ACTION_NOTICE, ServerMessage};
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::auth::{Admission, AuthGate};
use crate::codec::{Codec, WireCodec};
use crate::registry::{HEXAGON_TOPIC, Outbound, SessionId, SessionRegistry};

/// What the transport gets back from [`BroadcastHub::connect`].
#[derive(Debug)]
pub struct Connection {
    /// The new session's id.
    pub id: SessionId,
    /// Frames to write to the socket, in order.
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
    /// `false` if the credential was rejected; the queue then ends with
    /// [`Outbound::Close`].
    pub admitted: bool,
}

/// How one inbound frame was handled.
#[derive(Debug)]
pub enum Dispatch {
    /// The update was broadcast; `persistence` resolves once the writer
    /// task has finished the store write (successfully or not).
    Broadcast {
        /// Number of sessions the broadcast was queued for.
        delivered: usize,
        /// Completion of the queued store write.
        persistence: oneshot::Receiver<()>,
    },
    /// A `pong` was queued.
    Pong,
    /// The session lacks write access; a `no-access` was queued.
    Denied,
    /// Undecodable frame, unknown action or unusable payload; the plain
    /// text notice was queued.
    Invalid,
    /// The session is no longer registered.
    SessionGone,
}

/// One accepted update waiting for the store.
#[derive(Debug)]
struct PersistJob {
    update: HexagonUpdate,
    done: oneshot::Sender<()>,
}

/// Connection lifecycle and message dispatch for every session.
pub struct BroadcastHub<S, C = WireCodec> {
    registry: SessionRegistry,
    gate: AuthGate,
    store: Arc<S>,
    codec: C,
    persist_queue: Mutex<mpsc::UnboundedSender<PersistJob>>,
    persist_failures: Arc<AtomicU64>,
}

impl<S: StateStore> BroadcastHub<S> {
    /// Create a hub with the default wire codec (JSON).
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime (see
    /// [`with_codec`](Self::with_codec)).
    pub fn new(store: Arc<S>, gate: AuthGate) -> Self {
        Self::with_codec(store, gate, WireCodec::default())
    }
}

impl<S: StateStore, C: Codec> BroadcastHub<S, C> {
    /// Create a hub with an explicit codec and start its persistence
    /// writer. The writer stops once the hub is dropped and the queue is
    /// drained.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_codec(store: Arc<S>, gate: AuthGate, codec: C) -> Self {
        let persist_failures = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(persist_writer(
            Arc::clone(&store),
            rx,
            Arc::clone(&persist_failures),
        ));
        Self {
            registry: SessionRegistry::new(),
            gate,
            store,
            codec,
            persist_queue: Mutex::new(tx),
            persist_failures,
        }
    }

    /// The live session registry.
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The credential gate.
    pub const fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store writes that failed after their broadcast went out.
    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }

    /// Admit a new connection.
    ///
    /// A wrong (non-empty) credential gets one `no-access` and a close. A
    /// missing or correct one joins the topic and receives the snapshot;
    /// broadcasts published while the snapshot loads are held and follow
    /// it, so `initial-hexagons` is always the first frame.
    pub async fn connect(&self, credential: Option<String>) -> Connection {
        let admission = self.gate.admit(credential.as_deref());
        let privilege = self.gate.classify(credential.as_deref());
        let (id, outbound) = self.registry.register(credential, privilege).await;

        if admission == Admission::Reject {
            warn!(session = %id, "Rejected connection with invalid key");
            self.send(id, ServerMessage::no_access()).await;
            self.registry.unicast(id, Outbound::Close).await;
            return Connection {
                id,
                outbound,
                admitted: false,
            };
        }

        self.registry.subscribe_deferred(id).await;
        let snapshot = match self.store.load_all().await {
            Ok(cells) => cells,
            Err(e) => {
                error!(session = %id, error = %e, "Failed to load snapshot, closing session");
                self.registry.unicast(id, Outbound::Close).await;
                return Connection {
                    id,
                    outbound,
                    admitted: true,
                };
            }
        };
        let cells = snapshot.len();
        match self.encode(ServerMessage::InitialHexagons(snapshot)) {
            Some(frame) => {
                self.registry.open(id, frame).await;
            }
            None => {
                self.registry.unicast(id, Outbound::Close).await;
            }
        }
        info!(session = %id, ?privilege, cells, topic = HEXAGON_TOPIC, "Session opened");

        Connection {
            id,
            outbound,
            admitted: true,
        }
    }

    /// Handle one inbound frame from an open session.
    ///
    /// Never fails: every problem is answered on the offending session and
    /// the connection stays open.
    pub async fn handle_frame(&self, id: SessionId, frame: &[u8]) -> Dispatch {
        let envelope = match self.codec.decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(session = %id, error = %e, "Undecodable frame");
                return self.reply_invalid(id).await;
            }
        };

        match ClientAction::from(envelope) {
            ClientAction::UpdateHexagon(payload) => self.update_hexagon(id, payload).await,
            ClientAction::Ping => {
                if self.send(id, ServerMessage::pong()).await {
                    Dispatch::Pong
                } else {
                    Dispatch::SessionGone
                }
            }
            ClientAction::Unknown(action) => {
                debug!(session = %id, ?action, "Unknown action");
                self.reply_invalid(id).await
            }
        }
    }

    /// Forget a session after its transport closed. Safe to call twice.
    pub async fn disconnect(&self, id: SessionId) {
        if self.registry.remove(id).await.is_some() {
            info!(session = %id, "Session closed");
        }
    }

    async fn update_hexagon(&self, id: SessionId, payload: Value) -> Dispatch {
        let Some(credential) = self.registry.credential(id).await else {
            return Dispatch::SessionGone;
        };
        if !self.gate.authorize_mutation(credential.as_deref()) {
            warn!(session = %id, "Update denied: session lacks write access");
            self.send(id, ServerMessage::no_access()).await;
            return Dispatch::Denied;
        }

        let update = match HexagonUpdate::from_payload(&payload) {
            Ok(update) => update,
            Err(e) => {
                warn!(session = %id, error = %e, "Unusable update payload");
                return self.reply_invalid(id).await;
            }
        };

        let Some(frame) = self.encode(ServerMessage::HexagonUpdate(payload)) else {
            return self.reply_invalid(id).await;
        };
        let (done, persistence) = oneshot::channel();
        let queue = self.persist_queue.lock().await;
        let delivered = self.registry.broadcast_topic(&frame).await;
        debug!(
            session = %id,
            cell_id = %update.id,
            status = %update.status,
            delivered,
            "Broadcast hexagon update"
        );
        let sent = queue.send(PersistJob { update, done });
        drop(queue);

        if let Err(mpsc::error::SendError(job)) = sent {
            self.persist_failures.fetch_add(1, Ordering::Relaxed);
            error!(
                cell_id = %job.update.id,
                status = %job.update.status,
                "Persistence writer stopped, update not stored"
            );
        }

        Dispatch::Broadcast {
            delivered,
            persistence,
        }
    }

    async fn reply_invalid(&self, id: SessionId) -> Dispatch {
        let notice = Outbound::Notice(INVALID_ACTION_NOTICE.to_owned());
        if self.registry.unicast(id, notice).await {
            Dispatch::Invalid
        } else {
            Dispatch::SessionGone
        }
    }

    async fn send(&self, id: SessionId, message: ServerMessage) -> bool {
        match self.encode(message) {
            Some(frame) => self.registry.unicast(id, Outbound::Frame(frame)).await,
            None => false,
        }
    }

    fn encode(&self, message: ServerMessage) -> Option<Bytes> {
        let action = message.action();
        let encoded = message
            .into_envelope()
            .map_err(|e| e.to_string())
            .and_then(|envelope| self.codec.encode(&envelope).map_err(|e| e.to_string()));
        match encoded {
            Ok(frame) => Some(frame),
            Err(e) => {
                error!(%action, error = %e, "Failed to encode outbound message");
                None
            }
        }
    }
}

/// Apply queued updates one at a time, in queue order.
async fn persist_writer<S: StateStore>(
    store: Arc<S>,
    mut queue: mpsc::UnboundedReceiver<PersistJob>,
    failures: Arc<AtomicU64>,
) {
    while let Some(PersistJob { update, done }) = queue.recv().await {
        match store.update(&update.id, &update.status).await {
            Ok(UpdateOutcome::Applied) => {
                debug!(cell_id = %update.id, status = %update.status, "Persisted update");
            }
            Ok(UpdateOutcome::NotFound) => {
                debug!(cell_id = %update.id, "Update target does not exist, ignored");
            }
            Err(e) => {
                failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    cell_id = %update.id,
                    status = %update.status,
                    error = %e,
                    "Failed to persist broadcast update"
                );
            }
        }
        // Nobody may be waiting.
        done.send(()).ok();
    }
    debug!("Persistence queue closed");
}
