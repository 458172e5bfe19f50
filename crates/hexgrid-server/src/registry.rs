//! Live session bookkeeping and fan-out.
//!
//! [`SessionRegistry`] owns one record per connection: the outbound queue
//! the transport drains, the credential captured at connect, the session's
//! lifecycle state and its membership in the `hexagon-updates` topic.
//! Everything else refers to a session by its opaque [`SessionId`], so the
//! registry can be exercised without a socket.
//!
//! Each session's outbound queue is unbounded and filled while the
//! registry lock is held, so frames published in sequence reach every
//! subscriber in that same sequence.

use std::collections::HashMap;
use std::fmt;

use axum::body::Bytes;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::auth::Privilege;

/// Name of the single broadcast topic.
pub const HEXAGON_TOPIC: &str = "hexagon-updates";

/// Opaque identifier for a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, handshake (admission + snapshot) not finished.
    Connecting,
    /// Snapshot delivered; frames are being dispatched.
    Open,
    /// Removed from the registry.
    Closed,
}

/// Something for the transport to do on a session's socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// An encoded envelope.
    Frame(Bytes),
    /// A plain-text notice, sent outside the envelope.
    Notice(String),
    /// Close the connection.
    Close,
}

/// A point-in-time view of one session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// The credential presented at connect time.
    pub credential: Option<String>,
    /// Privilege decided at connect time.
    pub privilege: Privilege,
    /// Lifecycle state.
    pub state: SessionState,
    /// Whether the session is a member of the broadcast topic.
    pub subscribed: bool,
}

#[derive(Debug)]
enum Subscription {
    None,
    /// Member of the topic, but frames are held until the snapshot is out.
    Deferred(Vec<Bytes>),
    Live,
}

#[derive(Debug)]
struct SessionRecord {
    tx: mpsc::UnboundedSender<Outbound>,
    credential: Option<String>,
    privilege: Privilege,
    state: SessionState,
    subscription: Subscription,
}

impl SessionRecord {
    fn info(&self) -> SessionInfo {
        SessionInfo {
            credential: self.credential.clone(),
            privilege: self.privilege,
            state: self.state,
            subscribed: !matches!(self.subscription, Subscription::None),
        }
    }

    /// Queue for the transport. A receiver that is already gone is not an
    /// error: the session is closing and will be removed shortly.
    fn send(&self, outbound: Outbound) -> bool {
        self.tx.send(outbound).is_ok()
    }
}

/// All live sessions and the broadcast topic's membership.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session in the `Connecting` state.
    ///
    /// Returns the session's id and the receiving end of its outbound
    /// queue, which the transport drains onto the socket.
    pub async fn register(
        &self,
        credential: Option<String>,
        privilege: Privilege,
    ) -> (SessionId, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SessionId::new();
        let record = SessionRecord {
            tx,
            credential,
            privilege,
            state: SessionState::Connecting,
            subscription: Subscription::None,
        };
        self.sessions.write().await.insert(id, record);
        tracing::debug!(session = %id, ?privilege, "Session registered");
        (id, rx)
    }

    /// Send to exactly one session.
    ///
    /// Returns `false` if the session is unknown or its transport is gone.
    pub async fn unicast(&self, id: SessionId, outbound: Outbound) -> bool {
        self.sessions
            .read()
            .await
            .get(&id)
            .is_some_and(|record| record.send(outbound))
    }

    /// Send a frame to every member of the topic, the originator included.
    ///
    /// Members whose snapshot is still pending get the frame buffered.
    /// Returns the number of sessions the frame was queued for.
    pub async fn broadcast_topic(&self, frame: &Bytes) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut delivered = 0_usize;
        for record in sessions.values_mut() {
            let queued = match &mut record.subscription {
                Subscription::None => false,
                Subscription::Deferred(pending) => {
                    pending.push(frame.clone());
                    true
                }
                Subscription::Live => record.tx.send(Outbound::Frame(frame.clone())).is_ok(),
            };
            if queued {
                delivered = delivered.saturating_add(1);
            }
        }
        delivered
    }

    /// Join the topic. Idempotent; returns `false` for an unknown session.
    pub async fn subscribe(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(record) = sessions.get_mut(&id) else {
            return false;
        };
        if let Subscription::Deferred(pending) = &mut record.subscription {
            for frame in pending.drain(..) {
                record.tx.send(Outbound::Frame(frame)).ok();
            }
        }
        record.subscription = Subscription::Live;
        true
    }

    /// Join the topic but hold broadcasts until [`Self::open`] delivers the
    /// first frame. No-op if the session is already a member.
    pub async fn subscribe_deferred(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(record) = sessions.get_mut(&id) else {
            return false;
        };
        if matches!(record.subscription, Subscription::None) {
            record.subscription = Subscription::Deferred(Vec::new());
        }
        true
    }

    /// Finish the handshake: queue `first`, then any broadcasts held since
    /// [`Self::subscribe_deferred`], and mark the session `Open` and live.
    pub async fn open(&self, id: SessionId, first: Bytes) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(record) = sessions.get_mut(&id) else {
            return false;
        };
        record.send(Outbound::Frame(first));
        if let Subscription::Deferred(pending) = &mut record.subscription {
            for frame in pending.drain(..) {
                record.tx.send(Outbound::Frame(frame)).ok();
            }
        }
        record.subscription = Subscription::Live;
        record.state = SessionState::Open;
        true
    }

    /// Leave the topic. Idempotent; held frames are dropped.
    pub async fn unsubscribe(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(record) = sessions.get_mut(&id) else {
            return false;
        };
        record.subscription = Subscription::None;
        true
    }

    /// Drop a session, implicitly leaving the topic.
    ///
    /// Tolerates sessions that never finished connecting and sessions that
    /// are already gone (returns `None`).
    pub async fn remove(&self, id: SessionId) -> Option<SessionInfo> {
        let record = self.sessions.write().await.remove(&id)?;
        let mut info = record.info();
        info.state = SessionState::Closed;
        info.subscribed = false;
        tracing::debug!(session = %id, "Session removed");
        Some(info)
    }

    /// Snapshot of one session record.
    pub async fn info(&self, id: SessionId) -> Option<SessionInfo> {
        self.sessions.read().await.get(&id).map(SessionRecord::info)
    }

    /// The credential a session presented at connect time.
    ///
    /// `None` if the session is unknown; `Some(None)` if it connected
    /// without one.
    pub async fn credential(&self, id: SessionId) -> Option<Option<String>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|record| record.credential.clone())
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Number of topic members.
    pub async fn subscriber_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|record| !matches!(record.subscription, Subscription::None))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(text: &'static str) -> Bytes {
        Bytes::from_static(text.as_bytes())
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn register_starts_connecting_and_unsubscribed() {
        let registry = SessionRegistry::new();
        let (id, _rx) = registry.register(None, Privilege::Observer).await;
        let info = registry.info(id).await;
        assert_eq!(info.as_ref().map(|i| i.state), Some(SessionState::Connecting));
        assert_eq!(info.map(|i| i.subscribed), Some(false));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn unicast_reaches_only_the_target() {
        let registry = SessionRegistry::new();
        let (a, mut rx_a) = registry.register(None, Privilege::Observer).await;
        let (_b, mut rx_b) = registry.register(None, Privilege::Observer).await;

        assert!(registry.unicast(a, Outbound::Frame(frame("hi"))).await);
        assert_eq!(drain(&mut rx_a), vec![Outbound::Frame(frame("hi"))]);
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn unicast_to_a_closed_transport_is_harmless() {
        let registry = SessionRegistry::new();
        let (id, rx) = registry.register(None, Privilege::Observer).await;
        drop(rx);
        assert!(!registry.unicast(id, Outbound::Close).await);
        assert!(!registry.unicast(SessionId::new(), Outbound::Close).await);
    }

    #[tokio::test]
    async fn broadcast_skips_non_members() {
        let registry = SessionRegistry::new();
        let (a, mut rx_a) = registry.register(None, Privilege::Observer).await;
        let (_b, mut rx_b) = registry.register(None, Privilege::Observer).await;
        registry.subscribe(a).await;

        assert_eq!(registry.broadcast_topic(&frame("u1")).await, 1);
        assert_eq!(drain(&mut rx_a), vec![Outbound::Frame(frame("u1"))]);
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe_are_idempotent() {
        let registry = SessionRegistry::new();
        let (id, mut rx) = registry.register(None, Privilege::Observer).await;
        assert!(registry.subscribe(id).await);
        assert!(registry.subscribe(id).await);
        assert_eq!(registry.subscriber_count().await, 1);

        registry.broadcast_topic(&frame("once")).await;
        assert_eq!(drain(&mut rx).len(), 1);

        assert!(registry.unsubscribe(id).await);
        assert!(registry.unsubscribe(id).await);
        assert_eq!(registry.subscriber_count().await, 0);
        assert_eq!(registry.broadcast_topic(&frame("none")).await, 0);
    }

    #[tokio::test]
    async fn deferred_members_get_the_first_frame_before_held_broadcasts() {
        let registry = SessionRegistry::new();
        let (id, mut rx) = registry.register(None, Privilege::Observer).await;
        registry.subscribe_deferred(id).await;

        assert_eq!(registry.broadcast_topic(&frame("u1")).await, 1);
        assert_eq!(registry.broadcast_topic(&frame("u2")).await, 1);
        assert!(drain(&mut rx).is_empty());

        registry.open(id, frame("snapshot")).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                Outbound::Frame(frame("snapshot")),
                Outbound::Frame(frame("u1")),
                Outbound::Frame(frame("u2")),
            ]
        );
        assert_eq!(
            registry.info(id).await.map(|i| i.state),
            Some(SessionState::Open)
        );
    }

    #[tokio::test]
    async fn broadcasts_keep_publication_order() {
        let registry = SessionRegistry::new();
        let (a, mut rx_a) = registry.register(None, Privilege::Observer).await;
        let (b, mut rx_b) = registry.register(None, Privilege::Observer).await;
        registry.subscribe(a).await;
        registry.subscribe(b).await;

        let frames: Vec<Bytes> = ["1", "2", "3", "4"].into_iter().map(frame).collect();
        for f in &frames {
            registry.broadcast_topic(f).await;
        }
        let expected: Vec<Outbound> = frames.into_iter().map(Outbound::Frame).collect();
        assert_eq!(drain(&mut rx_a), expected);
        assert_eq!(drain(&mut rx_b), expected);
    }

    #[tokio::test]
    async fn remove_tolerates_unknown_and_half_open_sessions() {
        let registry = SessionRegistry::new();
        let (id, _rx) = registry.register(Some("k".to_owned()), Privilege::Privileged).await;
        registry.subscribe_deferred(id).await;

        let removed = registry.remove(id).await;
        assert_eq!(removed.as_ref().map(|i| i.state), Some(SessionState::Closed));
        assert_eq!(removed.and_then(|i| i.credential), Some("k".to_owned()));
        assert!(registry.remove(id).await.is_none());
        assert!(registry.is_empty().await);
        assert_eq!(registry.broadcast_topic(&frame("x")).await, 0);
    }
}
