//! Real-time broadcast server for a shared grid of hexagon cells.
//!
//! Clients connect over a `WebSocket`, receive a snapshot of every cell,
//! and then receive each accepted change as it happens. Clients holding
//! the shared key may change cells; everyone else observes.
//!
//! # Architecture
//!
//! ```text
//! socket --(ws)--> BroadcastHub --decode--> Codec
//!                       |
//!                       +-- AuthGate         (privilege at connect, re-check per update)
//!                       +-- SessionRegistry  (unicast / topic broadcast)
//!                       +-- StateStore       (snapshot, single-writer persist queue)
//! ```
//!
//! # Modules
//!
//! - [`auth`] -- [`AuthGate`] shared-secret classification
//! - [`codec`] -- [`Codec`] contract, [`JsonCodec`] and [`MsgPackCodec`]
//! - [`registry`] -- [`SessionRegistry`] live sessions and fan-out
//! - [`hub`] -- [`BroadcastHub`] connection lifecycle and dispatch
//! - [`ws`] / [`router`] / [`server`] -- Axum transport
//! - [`config`] -- [`ServerConfig`] YAML + environment loading
//! - [`state`] -- [`AppState`] shared with handlers

pub mod auth;
pub mod codec;
pub mod config;
pub mod hub;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use auth::{Admission, AuthGate, Privilege};
pub use codec::{Codec, CodecError, JsonCodec, MsgPackCodec, WireCodec};
pub use config::{ConfigError, LoggingConfig, ServerConfig};
pub use hub::{BroadcastHub, Connection, Dispatch};
pub use registry::{HEXAGON_TOPIC, Outbound, SessionId, SessionInfo, SessionRegistry, SessionState};
pub use router::build_router;
pub use server::{ServerError, serve, start_server};
pub use state::AppState;
