//! Shared type definitions for the Hexgrid broadcast server.
//!
//! This crate is the single source of truth for the cell model and the
//! wire envelope exchanged with clients. Types flow downstream to
//! `TypeScript` via `ts-rs` for the map UI.
//!
//! # Modules
//!
//! - [`cell`] -- The hexagon [`Cell`] record and raw seed [`Coordinate`]s
//! - [`grid`] -- [`Grid`], an ordered cell set indexed by id
//! - [`message`] -- Wire [`Envelope`], inbound [`ClientAction`], outbound [`ServerMessage`]

pub mod cell;
pub mod grid;
pub mod message;

// Re-export all public types at crate root for convenience.
pub use cell::{Cell, Coordinate, INITIAL_STATUS};
pub use grid::{Grid, GridError};
pub use message::{
    Action, ClientAction, Envelope, HexagonUpdate, INVALID_ACTION_NOTICE, NO_ACCESS_MESSAGE,
    PONG_PAYLOAD, PayloadError, ServerMessage,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the UI-facing types.

    #[test]
    fn export_bindings() {
        // The files are written to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        let _ = crate::cell::Cell::export_all();
        let _ = crate::cell::Coordinate::export_all();
        let _ = crate::message::Action::export_all();
        let _ = crate::message::Envelope::export_all();
        let _ = crate::message::HexagonUpdate::export_all();
    }
}
