//! State persistence for the Hexgrid broadcast server.
//!
//! The server only ever talks to a [`StateStore`]: load every cell, update
//! one cell's status, fetch one cell. This crate provides that interface
//! and two backends.
//!
//! # Modules
//!
//! - [`store`] -- The [`StateStore`] trait and [`UpdateOutcome`]
//! - [`memory`] -- [`MemoryStore`], an in-process grid behind a lock
//! - [`file`] -- [`JsonFileStore`], a pretty-printed JSON array on disk
//! - [`seed`] -- Turning raw coordinates into an initial dataset
//! - [`error`] -- Shared error types

pub mod error;
pub mod file;
pub mod memory;
pub mod seed;
pub mod store;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use seed::{read_coordinates, seed_cells};
pub use store::{StateStore, UpdateOutcome};
