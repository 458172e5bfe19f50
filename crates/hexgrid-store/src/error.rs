//! Error types for the store layer.
//!
//! All errors are propagated via [`StoreError`], which carries the path of
//! the file involved when the failure is an I/O one.

use std::path::PathBuf;

use hexgrid_types::GridError;

/// Errors that can occur while loading or persisting cells.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading, writing or renaming a data file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file the operation was acting on.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The dataset violates the cell set invariants.
    #[error("Invalid dataset: {0}")]
    Grid(#[from] GridError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
