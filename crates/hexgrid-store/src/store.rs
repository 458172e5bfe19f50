//! The storage interface the broadcast hub depends on.

use hexgrid_types::Cell;

use crate::error::StoreError;

/// Result of a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The cell existed and now carries the new status and timestamp.
    Applied,
    /// No cell has that id. Nothing was written.
    NotFound,
}

/// Load/update access to the authoritative cell collection.
///
/// Implementations own the collection exclusively and must serialize
/// concurrent [`update`](StateStore::update) calls so that two
/// read-modify-write cycles never interleave into a lost write. Updates to
/// the same id from different callers are last-write-wins.
pub trait StateStore: Send + Sync + 'static {
    /// Every cell, in stored order.
    fn load_all(&self) -> impl Future<Output = Result<Vec<Cell>, StoreError>> + Send;

    /// Set one cell's status and stamp `last_modified` with the current time.
    ///
    /// An unknown id is not an error: it yields [`UpdateOutcome::NotFound`]
    /// and leaves the collection untouched.
    fn update(
        &self,
        id: &str,
        status: &str,
    ) -> impl Future<Output = Result<UpdateOutcome, StoreError>> + Send;

    /// A single cell by id.
    fn get_one(&self, id: &str) -> impl Future<Output = Result<Option<Cell>, StoreError>> + Send;
}
