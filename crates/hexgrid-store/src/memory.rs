//! In-process cell store.
//!
//! [`MemoryStore`] keeps the grid behind a [`RwLock`]: snapshots share the
//! read side, updates take the write side, which serializes them.

use chrono::Utc;
use hexgrid_types::{Cell, Grid};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{StateStore, UpdateOutcome};

/// A [`StateStore`] that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    grid: RwLock<Grid>,
}

impl MemoryStore {
    /// Wrap an existing grid.
    pub fn new(grid: Grid) -> Self {
        Self {
            grid: RwLock::new(grid),
        }
    }

    /// Build a store from cells, rejecting duplicate ids.
    pub fn from_cells(cells: Vec<Cell>) -> Result<Self, StoreError> {
        Ok(Self::new(Grid::from_cells(cells)?))
    }
}

impl StateStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<Cell>, StoreError> {
        Ok(self.grid.read().await.cells().to_vec())
    }

    async fn update(&self, id: &str, status: &str) -> Result<UpdateOutcome, StoreError> {
        let mut grid = self.grid.write().await;
        if grid.apply_status(id, status, Utc::now()) {
            Ok(UpdateOutcome::Applied)
        } else {
            tracing::debug!(cell_id = id, "update target not found");
            Ok(UpdateOutcome::NotFound)
        }
    }

    async fn get_one(&self, id: &str) -> Result<Option<Cell>, StoreError> {
        Ok(self.grid.read().await.get(id).cloned())
    }
}
