//! An ordered set of cells indexed by id.
//!
//! [`Grid`] keeps the cells in their seeded order (so snapshots match the
//! persisted layout) while giving O(1) lookup by id for mutations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cell::Cell;

/// Errors raised while assembling a [`Grid`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// Two cells share the same id.
    #[error("duplicate cell id: {0}")]
    DuplicateId(String),
}

/// Cells in seeded order with an id index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Cell>,
    index: HashMap<String, usize>,
}

impl Grid {
    /// Build a grid from cells, rejecting duplicate ids.
    pub fn from_cells(cells: Vec<Cell>) -> Result<Self, GridError> {
        let mut index = HashMap::with_capacity(cells.len());
        for (position, cell) in cells.iter().enumerate() {
            if index.insert(cell.id.clone(), position).is_some() {
                return Err(GridError::DuplicateId(cell.id.clone()));
            }
        }
        Ok(Self { cells, index })
    }

    /// Look up a cell by id.
    pub fn get(&self, id: &str) -> Option<&Cell> {
        self.index
            .get(id)
            .and_then(|&position| self.cells.get(position))
    }

    /// Set a cell's status and stamp it with `at`.
    ///
    /// Returns `false` without touching anything if no cell has this id.
    pub fn apply_status(&mut self, id: &str, status: &str, at: DateTime<Utc>) -> bool {
        let Some(&position) = self.index.get(id) else {
            return false;
        };
        let Some(cell) = self.cells.get_mut(position) else {
            return false;
        };
        status.clone_into(&mut cell.status);
        cell.last_modified = Some(at);
        true
    }

    /// All cells in seeded order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Consume the grid, returning the cells in seeded order.
    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
