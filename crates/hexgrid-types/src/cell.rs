//! The hexagon cell record.
//!
//! A [`Cell`] is one tile of the shared map. Its `id` is derived from the
//! tile's grid coordinate and never changes after seeding; only `status`
//! and `last_modified` are mutated at runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Status assigned to every cell when the dataset is seeded.
pub const INITIAL_STATUS: &str = "inactive";

/// One hexagon of the shared grid.
///
/// Serialized with camel-case keys (`lastModified`) to match the
/// persisted file layout and what the UI expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Cell {
    /// Stable identifier in `"{row}-{col}"` form.
    pub id: String,
    /// Open-ended state label (e.g. `"inactive"`, `"active"`).
    pub status: String,
    /// When the last accepted mutation was persisted. `None` until then.
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Cell {
    /// Create a freshly seeded cell for a grid coordinate.
    pub fn seeded(coordinate: Coordinate) -> Self {
        Self {
            id: coordinate.cell_id(),
            status: INITIAL_STATUS.to_owned(),
            last_modified: None,
        }
    }
}

/// A raw grid coordinate as found in the seed input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    /// Grid row.
    pub row: i64,
    /// Grid column.
    pub col: i64,
}

impl Coordinate {
    /// The cell id derived from this coordinate.
    pub fn cell_id(self) -> String {
        format!("{}-{}", self.row, self.col)
    }
}
