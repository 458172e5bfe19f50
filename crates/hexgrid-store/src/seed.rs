//! Initial dataset generation.
//!
//! The raw map export is a JSON array of `{row, col}` coordinates. Seeding
//! turns each one into an inactive, never-modified [`Cell`].

use std::path::Path;

use hexgrid_types::{Cell, Coordinate, Grid};

use crate::error::StoreError;

/// Build the initial cell set, preserving input order.
///
/// Fails if two coordinates produce the same id.
pub fn seed_cells(coordinates: &[Coordinate]) -> Result<Vec<Cell>, StoreError> {
    let cells = coordinates.iter().copied().map(Cell::seeded).collect();
    Ok(Grid::from_cells(cells)?.into_cells())
}

/// Read raw coordinates from a JSON file.
pub async fn read_coordinates(path: &Path) -> Result<Vec<Coordinate>, StoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use hexgrid_types::INITIAL_STATUS;

    use super::*;

    #[test]
    fn seeds_in_input_order() {
        let coordinates = [
            Coordinate { row: 1, col: 0 },
            Coordinate { row: 0, col: 0 },
        ];
        let cells = seed_cells(&coordinates).unwrap_or_default();
        let ids: Vec<&str> = cells.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1-0", "0-0"]);
        assert!(cells.iter().all(|c| c.status == INITIAL_STATUS));
        assert!(cells.iter().all(|c| c.last_modified.is_none()));
    }

    #[test]
    fn duplicate_coordinates_fail() {
        let coordinates = [Coordinate { row: 1, col: 0 }, Coordinate { row: 1, col: 0 }];
        assert!(matches!(seed_cells(&coordinates), Err(StoreError::Grid(_))));
    }
}
