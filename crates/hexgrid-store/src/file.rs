//! JSON file cell store.
//!
//! The dataset is one pretty-printed JSON array of cells. Every read goes
//! to disk. Updates run read -> mutate -> write under a single lock, and
//! the write goes to a sibling temp file that is renamed over the original
//! so readers never observe a half-written file.

use std::path::{Path, PathBuf};

use chrono::Utc;
use hexgrid_types::{Cell, Grid};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::{StateStore, UpdateOutcome};

/// A [`StateStore`] backed by a JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open an existing dataset file.
    ///
    /// The file is parsed once up front so that a missing or corrupt
    /// dataset fails at startup rather than on the first connection.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::unchecked(path.into());
        let grid = store.read_grid().await?;
        tracing::info!(path = %store.path.display(), cells = grid.len(), "Opened cell store");
        Ok(store)
    }

    /// Write `cells` as a new dataset at `path`, replacing any existing file.
    pub async fn create(path: impl Into<PathBuf>, cells: &[Cell]) -> Result<Self, StoreError> {
        let store = Self::unchecked(path.into());
        Grid::from_cells(cells.to_vec())?;
        store.write_cells(cells).await?;
        Ok(store)
    }

    /// The dataset file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unchecked(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    async fn read_grid(&self) -> Result<Grid, StoreError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        let cells: Vec<Cell> = serde_json::from_slice(&bytes)?;
        Ok(Grid::from_cells(cells)?)
    }

    async fn write_cells(&self, cells: &[Cell]) -> Result<(), StoreError> {
        let bytes = to_pretty_json(cells)?;
        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    async fn load_all(&self) -> Result<Vec<Cell>, StoreError> {
        Ok(self.read_grid().await?.into_cells())
    }

    async fn update(&self, id: &str, status: &str) -> Result<UpdateOutcome, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut grid = self.read_grid().await?;
        if !grid.apply_status(id, status, Utc::now()) {
            tracing::debug!(cell_id = id, "update target not found");
            return Ok(UpdateOutcome::NotFound);
        }
        self.write_cells(grid.cells()).await?;
        tracing::debug!(cell_id = id, status, "persisted cell update");
        Ok(UpdateOutcome::Applied)
    }

    async fn get_one(&self, id: &str) -> Result<Option<Cell>, StoreError> {
        Ok(self.read_grid().await?.get(id).cloned())
    }
}

/// Serialize cells as a JSON array indented with four spaces.
pub fn to_pretty_json(cells: &[Cell]) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    cells.serialize(&mut serializer)?;
    Ok(out)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_sits_next_to_the_dataset() {
        let tmp = temp_path(Path::new("/var/data/cells.json"));
        assert_eq!(tmp, PathBuf::from("/var/data/cells.json.tmp"));
    }

    #[test]
    fn pretty_json_uses_four_space_indent() {
        let cells = vec![Cell {
            id: "0-0".to_owned(),
            status: "inactive".to_owned(),
            last_modified: None,
        }];
        let text = to_pretty_json(&cells)
            .ok()
            .and_then(|b| String::from_utf8(b).ok())
            .unwrap_or_default();
        assert!(text.contains("\n    {\n        \"id\": \"0-0\""));
    }
}
