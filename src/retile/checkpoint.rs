//! Per-cycle retiling checkpoint.
//!
//! ```json
//! { "cycle": 1, "grid": { "width": 3000, "height": 4096, "tile_size": 2000 },
//!   "completed": [[1, 0], [2, 0], ...] }
//! ```
//!
//! `completed` lists `[tile, channel]` pairs whose tile file has been fully
//! written. The record is replaced atomically after every tile.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RetileError;

use super::grid::TileGrid;

fn checkpoint_error(path: &Path, message: impl ToString) -> RetileError {
    RetileError::Checkpoint {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Completed (tile, channel) pairs of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// 1-based output cycle
    pub cycle: u32,

    /// Grid the completed tiles were cut from
    #[serde(default)]
    pub grid: Option<TileGrid>,

    /// `(tile, channel)` with 1-based tile and 0-based channel
    pub completed: BTreeSet<(usize, u32)>,
}

impl Checkpoint {
    pub fn new(cycle: u32) -> Self {
        Self {
            cycle,
            grid: None,
            completed: BTreeSet::new(),
        }
    }

    /// Load a checkpoint, or `None` if the file does not exist.
    pub async fn load(path: &Path) -> Result<Option<Self>, RetileError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(checkpoint_error(path, e)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| checkpoint_error(path, e))
    }

    /// Replace the checkpoint file atomically.
    pub async fn save(&self, path: &Path) -> Result<(), RetileError> {
        let json = serde_json::to_string(self).map_err(|e| checkpoint_error(path, e))?;
        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| checkpoint_error(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| checkpoint_error(path, e))
    }

    pub fn is_complete(&self, tile: usize, channel: u32) -> bool {
        self.completed.contains(&(tile, channel))
    }

    pub fn mark(&mut self, tile: usize, channel: u32) {
        self.completed.insert((tile, channel));
    }

    /// True when every tile of the recorded grid is complete for `channel`.
    pub fn channel_complete(&self, channel: u32) -> bool {
        match self.grid {
            Some(grid) => (1..=grid.tile_count()).all(|tile| self.is_complete(tile, channel)),
            None => false,
        }
    }

    /// Reset progress if the grid changed since the checkpoint was written.
    pub fn adopt_grid(&mut self, grid: TileGrid) {
        if self.grid != Some(grid) {
            self.completed.clear();
            self.grid = Some(grid);
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
