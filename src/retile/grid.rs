//! Tile grid math for retiling.
//!
//! A canvas of `H x W` is padded on the bottom and right only, up to the
//! next multiple of the tile edge `T`, then cut into `rows x cols` cells:
//!
//! ```text
//!  (0,0)      (T,0)      (2T,0)
//!    ┌──────────┬──────────┬─────┄┄┐
//!    │ tile 1   │ tile 2   │ tile 3 ┆
//!    ├──────────┼──────────┼─────┄┄┤
//!    │ tile 4   │ tile 5   │ tile 6 ┆
//!    └┄┄┄┄┄┄┄┄┄┄┴┄┄┄┄┄┄┄┄┄┄┴┄┄┄┄┄┄┄┄┘ ← pad_bottom
//!                               ↑ pad_right
//! ```
//!
//! Tile indices are 1-based, row-major.

use serde::{Deserialize, Serialize};

use crate::error::RetileError;
use crate::manifest::PixelOffset;

/// Grid geometry for one canvas size and tile edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
}

impl TileGrid {
    /// # Errors
    ///
    /// `RetileError::InvalidTileSize` when `tile_size` is zero.
    pub fn new(width: u32, height: u32, tile_size: u32) -> Result<Self, RetileError> {
        if tile_size == 0 {
            return Err(RetileError::InvalidTileSize(tile_size));
        }
        Ok(Self {
            width,
            height,
            tile_size,
        })
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.tile_size)
    }

    pub fn cols(&self) -> u32 {
        self.width.div_ceil(self.tile_size)
    }

    pub fn tile_count(&self) -> usize {
        self.rows() as usize * self.cols() as usize
    }

    /// Rows of fill added below the canvas.
    pub fn pad_bottom(&self) -> u64 {
        self.rows() as u64 * self.tile_size as u64 - self.height as u64
    }

    /// Columns of fill added right of the canvas.
    pub fn pad_right(&self) -> u64 {
        self.cols() as u64 * self.tile_size as u64 - self.width as u64
    }

    /// Top-left offset of a 1-based tile index.
    pub fn offset(&self, index: usize) -> Option<PixelOffset> {
        if index == 0 || index > self.tile_count() {
            return None;
        }
        let cols = self.cols() as usize;
        let row = (index - 1) / cols;
        let col = (index - 1) % cols;
        Some(PixelOffset::new(
            col as u64 * self.tile_size as u64,
            row as u64 * self.tile_size as u64,
        ))
    }

    /// Offsets of every tile in index order.
    pub fn offsets(&self) -> Vec<PixelOffset> {
        (1..=self.tile_count()).filter_map(|i| self.offset(i)).collect()
    }
}
