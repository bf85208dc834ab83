//! Origin-normalized tile positions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::format::PixelPosition;

/// Integer pixel offset of a tile's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PixelOffset {
    pub x: u64,
    pub y: u64,
}

impl PixelOffset {
    pub const fn new(x: u64, y: u64) -> Self {
        Self { x, y }
    }
}

/// Tile index → pixel offset, with the minimum offset at zero on each axis.
///
/// Built once per cycle and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionTable {
    offsets: Vec<PixelOffset>,
}

impl PositionTable {
    /// Subtract the per-axis minimum from every position and round to whole pixels.
    ///
    /// Index `i` of the result corresponds to `positions[i]`.
    pub fn normalize(positions: &[PixelPosition]) -> Self {
        if positions.is_empty() {
            return Self::default();
        }

        let min_x = positions.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = positions.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

        let offsets = positions
            .iter()
            .map(|p| {
                PixelOffset::new(
                    (p.x - min_x).round().max(0.0) as u64,
                    (p.y - min_y).round().max(0.0) as u64,
                )
            })
            .collect();

        Self { offsets }
    }

    pub fn get(&self, tile: usize) -> Option<PixelOffset> {
        self.offsets.get(tile).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Iterate `(tile, offset)` in tile order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, PixelOffset)> + '_ {
        self.offsets.iter().copied().enumerate()
    }

    /// Column and row rank of each tile among the distinct x and y offsets.
    ///
    /// Tiles sharing an x offset share a column; likewise for rows.
    pub fn grid_ranks(&self) -> Vec<(usize, usize)> {
        let xs: Vec<u64> = self
            .offsets
            .iter()
            .map(|o| o.x)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let ys: Vec<u64> = self
            .offsets
            .iter()
            .map(|o| o.y)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        self.offsets
            .iter()
            .map(|o| {
                (
                    xs.binary_search(&o.x).unwrap_or_default(),
                    ys.binary_search(&o.y).unwrap_or_default(),
                )
            })
            .collect()
    }
}
