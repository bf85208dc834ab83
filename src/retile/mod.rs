//! Retiling of stitched canvases.
//!
//! A stitched canvas is padded on the bottom and right to a multiple of the
//! tile edge and cut into equally sized tiles, indexed row-major from 1.
//! Each pass writes:
//!
//! - `Base_{cycle}_stitched-{channel}/tile{n}.tif` per canvas
//! - `tilepos.csv`, the headerless `x,y` ledger shared by every channel
//! - `Base_{cycle}.checkpoint.json`, the completed (tile, channel) pairs
//!
//! Reruns consult the checkpoint, so finished tiles are never rewritten and
//! finished canvases are not even decoded.

mod checkpoint;
mod engine;
mod grid;
mod ledger;
mod naming;

pub use checkpoint::Checkpoint;
pub use engine::{RetileReport, RetiledTile, Retiler};
pub use grid::TileGrid;
pub use ledger::{format_ledger, parse_ledger, read_ledger, write_ledger};
pub use naming::{parse_canvas_name, tile_file_name, CanvasId, CanvasNaming, LEDGER_FILE_NAME};
