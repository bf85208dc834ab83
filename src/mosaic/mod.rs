//! Mosaic Writer.
//!
//! Assembles each validated cycle into the hand-off artifact consumed by the
//! external stitcher: one OME-TIFF container per cycle, with an optional
//! `TileScanInfo` sidecar.
//!
//! # Container layout
//!
//! ```text
//! cycle_{n}.ome.tif   (BigTIFF, uint16)
//!   IFD 0   tile 0 / channel 0   + OME-XML ImageDescription
//!   IFD 1   tile 0 / channel 1
//!   ...
//!   IFD k   tile k / C + channel k % C
//! ```
//!
//! Pixel values are written exactly as loaded; nothing is rescaled.

mod export;
mod ome;
mod sidecar;
mod writer;

pub use export::{export_cycle, write_export_descriptor, zen_plane_file_name, ExportOutput};
pub use ome::{ascii_xml, generate_ome_xml};
pub use sidecar::{generate_tile_scan_xml, sidecar_file_name, tile_scan_entries, TileScanTile};
pub use writer::{mosaic_file_name, MosaicOutput, MosaicWriter};
