//! Tile-scan sidecar for the stitcher.
//!
//! Some stitcher readers locate tiles through a Leica-style `TileScanInfo`
//! attachment rather than the container's own metadata. The schema is fixed
//! by that reader: field indices are integers, positions are metres written
//! with 10 decimals.

use std::fmt::Write as _;

use crate::manifest::TileManifest;

/// Micrometres per metre.
const UM_PER_METRE: f64 = 1.0e6;

/// Sidecar file name for a cycle.
pub fn sidecar_file_name(manifest: &TileManifest) -> String {
    format!("{}.tilescan.xml", manifest.id.file_stem())
}

/// One tile entry of the sidecar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileScanTile {
    pub field_x: usize,
    pub field_y: usize,
    pub pos_x_m: f64,
    pub pos_y_m: f64,
}

/// Derive sidecar entries from a manifest, in tile order.
///
/// Field indices are the tile's column and row rank among the distinct
/// offsets; positions are the offsets converted to metres.
pub fn tile_scan_entries(manifest: &TileManifest) -> Vec<TileScanTile> {
    let calibration = manifest.calibration;
    manifest
        .positions
        .iter()
        .zip(manifest.positions.grid_ranks())
        .map(|((_, offset), (field_x, field_y))| TileScanTile {
            field_x,
            field_y,
            pos_x_m: calibration.to_physical_um(offset.x) / UM_PER_METRE,
            pos_y_m: calibration.to_physical_um(offset.y) / UM_PER_METRE,
        })
        .collect()
}

/// Render the `TileScanInfo` document.
pub fn generate_tile_scan_xml(manifest: &TileManifest) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version='1.0' encoding='utf-8'?>\n");
    xml.push_str("<Data>\n");
    xml.push_str("  <Image TextDescription=\"\">\n");
    xml.push_str(
        "    <Attachment Name=\"TileScanInfo\" Application=\"LAS AF\" FlipX=\"0\" FlipY=\"0\" SwapXY=\"0\">\n",
    );
    for tile in tile_scan_entries(manifest) {
        let _ = writeln!(
            xml,
            "      <Tile FieldX=\"{}\" FieldY=\"{}\" PosX=\"{:.10}\" PosY=\"{:.10}\" />",
            tile.field_x, tile.field_y, tile.pos_x_m, tile.pos_y_m
        );
    }
    xml.push_str("    </Attachment>\n");
    xml.push_str("  </Image>\n");
    xml.push_str("</Data>\n");
    xml
}
