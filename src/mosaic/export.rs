//! ZEN-style export of a manifest.
//!
//! Container sources (CZI) can be flattened into the same layout a ZEN TIFF
//! export produces, so they can be archived or re-ingested by
//! [`ZenExportAdapter`](crate::format::ZenExportAdapter):
//!
//! ```text
//! Base_{cycle}_c{channel}m{tile:02}_ORG.tif   one projected plane each
//! Base_{cycle}_info.xml                       ExportDocument
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{IoError, MosaicError};
use crate::format::metadata::escape;
use crate::format::zen_info_file_name;
use crate::manifest::TileManifest;
use crate::plane::{PlaneShape, TiffPlaneCodec};

/// Plane file name for a (tile, channel), both 0-based.
pub fn zen_plane_file_name(cycle: u32, tile: usize, channel: usize) -> String {
    format!("Base_{}_c{}m{:02}_ORG.tif", cycle, channel + 1, tile + 1)
}

/// Render the `ExportDocument` for a manifest.
///
/// Entries follow the manifest's record order (channel, then tile).
pub fn write_export_descriptor(manifest: &TileManifest, shape: PlaneShape) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    xml.push_str("<ExportDocument>\n");

    for record in &manifest.records {
        let offset = manifest.offset(record.tile).unwrap_or_default();
        let name = zen_plane_file_name(manifest.id.cycle, record.tile, record.channel);
        xml.push_str("  <Image>\n");
        let _ = writeln!(xml, "    <Filename>{}</Filename>", escape(&name));
        let _ = writeln!(
            xml,
            "    <Bounds StartX=\"{}\" SizeX=\"{}\" StartY=\"{}\" SizeY=\"{}\" StartZ=\"0\" StartC=\"{}\" StartM=\"{}\" />",
            offset.x, shape.width, offset.y, shape.height, record.channel, record.tile
        );
        xml.push_str("    <Zoom>1</Zoom>\n");
        xml.push_str("  </Image>\n");
    }

    xml.push_str("</ExportDocument>\n");
    xml
}

/// Files written by [`export_cycle`].
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub planes: Vec<PathBuf>,
    pub descriptor: PathBuf,
}

/// Materialize every plane of a manifest into the ZEN export layout.
///
/// # Errors
///
/// * `MosaicError::DimensionMismatch` - planes disagree in shape
/// * `MosaicError::Plane` - a plane cannot be produced or encoded
/// * `MosaicError::Io` - a file cannot be written
pub async fn export_cycle(
    manifest: &TileManifest,
    dir: &Path,
    codec: &TiffPlaneCodec,
) -> Result<ExportOutput, MosaicError> {
    let mut planes = Vec::with_capacity(manifest.records.len());
    let mut shape: Option<PlaneShape> = None;

    for record in &manifest.records {
        let loaded = record.plane.load(codec).await?;
        let current = loaded.plane.shape();
        match shape {
            None => shape = Some(current),
            Some(first) if first != current => {
                return Err(MosaicError::DimensionMismatch {
                    cycle: manifest.id,
                    tile: record.tile,
                    channel: record.channel,
                    expected_width: first.width,
                    expected_height: first.height,
                    actual_width: current.width,
                    actual_height: current.height,
                });
            }
            Some(_) => {}
        }

        let bytes = codec.encode(&loaded.plane)?;
        let path = dir.join(zen_plane_file_name(
            manifest.id.cycle,
            record.tile,
            record.channel,
        ));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| IoError::write(&path, e))?;
        planes.push(path);
    }

    let shape = shape.unwrap_or(PlaneShape::new(0, 0));
    let descriptor = dir.join(zen_info_file_name(manifest.id.cycle));
    tokio::fs::write(&descriptor, write_export_descriptor(manifest, shape))
        .await
        .map_err(|e| IoError::write(&descriptor, e))?;

    info!(
        "Exported {} planes for {} to {}",
        planes.len(),
        manifest.id,
        dir.display()
    );

    Ok(ExportOutput { planes, descriptor })
}
