//! ZEN TIFF export adapter.
//!
//! Layout: one directory holding every cycle.
//!
//! ```text
//! export/
//!   Base_1_c1m01_ORG.tif      cycle 1, channel 1, tile 1
//!   Base_1_c2m01_ORG.tif
//!   Base_1_info.xml           ExportDocument with per-tile Bounds
//!   Base_2_c1m01_ORG.tif
//!   ...
//! ```
//!
//! Positions are already in pixels. Each distinct `StartM` in the export
//! document contributes one position, taken in document order and assigned to
//! tiles in ascending tile-token order.
//!
//! Every tile gets one record per channel token seen in the cycle; a missing
//! plane file becomes an absent plane that loads as zeros.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::FormatError;
use crate::plane::{PlaneHandle, PlaneShape, TiffPlaneCodec};

use super::adapter::{list_file_names, probe_shape, FormatAdapter, VendorFormat, DEFAULT_PLANE_EDGE};
use super::grammar::{parse_zen_name, ZenName};
use super::metadata::{distinct_tile_positions, parse_export_bounds};
use super::record::{Acquisition, Calibration, CycleId, PixelPosition, TileRecord};

/// Name of the export document for a cycle.
pub fn zen_info_file_name(cycle: u32) -> String {
    format!("Base_{}_info.xml", cycle)
}

/// Adapter for a ZEN TIFF export directory.
#[derive(Debug, Clone)]
pub struct ZenExportAdapter {
    export_dir: PathBuf,
    calibration: Calibration,
    default_shape: PlaneShape,
    codec: TiffPlaneCodec,
}

impl ZenExportAdapter {
    pub fn new(export_dir: impl Into<PathBuf>, calibration: Calibration) -> Self {
        Self {
            export_dir: export_dir.into(),
            calibration,
            default_shape: PlaneShape::new(DEFAULT_PLANE_EDGE, DEFAULT_PLANE_EDGE),
            codec: TiffPlaneCodec::new(),
        }
    }

    /// Shape substituted for planes when no file of the cycle can be probed.
    pub fn with_default_shape(mut self, shape: PlaneShape) -> Self {
        self.default_shape = shape;
        self
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    async fn plane_files(&self) -> Result<Vec<(String, ZenName)>, FormatError> {
        let names = list_file_names(&self.export_dir).await?;
        Ok(names
            .into_iter()
            .filter_map(|name| parse_zen_name(&name).map(|parsed| (name, parsed)))
            .collect())
    }

    fn find_info_file<'a>(&self, names: &'a [String], cycle: u32) -> Option<&'a str> {
        let exact = zen_info_file_name(cycle);
        let prefix = format!("Base_{}_", cycle);
        names
            .iter()
            .find(|n| **n == exact)
            .or_else(|| {
                names
                    .iter()
                    .find(|n| n.starts_with(&prefix) && n.ends_with("info.xml"))
            })
            .map(String::as_str)
    }
}

#[async_trait]
impl FormatAdapter for ZenExportAdapter {
    fn vendor(&self) -> VendorFormat {
        VendorFormat::ZenExport
    }

    async fn discover(&self) -> Result<Vec<CycleId>, FormatError> {
        let cycles: BTreeSet<u32> = self
            .plane_files()
            .await?
            .iter()
            .map(|(_, parsed)| parsed.cycle)
            .collect();
        Ok(cycles.into_iter().map(CycleId::new).collect())
    }

    async fn load_cycle(&self, cycle: CycleId) -> Result<Acquisition, FormatError> {
        let names = list_file_names(&self.export_dir).await?;

        let info_name =
            self.find_info_file(&names, cycle.cycle)
                .ok_or_else(|| FormatError::MissingMetadata {
                    cycle,
                    reason: format!(
                        "{} not found in {}",
                        zen_info_file_name(cycle.cycle),
                        self.export_dir.display()
                    ),
                })?;
        let info_path = self.export_dir.join(info_name);
        let xml = tokio::fs::read_to_string(&info_path)
            .await
            .map_err(|e| FormatError::MissingMetadata {
                cycle,
                reason: format!("cannot read {}: {}", info_path.display(), e),
            })?;
        let bounds = parse_export_bounds(&xml, &info_path.display().to_string())?;
        let positions = distinct_tile_positions(&bounds);

        // tile token -> channel token -> path
        let mut layout: BTreeMap<u32, BTreeMap<u32, PathBuf>> = BTreeMap::new();
        let mut channel_tokens = BTreeSet::new();
        for name in &names {
            let Some(parsed) = parse_zen_name(name) else {
                continue;
            };
            if parsed.cycle != cycle.cycle {
                continue;
            }
            channel_tokens.insert(parsed.channel);
            layout
                .entry(parsed.tile)
                .or_default()
                .insert(parsed.channel, self.export_dir.join(name));
        }

        if positions.len() < layout.len() {
            return Err(FormatError::MissingMetadata {
                cycle,
                reason: format!(
                    "{} lists {} tile positions for {} tiles",
                    info_name,
                    positions.len(),
                    layout.len()
                ),
            });
        }

        let candidates: Vec<PathBuf> = layout
            .values()
            .flat_map(|channels| channels.values().cloned())
            .take(4)
            .collect();
        let shape = probe_shape(&candidates, &self.codec, self.default_shape).await;

        let mut acquisition = Acquisition::new(cycle, VendorFormat::ZenExport, self.calibration);
        for ((tile, (tile_token, channels)), bounds) in layout.iter().enumerate().zip(&positions) {
            let position = PixelPosition::new(bounds.x, bounds.y);
            for (channel, token) in channel_tokens.iter().enumerate() {
                let plane = match channels.get(token) {
                    Some(path) => PlaneHandle::file(path, shape),
                    None => {
                        warn!(
                            "{}: no file for tile m{:02} channel c{}, zero-filling",
                            cycle, tile_token, token
                        );
                        PlaneHandle::absent(shape)
                    }
                };
                acquisition.push(TileRecord {
                    cycle,
                    channel,
                    tile,
                    position,
                    source: plane.source_id(),
                    plane,
                });
            }
        }

        debug!(
            "{}: {} tiles, {} channels from {}",
            cycle,
            layout.len(),
            channel_tokens.len(),
            info_name
        );
        info!("Normalized {} ZEN records for {}", acquisition.len(), cycle);
        Ok(acquisition)
    }
}
