//! Leica TIFF export adapter.
//!
//! Layout: one directory per cycle, each possibly holding several scan
//! regions, with tile-scan metadata in a sub-directory.
//!
//! ```text
//! cycle_dir/
//!   TileScan 1--Stage00--Z00--C00.tif
//!   TileScan 1--Stage00--Z01--C00.tif
//!   ...
//!   Metadata/
//!     TileScan 1.xml            <Tile FieldX FieldY PosX PosY/> in metres
//!     IOManagerConfiguation.xlif (ignored)
//! ```
//!
//! Each (tile, channel) is the maximum intensity projection of its Z files.
//! A (tile, channel) with no file becomes a zero plane.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::FormatError;
use crate::plane::{PlaneHandle, PlaneShape, TiffPlaneCodec};

use super::adapter::{list_file_names, probe_shape, FormatAdapter, VendorFormat, DEFAULT_PLANE_EDGE};
use super::grammar::{LeicaName, LeicaNaming};
use super::metadata::parse_tile_scan;
use super::record::{Acquisition, Calibration, CycleId, StageCalibration, StagePosition, TileRecord};

/// Candidate names of the metadata sub-directory.
const METADATA_DIRS: [&str; 2] = ["Metadata", "MetaData"];

/// Instrument configuration file that never holds tile positions.
const IGNORED_METADATA: &str = "IOManagerConfiguation.xlif";

/// Adapter for Leica TIFF exports, one directory per cycle.
#[derive(Debug, Clone)]
pub struct LeicaExportAdapter {
    cycle_dirs: Vec<PathBuf>,
    naming: LeicaNaming,
    stage: StageCalibration,
    calibration: Calibration,
    default_shape: PlaneShape,
    codec: TiffPlaneCodec,
}

impl LeicaExportAdapter {
    /// Create an adapter; the directory at index `i` is cycle `i + 1`.
    pub fn new(
        cycle_dirs: Vec<PathBuf>,
        naming: LeicaNaming,
        stage: StageCalibration,
        calibration: Calibration,
    ) -> Self {
        Self {
            cycle_dirs,
            naming,
            stage,
            calibration,
            default_shape: PlaneShape::new(DEFAULT_PLANE_EDGE, DEFAULT_PLANE_EDGE),
            codec: TiffPlaneCodec::new(),
        }
    }

    pub fn with_default_shape(mut self, shape: PlaneShape) -> Self {
        self.default_shape = shape;
        self
    }

    pub fn naming(&self) -> LeicaNaming {
        self.naming
    }

    fn cycle_dir(&self, cycle: CycleId) -> Result<&Path, FormatError> {
        (cycle.cycle as usize)
            .checked_sub(1)
            .and_then(|index| self.cycle_dirs.get(index))
            .map(PathBuf::as_path)
            .ok_or_else(|| FormatError::MissingMetadata {
                cycle,
                reason: "no input directory for this cycle".to_string(),
            })
    }

    async fn parsed_files(&self, dir: &Path) -> Result<Vec<(String, LeicaName)>, FormatError> {
        let names = list_file_names(dir).await?;
        Ok(names
            .into_iter()
            .filter_map(|name| self.naming.parse(&name).map(|parsed| (name, parsed)))
            .collect())
    }

    /// Locate the tile-scan document for a region.
    ///
    /// `Region1` matches `Region1.xml` and `Region1_Properties.xml`, never
    /// `Region10.xml`.
    async fn find_metadata(
        &self,
        dir: &Path,
        region: &str,
        cycle: CycleId,
    ) -> Result<PathBuf, FormatError> {
        for sub in METADATA_DIRS {
            let meta_dir = dir.join(sub);
            let Ok(names) = list_file_names(&meta_dir).await else {
                continue;
            };
            let mut candidates: Vec<&String> = names
                .iter()
                .filter(|n| n.as_str() != IGNORED_METADATA && names_region(n, region))
                .collect();
            // Prefer plain XML over other attachments
            candidates.sort_by_key(|n| !n.ends_with(".xml"));
            if let Some(name) = candidates.first() {
                return Ok(meta_dir.join(name.as_str()));
            }
        }

        Err(FormatError::MissingMetadata {
            cycle,
            reason: format!(
                "no tile-scan metadata for region {:?} under {}",
                region,
                dir.display()
            ),
        })
    }
}

/// Sorted distinct region names.
fn regions_of(files: &[(String, LeicaName)]) -> Vec<String> {
    let regions: BTreeSet<&str> = files.iter().map(|(_, p)| p.region.as_str()).collect();
    regions.into_iter().map(str::to_string).collect()
}

#[async_trait]
impl FormatAdapter for LeicaExportAdapter {
    fn vendor(&self) -> VendorFormat {
        VendorFormat::LeicaExport
    }

    async fn discover(&self) -> Result<Vec<CycleId>, FormatError> {
        let mut ids = Vec::new();
        for (index, dir) in self.cycle_dirs.iter().enumerate() {
            let cycle = index as u32 + 1;
            let regions = regions_of(&self.parsed_files(dir).await?);
            match regions.len() {
                0 => debug!("No {} files in {}", self.naming.name(), dir.display()),
                1 => ids.push(CycleId::new(cycle)),
                n => ids.extend((1..=n as u32).map(|r| CycleId::in_region(cycle, r))),
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn load_cycle(&self, cycle: CycleId) -> Result<Acquisition, FormatError> {
        let dir = self.cycle_dir(cycle)?;
        let files = self.parsed_files(dir).await?;
        let regions = regions_of(&files);

        let region = match (cycle.region, regions.len()) {
            (_, 0) => {
                return Err(FormatError::MissingMetadata {
                    cycle,
                    reason: format!("no {} plane files in {}", self.naming.name(), dir.display()),
                })
            }
            (None, 1) => regions[0].clone(),
            (None, n) => {
                return Err(FormatError::UnsupportedLayout {
                    reason: format!("{} holds {} regions; a region index is required", dir.display(), n),
                })
            }
            (Some(r), _) => regions
                .get((r as usize).saturating_sub(1))
                .cloned()
                .ok_or_else(|| FormatError::MissingMetadata {
                    cycle,
                    reason: format!("region {} not present in {}", r, dir.display()),
                })?,
        };

        let meta_path = self.find_metadata(dir, &region, cycle).await?;
        let xml = tokio::fs::read_to_string(&meta_path)
            .await
            .map_err(|e| FormatError::MissingMetadata {
                cycle,
                reason: format!("cannot read {}: {}", meta_path.display(), e),
            })?;
        let entries = parse_tile_scan(&xml, &meta_path.display().to_string())?;

        // tile token -> channel token -> z token -> path
        let mut layout: BTreeMap<u32, BTreeMap<u32, BTreeMap<u32, PathBuf>>> = BTreeMap::new();
        let mut channel_tokens = BTreeSet::new();
        for (name, parsed) in files.iter().filter(|(_, p)| p.region == region) {
            channel_tokens.insert(parsed.channel);
            layout
                .entry(parsed.tile)
                .or_default()
                .entry(parsed.channel)
                .or_default()
                .insert(parsed.z, dir.join(name));
        }

        if entries.len() < layout.len() {
            return Err(FormatError::MissingMetadata {
                cycle,
                reason: format!(
                    "{} lists {} stage positions for {} tiles",
                    meta_path.display(),
                    entries.len(),
                    layout.len()
                ),
            });
        }

        let candidates: Vec<PathBuf> = layout
            .values()
            .flat_map(|channels| channels.values())
            .flat_map(|stack| stack.values().cloned())
            .take(4)
            .collect();
        let shape = probe_shape(&candidates, &self.codec, self.default_shape).await;

        let depths: BTreeSet<usize> = layout
            .values()
            .flat_map(|channels| channels.values().map(BTreeMap::len))
            .collect();
        if depths.len() > 1 {
            debug!("{}: variable depth across tiles, observed {:?}", cycle, depths);
        }

        let mut acquisition = Acquisition::new(cycle, VendorFormat::LeicaExport, self.calibration);
        for ((tile, channels), entry) in layout.values().enumerate().zip(&entries) {
            let position = StagePosition::Metres {
                x: entry.pos_x,
                y: entry.pos_y,
            }
            .to_pixels(self.stage);

            for (channel, token) in channel_tokens.iter().enumerate() {
                let stack: Vec<PathBuf> = channels
                    .get(token)
                    .map(|zs| zs.values().cloned().collect())
                    .unwrap_or_default();
                let plane = PlaneHandle::depth_files(stack, shape);
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

        info!(
            "Normalized {} Leica records for {} (region {:?}, {} tiles, {} channels)",
            acquisition.len(),
            cycle,
            region,
            layout.len(),
            channel_tokens.len()
        );
        Ok(acquisition)
    }
}

/// True when `region` occurs in `name` without a digit on either side.
fn names_region(name: &str, region: &str) -> bool {
    if region.is_empty() {
        return false;
    }
    name.match_indices(region).any(|(start, _)| {
        let before = name[..start].chars().next_back();
        let after = name[start + region.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    })
}
