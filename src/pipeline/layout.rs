//! Output directory tree.
//!
//! ```text
//! {root}/
//! ├── R1/                      (only when the source holds several regions)
//! │   └── preprocessing/
//! │       ├── OME_tiffs/       mosaic containers
//! │       ├── stitched/        stitcher output
//! │       └── ReslicedTiles/   retiled canvases + tilepos.csv
//! └── R2/ ...
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::IoError;
use crate::format::CycleId;

pub const PREPROCESSING_DIR: &str = "preprocessing";
pub const MOSAIC_DIR: &str = "OME_tiffs";
pub const STITCHED_DIR: &str = "stitched";
pub const RETILE_DIR: &str = "ReslicedTiles";

/// Explicit description of where every stage writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,

    /// 1-based region numbers; empty for a single-region source
    regions: Vec<u32>,
}

impl OutputLayout {
    /// Single-region layout.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            regions: Vec::new(),
        }
    }

    /// Layout covering every region that appears in `cycles`.
    pub fn for_cycles(root: impl Into<PathBuf>, cycles: &[CycleId]) -> Self {
        let mut regions: Vec<u32> = cycles.iter().filter_map(|c| c.region).collect();
        regions.sort_unstable();
        regions.dedup();
        Self {
            root: root.into(),
            regions,
        }
    }

    /// Rebuild the layout of an existing output root.
    ///
    /// Region directories are recognized as `R{n}` holding a
    /// `preprocessing` directory.
    pub async fn scan(root: impl Into<PathBuf>) -> Result<Self, IoError> {
        let root = root.into();
        let mut entries = tokio::fs::read_dir(&root)
            .await
            .map_err(|e| IoError::read(&root, e))?;

        let mut regions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IoError::read(&root, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(region) = name.strip_prefix('R').and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };
            if tokio::fs::try_exists(entry.path().join(PREPROCESSING_DIR))
                .await
                .unwrap_or(false)
            {
                regions.push(region);
            }
        }
        regions.sort_unstable();

        debug!("Scanned {}: {} regions", root.display(), regions.len());
        Ok(Self { root, regions })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Units of output: `[None]` for a single region, otherwise one per region.
    pub fn regions(&self) -> Vec<Option<u32>> {
        if self.regions.is_empty() {
            vec![None]
        } else {
            self.regions.iter().copied().map(Some).collect()
        }
    }

    pub fn region_root(&self, region: Option<u32>) -> PathBuf {
        match region {
            Some(region) => self.root.join(format!("R{}", region)),
            None => self.root.clone(),
        }
    }

    pub fn preprocessing_dir(&self, region: Option<u32>) -> PathBuf {
        self.region_root(region).join(PREPROCESSING_DIR)
    }

    pub fn mosaic_dir(&self, region: Option<u32>) -> PathBuf {
        self.preprocessing_dir(region).join(MOSAIC_DIR)
    }

    pub fn stitched_dir(&self, region: Option<u32>) -> PathBuf {
        self.preprocessing_dir(region).join(STITCHED_DIR)
    }

    pub fn retile_dir(&self, region: Option<u32>) -> PathBuf {
        self.preprocessing_dir(region).join(RETILE_DIR)
    }

    /// Create the whole tree. Safe to call repeatedly.
    pub async fn ensure(&self) -> Result<(), IoError> {
        for region in self.regions() {
            for dir in [
                self.mosaic_dir(region),
                self.stitched_dir(region),
                self.retile_dir(region),
            ] {
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| IoError::create_dir(&dir, e))?;
            }
        }
        debug!("Output tree ready under {}", self.root.display());
        Ok(())
    }
}
