//! Canonical tile records produced by every format adapter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plane::PlaneHandle;

use super::adapter::VendorFormat;

// =============================================================================
// Calibration
// =============================================================================

/// Default physical pixel size embedded in mosaic containers, in µm.
pub const DEFAULT_PIXEL_SIZE_UM: f64 = 0.1625;

/// Default stage calibration for Leica tile-scan metadata, in metres per pixel.
pub const DEFAULT_LEICA_METRES_PER_PIXEL: f64 = 0.000_000_321;

/// Physical pixel size of the output mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Micrometres per pixel, applied to both axes
    pub pixel_size_um: f64,
}

impl Calibration {
    pub const fn new(pixel_size_um: f64) -> Self {
        Self { pixel_size_um }
    }

    /// Physical unit label written alongside the pixel size.
    pub const fn unit(&self) -> &'static str {
        "µm"
    }

    /// Convert a pixel offset into micrometres.
    #[inline]
    pub fn to_physical_um(&self, pixels: u64) -> f64 {
        pixels as f64 * self.pixel_size_um
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(DEFAULT_PIXEL_SIZE_UM)
    }
}

/// Conversion from stage coordinates in metres to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageCalibration {
    pub metres_per_pixel: f64,
}

impl StageCalibration {
    pub const fn new(metres_per_pixel: f64) -> Self {
        Self { metres_per_pixel }
    }
}

impl Default for StageCalibration {
    fn default() -> Self {
        Self::new(DEFAULT_LEICA_METRES_PER_PIXEL)
    }
}

// =============================================================================
// Positions
// =============================================================================

/// Raw tile position in pixel units, before origin normalization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPosition {
    pub x: f64,
    pub y: f64,
}

impl PixelPosition {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Stage position as reported by a vendor source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StagePosition {
    /// Already in pixels (e.g. a tile bounding box origin)
    Pixels { x: f64, y: f64 },

    /// Physical stage coordinates in metres
    Metres { x: f64, y: f64 },
}

impl StagePosition {
    /// Canonicalize into pixel units.
    pub fn to_pixels(self, stage: StageCalibration) -> PixelPosition {
        match self {
            StagePosition::Pixels { x, y } => PixelPosition::new(x, y),
            StagePosition::Metres { x, y } => PixelPosition::new(
                x / stage.metres_per_pixel,
                y / stage.metres_per_pixel,
            ),
        }
    }
}

// =============================================================================
// Cycle identity
// =============================================================================

/// Identifies one unit of work: an imaging cycle, optionally within a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CycleId {
    /// 1-based imaging cycle
    pub cycle: u32,

    /// 1-based scan region when a source holds more than one
    pub region: Option<u32>,
}

impl CycleId {
    pub const fn new(cycle: u32) -> Self {
        Self {
            cycle,
            region: None,
        }
    }

    pub const fn in_region(cycle: u32, region: u32) -> Self {
        Self {
            cycle,
            region: Some(region),
        }
    }

    /// File stem shared by every artifact written for this cycle.
    pub fn file_stem(&self) -> String {
        format!("cycle_{}", self.cycle)
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.region {
            Some(region) => write!(f, "cycle {} (region {})", self.cycle, region),
            None => write!(f, "cycle {}", self.cycle),
        }
    }
}

// =============================================================================
// TileRecord / Acquisition
// =============================================================================

/// One (tile, channel) plane of an acquisition.
#[derive(Debug, Clone)]
pub struct TileRecord {
    pub cycle: CycleId,

    /// 0-based channel index after sorting by channel token
    pub channel: usize,

    /// Tile index in acquisition order
    pub tile: usize,

    /// Raw position in pixels
    pub position: PixelPosition,

    /// Deferred pixel source
    pub plane: PlaneHandle,

    /// Source identifier for logs
    pub source: String,
}

/// Every tile record for one metadata source.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub id: CycleId,
    pub vendor: VendorFormat,
    pub calibration: Calibration,
    pub records: Vec<TileRecord>,
}

impl Acquisition {
    pub fn new(id: CycleId, vendor: VendorFormat, calibration: Calibration) -> Self {
        Self {
            id,
            vendor,
            calibration,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: TileRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
