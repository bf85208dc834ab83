//! Container-backed adapters (CZI and LIF).
//!
//! Vendor binary containers are decoded by an external library. This module
//! only defines the random-access contract such a decoder must provide and
//! turns it into canonical tile records:
//!
//! ```text
//! AcquisitionContainer (one per cycle)
//!   ├── dimensions()                 → tiles, channels, plane shape
//!   ├── stage_position(tile, ch)     → pixel bbox origin (CZI) or metres (LIF)
//!   ├── depth(tile, ch)              → number of Z planes
//!   └── read_plane(tile, ch, z)      → one 16-bit plane
//! ```
//!
//! Every (tile, channel) record refers back to its container; the depth
//! stack is projected when the mosaic writer loads the plane.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{FormatError, PlaneError};
use crate::plane::{Plane, PlaneHandle, PlaneShape};

use super::adapter::{FormatAdapter, VendorFormat};
use super::record::{Acquisition, Calibration, CycleId, StageCalibration, StagePosition, TileRecord};

// =============================================================================
// AcquisitionContainer Trait
// =============================================================================

/// Extent of an open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerDimensions {
    pub tiles: usize,
    pub channels: usize,
    pub width: u32,
    pub height: u32,
}

impl ContainerDimensions {
    pub fn shape(&self) -> PlaneShape {
        PlaneShape::new(self.width, self.height)
    }
}

/// Random-access reader over one vendor container.
///
/// Implementations wrap a vendor decoder. All methods may block on I/O.
#[async_trait]
pub trait AcquisitionContainer: Send + Sync {
    /// Identifier for logs (usually the file path).
    fn identifier(&self) -> &str;

    /// Tile count, channel count and plane shape.
    async fn dimensions(&self) -> Result<ContainerDimensions, FormatError>;

    /// Stage position of a tile as stored by the vendor.
    async fn stage_position(&self, tile: usize, channel: usize)
        -> Result<StagePosition, FormatError>;

    /// Number of depth planes for a (tile, channel).
    async fn depth(&self, tile: usize, channel: usize) -> Result<usize, PlaneError>;

    /// Read one depth plane.
    async fn read_plane(&self, tile: usize, channel: usize, z: usize)
        -> Result<Plane, PlaneError>;
}

// =============================================================================
// ContainerAdapter
// =============================================================================

/// Format adapter over a list of containers, one per cycle.
///
/// The container at index `i` is cycle `i + 1`.
pub struct ContainerAdapter {
    vendor: VendorFormat,
    containers: Vec<Arc<dyn AcquisitionContainer>>,
    stage: StageCalibration,
    calibration: Calibration,
}

impl ContainerAdapter {
    /// Adapter for CZI containers, whose positions are pixel bounding boxes.
    pub fn czi(containers: Vec<Arc<dyn AcquisitionContainer>>, calibration: Calibration) -> Self {
        Self {
            vendor: VendorFormat::CziContainer,
            containers,
            stage: StageCalibration::default(),
            calibration,
        }
    }

    /// Adapter for LIF containers, whose positions are stage metres.
    pub fn lif(
        containers: Vec<Arc<dyn AcquisitionContainer>>,
        stage: StageCalibration,
        calibration: Calibration,
    ) -> Self {
        Self {
            vendor: VendorFormat::LifContainer,
            containers,
            stage,
            calibration,
        }
    }

    fn container_for(&self, cycle: CycleId) -> Result<&Arc<dyn AcquisitionContainer>, FormatError> {
        (cycle.cycle as usize)
            .checked_sub(1)
            .and_then(|index| self.containers.get(index))
            .ok_or_else(|| FormatError::MissingMetadata {
                cycle,
                reason: "no container for this cycle".to_string(),
            })
    }
}

#[async_trait]
impl FormatAdapter for ContainerAdapter {
    fn vendor(&self) -> VendorFormat {
        self.vendor
    }

    async fn discover(&self) -> Result<Vec<CycleId>, FormatError> {
        Ok((1..=self.containers.len() as u32).map(CycleId::new).collect())
    }

    async fn load_cycle(&self, cycle: CycleId) -> Result<Acquisition, FormatError> {
        let container = self.container_for(cycle)?;
        let dims = container.dimensions().await?;
        info!(
            "Reading {} from {}: {} tiles x {} channels, {}x{}",
            cycle,
            container.identifier(),
            dims.tiles,
            dims.channels,
            dims.width,
            dims.height
        );

        let mut acquisition = Acquisition::new(cycle, self.vendor, self.calibration);

        for tile in 0..dims.tiles {
            let stage = container
                .stage_position(tile, 0)
                .await
                .map_err(|e| FormatError::MissingMetadata {
                    cycle,
                    reason: format!("tile {} has no stage position: {}", tile, e),
                })?;
            let position = stage.to_pixels(self.stage);
            debug!("Tile {} at ({:.1}, {:.1}) px", tile, position.x, position.y);

            for channel in 0..dims.channels {
                let plane = PlaneHandle::container(Arc::clone(container), tile, channel, dims.shape());
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

        Ok(acquisition)
    }
}
