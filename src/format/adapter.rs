//! The format adapter contract shared by every vendor variant.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{FormatError, IoError};
use crate::plane::{read_file_bytes, PlaneShape, TiffPlaneCodec};

use super::record::{Acquisition, CycleId};

/// Default expected plane edge when a source cannot be probed.
pub const DEFAULT_PLANE_EDGE: u32 = 2048;

// =============================================================================
// VendorFormat
// =============================================================================

/// Vendor export conventions understood by the adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorFormat {
    /// Zeiss ZEN TIFF export with `ExportDocument` bounds metadata
    ZenExport,

    /// Leica TIFF export with `TileScanInfo` metadata and per-Z files
    LeicaExport,

    /// Zeiss CZI container read through a decoder collaborator
    CziContainer,

    /// Leica LIF container read through a decoder collaborator
    LifContainer,
}

impl VendorFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            VendorFormat::ZenExport => "ZEN TIFF export",
            VendorFormat::LeicaExport => "Leica TIFF export",
            VendorFormat::CziContainer => "CZI container",
            VendorFormat::LifContainer => "LIF container",
        }
    }
}

// =============================================================================
// FormatAdapter Trait
// =============================================================================

/// Normalizes one vendor's files and metadata into canonical tile records.
///
/// Implementations discover the units of work available in their source
/// and produce one [`Acquisition`] per unit. Positions are returned in
/// pixel units; origin normalization is left to the manifest builder.
#[async_trait]
pub trait FormatAdapter: Send + Sync {
    /// The vendor convention this adapter reads.
    fn vendor(&self) -> VendorFormat;

    /// List every cycle (and region) available in the source, sorted.
    async fn discover(&self) -> Result<Vec<CycleId>, FormatError>;

    /// Build the tile records of one cycle.
    ///
    /// # Errors
    ///
    /// `FormatError::MissingMetadata` when the cycle's stage positions
    /// cannot be determined. Unreadable planes are not errors here; they
    /// are zero-filled when loaded.
    async fn load_cycle(&self, cycle: CycleId) -> Result<Acquisition, FormatError>;
}

// =============================================================================
// Shared helpers
// =============================================================================

/// List regular file names in a directory, sorted, skipping `._` resource forks.
pub(crate) async fn list_file_names(dir: &Path) -> Result<Vec<String>, IoError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| IoError::read(dir, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IoError::read(dir, e))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("._") {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Determine the plane shape of a source by reading the first decodable file.
///
/// Falls back to `default` when none of the candidates can be read.
pub(crate) async fn probe_shape(
    candidates: &[PathBuf],
    codec: &TiffPlaneCodec,
    default: PlaneShape,
) -> PlaneShape {
    for path in candidates {
        let Ok(bytes) = read_file_bytes(path).await else {
            continue;
        };
        if let Ok(shape) = codec.dimensions(&bytes) {
            debug!("Probed plane shape {} from {}", shape, path.display());
            return shape;
        }
    }
    default
}
