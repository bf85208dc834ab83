//! # mosaic-prep
//!
//! Preprocessing for multi-cycle fluorescence microscopy.
//!
//! This library turns vendor tile exports into one positioned, calibrated
//! OME-TIFF mosaic per imaging cycle, hands those mosaics to an external
//! stitcher, and cuts the stitched canvases into a fixed grid of equally
//! sized tiles for downstream per-tile analysis.
//!
//! ## Features
//!
//! - **Vendor normalization**: ZEN and Leica TIFF exports plus CZI/LIF
//!   containers, all reduced to the same tile records
//! - **Maximum intensity projection**: volumetric sources collapse to 2-D
//! - **Tolerant loading**: unreadable planes become zero planes, not errors
//! - **Resumable retiling**: a per-cycle checkpoint records finished tiles
//!
//! ## Architecture
//!
//! - [`plane`] - 16-bit planes, TIFF codec, projection, lazy handles
//! - [`mod@format`] - Format adapters and stage-metadata parsers
//! - [`manifest`] - Tile manifest builder and position normalization
//! - [`mosaic`] - OME-TIFF mosaic writer and sidecars
//! - [`stitch`] - External stitcher contract
//! - [`retile`] - Grid retiling, ledger and checkpoint
//! - [`pipeline`] - Output layout and sequential runner
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use mosaic_prep::{build_manifest, Calibration, FormatAdapter, MosaicWriter, ZenExportAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = ZenExportAdapter::new("/data/export", Calibration::default());
//!     let writer = MosaicWriter::new("/data/out/preprocessing/OME_tiffs");
//!
//!     for cycle in adapter.discover().await? {
//!         let manifest = build_manifest(adapter.load_cycle(cycle).await?)?;
//!         writer.write_cycle(&manifest).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod manifest;
pub mod mosaic;
pub mod pipeline;
pub mod plane;
pub mod retile;
pub mod stitch;

// Re-export commonly used types
pub use config::{Cli, Command, MosaicConfig, RetileConfig, RunConfig, StitchConfig, VendorArg};
pub use error::{
    FormatError, IoError, ManifestError, MosaicError, PipelineError, PlaneError, RetileError,
    StitchError,
};
pub use format::{
    classify_names, detect_vendor, Acquisition, AcquisitionContainer, Calibration,
    ContainerAdapter, ContainerDimensions, CycleId, FormatAdapter, LeicaExportAdapter,
    LeicaNaming, PixelPosition, StageCalibration, StagePosition, TileRecord, VendorFormat,
    VendorLayout, ZenExportAdapter,
};
pub use manifest::{build_manifest, PixelOffset, PositionTable, TileManifest};
pub use mosaic::{generate_ome_xml, MosaicOutput, MosaicWriter};
pub use pipeline::{open_adapter, AdapterOptions, OutputLayout, Pipeline, RunReport};
pub use plane::{
    max_intensity_projection, LoadedPlane, MaxProjector, Plane, PlaneHandle, PlaneShape,
    TiffPlaneCodec,
};
pub use retile::{CanvasNaming, Checkpoint, RetileReport, RetiledTile, Retiler, TileGrid};
pub use stitch::{AshlarStitcher, StitchOutput, StitchParams, Stitcher};
