//! Format adapters for vendor microscopy exports.
//!
//! Every vendor stores tiles, channels and stage positions differently. The
//! adapters in this module reconcile those conventions into one canonical
//! shape: a list of [`TileRecord`]s per cycle, positioned in pixels.
//!
//! # Supported sources
//!
//! | Variant | Adapter | Positions |
//! |---|---|---|
//! | ZEN TIFF export | [`ZenExportAdapter`] | `Bounds` pixels |
//! | Leica TIFF export | [`LeicaExportAdapter`] | `Tile PosX/PosY` metres |
//! | CZI container | [`ContainerAdapter::czi`] | pixel bounding boxes |
//! | LIF container | [`ContainerAdapter::lif`] | stage metres |
//!
//! # Layout Detection
//!
//! Use [`detect_vendor`] to classify a TIFF export directory before picking
//! an adapter.

mod adapter;
mod container;
pub mod detect;
pub mod grammar;
mod leica;
pub mod metadata;
mod record;
mod zen;

pub(crate) use adapter::list_file_names;
pub use adapter::{FormatAdapter, VendorFormat, DEFAULT_PLANE_EDGE};
pub use container::{AcquisitionContainer, ContainerAdapter, ContainerDimensions};
pub use detect::{classify_names, detect_vendor, VendorLayout};
pub use grammar::LeicaNaming;
pub use leica::LeicaExportAdapter;
pub use record::{
    Acquisition, Calibration, CycleId, PixelPosition, StageCalibration, StagePosition,
    TileRecord, DEFAULT_LEICA_METRES_PER_PIXEL, DEFAULT_PIXEL_SIZE_UM,
};
pub use zen::{zen_info_file_name, ZenExportAdapter};
