//! Plane layer.
//!
//! Everything the pipeline moves around is a 2-D plane of unsigned 16-bit
//! pixels. This module provides:
//!
//! - [`Plane`] / [`PlaneShape`]: the in-memory raster
//! - [`TiffPlaneCodec`]: single-plane TIFF decode/encode
//! - [`MaxProjector`]: maximum intensity projection over a depth stack
//! - [`PlaneHandle`]: lazy reference to a plane, materialized on demand
//!   with zero-fill recovery for missing or corrupt sources

mod codec;
mod handle;
mod projection;
mod raster;

pub use codec::{is_tiff_header, TiffPlaneCodec, TIFF_HEADER_SIZE};
pub use handle::{
    read_file_bytes, read_plane_dimensions, read_plane_file, LoadedPlane, PlaneHandle,
    PlaneSource,
};
pub use projection::{max_intensity_projection, MaxProjector};
pub use raster::{Plane, PlaneShape, Raster};
