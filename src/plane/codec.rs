//! TIFF plane codec.
//!
//! Decodes single-plane TIFF files into [`Plane`]s and encodes planes back
//! into standalone 16-bit grayscale TIFF files.
//!
//! # Design Decisions
//!
//! - **Values kept as stored**: 16-bit grayscale passes through untouched and
//!   8-bit grayscale is widened without scaling (`3` stays `3`). Colour,
//!   alpha and floating-point layouts are rejected.
//!
//! - **No resizing**: planes keep their native size. Shape checks happen in
//!   the callers that stack planes together.

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use crate::error::PlaneError;

use super::raster::{Plane, PlaneShape};

/// Size of a classic TIFF header in bytes.
pub const TIFF_HEADER_SIZE: usize = 8;

// =============================================================================
// TIFF Plane Codec
// =============================================================================

/// Codec for single-plane 16-bit TIFF files.
///
/// # Example
///
/// ```ignore
/// use mosaic_prep::plane::TiffPlaneCodec;
///
/// let codec = TiffPlaneCodec::new();
/// let plane = codec.decode(&std::fs::read("tile.tif")?)?;
/// let bytes = codec.encode(&plane)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TiffPlaneCodec {}

impl TiffPlaneCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self {}
    }

    /// Decode a TIFF stream into a plane.
    ///
    /// # Errors
    ///
    /// Returns `PlaneError::Decode` if:
    /// - The data does not start with a TIFF or BigTIFF header
    /// - The decoder rejects the stream
    /// - The samples are not single-channel 8- or 16-bit integers
    pub fn decode(&self, source: &[u8]) -> Result<Plane, PlaneError> {
        if !is_tiff_header(source) {
            return Err(PlaneError::Decode {
                message: "not a TIFF stream".to_string(),
            });
        }

        let mut reader = ImageReader::with_format(Cursor::new(source), ImageFormat::Tiff);
        // Stitched canvases routinely exceed the default allocation limit
        reader.no_limits();
        let img = reader.decode().map_err(|e| PlaneError::Decode {
            message: e.to_string(),
        })?;

        match img {
            DynamicImage::ImageLuma16(buffer) => Ok(Plane::from(buffer)),
            DynamicImage::ImageLuma8(buffer) => Ok(Plane::from_fn(
                buffer.width(),
                buffer.height(),
                |x, y| u16::from(buffer.get_pixel(x, y).0[0]),
            )),
            other => Err(PlaneError::Decode {
                message: format!("unsupported sample layout {:?}", other.color()),
            }),
        }
    }

    /// Encode a plane as an uncompressed 16-bit grayscale TIFF.
    pub fn encode(&self, plane: &Plane) -> Result<Bytes, PlaneError> {
        let mut output = Vec::new();
        plane
            .raster()
            .write_to(&mut Cursor::new(&mut output), ImageFormat::Tiff)
            .map_err(|e| PlaneError::Encode {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }

    /// Get plane dimensions without decoding pixel data.
    pub fn dimensions(&self, source: &[u8]) -> Result<PlaneShape, PlaneError> {
        if !is_tiff_header(source) {
            return Err(PlaneError::Decode {
                message: "not a TIFF stream".to_string(),
            });
        }

        let reader = ImageReader::with_format(Cursor::new(source), ImageFormat::Tiff);
        let (width, height) = reader.into_dimensions().map_err(|e| PlaneError::Decode {
            message: e.to_string(),
        })?;

        Ok(PlaneShape::new(width, height))
    }

    /// Read plane dimensions from a file's header, leaving pixel data unread.
    pub fn file_dimensions(&self, path: &Path) -> Result<PlaneShape, PlaneError> {
        let source_id = path.display().to_string();
        let mut reader = ImageReader::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PlaneError::Missing(source_id.clone()),
            _ => PlaneError::Corrupt {
                source_id: source_id.clone(),
                message: e.to_string(),
            },
        })?;
        reader.set_format(ImageFormat::Tiff);
        let (width, height) = reader.into_dimensions().map_err(|e| PlaneError::Corrupt {
            source_id,
            message: e.to_string(),
        })?;

        Ok(PlaneShape::new(width, height))
    }
}

/// Check if bytes start with a valid TIFF or BigTIFF header.
///
/// This is a quick check that can be used before attempting full decoding.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    let version = match [bytes[0], bytes[1]] {
        [0x49, 0x49] => u16::from_le_bytes([bytes[2], bytes[3]]),
        [0x4D, 0x4D] => u16::from_be_bytes([bytes[2], bytes[3]]),
        _ => return false,
    };

    version == 42 || version == 43
}

// =============================================================================
// Tests
// =============================================================================
