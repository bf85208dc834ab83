//! In-memory 16-bit grayscale planes.

use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use crate::error::PlaneError;

/// Pixel buffer backing a [`Plane`].
pub type Raster = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Width and height of a plane in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaneShape {
    pub width: u32,
    pub height: u32,
}

impl PlaneShape {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in a plane of this shape.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for PlaneShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single 2-D plane of unsigned 16-bit pixels.
///
/// Values are never rescaled or clipped once a plane exists; every
/// producer hands over `u16` samples as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    raster: Raster,
}

impl Plane {
    /// Create a plane filled with zeros.
    pub fn zeros(shape: PlaneShape) -> Self {
        Self::filled(shape, 0)
    }

    /// Create a plane where every pixel has `value`.
    pub fn filled(shape: PlaneShape, value: u16) -> Self {
        Self {
            raster: Raster::from_pixel(shape.width, shape.height, Luma([value])),
        }
    }

    /// Create a plane from row-major samples.
    ///
    /// Fails if `data` does not hold exactly `width * height` samples.
    pub fn from_raw(width: u32, height: u32, data: Vec<u16>) -> Result<Self, PlaneError> {
        let actual = data.len();
        Raster::from_raw(width, height, data)
            .map(|raster| Self { raster })
            .ok_or_else(|| PlaneError::Decode {
                message: format!(
                    "expected {} samples for {}x{}, got {}",
                    width as usize * height as usize,
                    width,
                    height,
                    actual
                ),
            })
    }

    /// Create a plane by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u16) -> Self {
        Self {
            raster: Raster::from_fn(width, height, |x, y| Luma([f(x, y)])),
        }
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn shape(&self) -> PlaneShape {
        PlaneShape::new(self.width(), self.height())
    }

    /// Pixel value at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate is outside the plane.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.raster.get_pixel(x, y).0[0]
    }

    /// Row-major samples.
    pub fn as_raw(&self) -> &[u16] {
        self.raster.as_raw()
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn raster_mut(&mut self) -> &mut Raster {
        &mut self.raster
    }

    pub fn into_raster(self) -> Raster {
        self.raster
    }

    /// True when every sample is zero.
    pub fn is_zero(&self) -> bool {
        self.as_raw().iter().all(|&v| v == 0)
    }
}

impl From<Raster> for Plane {
    fn from(raster: Raster) -> Self {
        Self { raster }
    }
}
