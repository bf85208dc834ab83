//! Maximum intensity projection.
//!
//! Collapses a depth stack into one plane by taking, per pixel, the maximum
//! over all depth planes. Planes can be pushed one at a time so a deep stack
//! never has to be resident in memory at once.

use crate::error::PlaneError;

use super::raster::Plane;

/// Streaming maximum intensity projector.
///
/// # Example
///
/// ```
/// use mosaic_prep::plane::{MaxProjector, Plane};
///
/// let mut projector = MaxProjector::new();
/// projector.push(&Plane::from_fn(2, 2, |x, _| x as u16)).unwrap();
/// projector.push(&Plane::from_fn(2, 2, |_, y| y as u16 * 5)).unwrap();
///
/// let mip = projector.finish().unwrap();
/// assert_eq!(mip.get(1, 0), 1);
/// assert_eq!(mip.get(0, 1), 5);
/// ```
#[derive(Debug, Default)]
pub struct MaxProjector {
    acc: Option<Plane>,
    depth: usize,
}

impl MaxProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one depth plane into the projection.
    ///
    /// Every plane must have the shape of the first one pushed.
    pub fn push(&mut self, plane: &Plane) -> Result<(), PlaneError> {
        match self.acc.as_mut() {
            None => {
                self.acc = Some(plane.clone());
            }
            Some(acc) => {
                if acc.shape() != plane.shape() {
                    return Err(PlaneError::ShapeMismatch {
                        expected_width: acc.width(),
                        expected_height: acc.height(),
                        actual_width: plane.width(),
                        actual_height: plane.height(),
                    });
                }
                for (dst, &src) in acc.raster_mut().iter_mut().zip(plane.as_raw()) {
                    if src > *dst {
                        *dst = src;
                    }
                }
            }
        }
        self.depth += 1;
        Ok(())
    }

    /// Number of planes folded so far.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Return the projected plane.
    pub fn finish(self) -> Result<Plane, PlaneError> {
        self.acc.ok_or(PlaneError::EmptyStack)
    }
}

/// Project a whole depth stack at once.
pub fn max_intensity_projection(stack: &[Plane]) -> Result<Plane, PlaneError> {
    let mut projector = MaxProjector::new();
    for plane in stack {
        projector.push(plane)?;
    }
    projector.finish()
}
