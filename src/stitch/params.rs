//! Stitcher parameters.

use std::path::PathBuf;

use crate::error::StitchError;

/// Default alignment channel.
pub const DEFAULT_ALIGN_CHANNEL: usize = 1;

/// Default maximum shift between neighbouring tiles, in µm.
pub const DEFAULT_MAXIMUM_SHIFT: f64 = 500.0;

/// Default width of the Gaussian pre-filter, in pixels.
pub const DEFAULT_FILTER_SIGMA: f64 = 5.0;

/// Default output file name pattern.
pub const DEFAULT_FILENAME_FORMAT: &str = "Round{cycle}_{channel}.tif";

/// Parameters passed to the external stitcher.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchParams {
    /// Channel used for registration (0-based)
    pub align_channel: usize,

    pub flip_x: bool,
    pub flip_y: bool,

    /// Maximum allowed tile shift during alignment, in µm
    pub maximum_shift: f64,

    /// Gaussian filter width applied before alignment
    pub filter_sigma: f64,

    /// Output pattern with `{cycle}` and `{channel}` placeholders
    pub filename_format: String,

    /// Channels to write; empty means all
    pub output_channels: Vec<usize>,

    /// Write a single pyramidal OME-TIFF instead of per-channel files
    pub pyramid: bool,

    /// Pyramid tile size; only valid with `pyramid`
    pub tile_size: Option<u32>,

    /// Flat-field profiles: none, one shared, or one per input
    pub flat_field: Vec<PathBuf>,

    /// Dark-field profiles: none, one shared, or one per input
    pub dark_field: Vec<PathBuf>,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            align_channel: DEFAULT_ALIGN_CHANNEL,
            flip_x: false,
            flip_y: true,
            maximum_shift: DEFAULT_MAXIMUM_SHIFT,
            filter_sigma: DEFAULT_FILTER_SIGMA,
            filename_format: DEFAULT_FILENAME_FORMAT.to_string(),
            output_channels: Vec::new(),
            pyramid: false,
            tile_size: None,
            flat_field: Vec::new(),
            dark_field: Vec::new(),
        }
    }
}

impl StitchParams {
    /// Validate against the inputs about to be stitched.
    ///
    /// `channel_count` is checked only when known.
    pub fn validate(&self, input_count: usize, channel_count: Option<usize>) -> Result<(), StitchError> {
        if self.tile_size.is_some() && !self.pyramid {
            return Err(StitchError::InvalidParams(
                "tile size can only be used with pyramid output".to_string(),
            ));
        }

        if self.tile_size == Some(0) {
            return Err(StitchError::InvalidParams("tile size must be positive".to_string()));
        }

        if !(self.maximum_shift > 0.0) {
            return Err(StitchError::InvalidParams(format!(
                "maximum shift must be positive, got {}",
                self.maximum_shift
            )));
        }

        if !(self.filter_sigma >= 0.0) {
            return Err(StitchError::InvalidParams(format!(
                "filter sigma must be non-negative, got {}",
                self.filter_sigma
            )));
        }

        if !self.pyramid
            && !(self.filename_format.contains("{cycle}") && self.filename_format.contains("{channel}"))
        {
            return Err(StitchError::InvalidParams(format!(
                "filename format {:?} must contain {{cycle}} and {{channel}}",
                self.filename_format
            )));
        }

        if let Some(channels) = channel_count {
            if self.align_channel >= channels {
                return Err(StitchError::InvalidParams(format!(
                    "alignment channel {} out of range for {} channels",
                    self.align_channel, channels
                )));
            }
            if let Some(bad) = self.output_channels.iter().find(|&&c| c >= channels) {
                return Err(StitchError::InvalidParams(format!(
                    "output channel {} out of range for {} channels",
                    bad, channels
                )));
            }
        }

        for (label, profiles) in [("flat-field", &self.flat_field), ("dark-field", &self.dark_field)] {
            if !matches!(profiles.len(), 0 | 1) && profiles.len() != input_count {
                return Err(StitchError::InvalidParams(format!(
                    "wrong number of {} profiles: must be 1 or {}",
                    label, input_count
                )));
            }
        }

        Ok(())
    }
}
