//! Configuration management for mosaic-prep.
//!
//! This module provides the command-line interface:
//! - Subcommands for each pipeline stage plus `run` for all of them
//! - Environment variables with `MOSAIC_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use mosaic_prep::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Command::Retile(config) => println!("tiles of {}px", config.retile.tile_size()),
//!     _ => {}
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `MOSAIC_VENDOR` - Source layout: auto, zen, leica, leica-exported (default: auto)
//! - `MOSAIC_OUTPUT` - Output root directory
//! - `MOSAIC_PIXEL_SIZE` - Physical pixel size in µm (default: 0.1625)
//! - `MOSAIC_STAGE_METRES_PER_PIXEL` - Leica stage calibration (default: 3.21e-7)
//! - `MOSAIC_STITCHER` - Stitcher executable (default: ashlar)
//! - `MOSAIC_ALIGN_CHANNEL` - Alignment channel (default: 1, `run`: 4)
//! - `MOSAIC_TILE_SIZE` - Retile edge length (default: 2000, `run`: 6000)
//! - `MOSAIC_CANVAS_NAMING` - Stitched canvas names: round, legacy-stitched (default: round)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::format::{
    Calibration, StageCalibration, VendorLayout, DEFAULT_LEICA_METRES_PER_PIXEL,
    DEFAULT_PIXEL_SIZE_UM, DEFAULT_PLANE_EDGE,
};
use crate::pipeline::AdapterOptions;
use crate::plane::PlaneShape;
use crate::retile::CanvasNaming;
use crate::stitch::{
    StitchParams, DEFAULT_ALIGN_CHANNEL, DEFAULT_FILENAME_FORMAT, DEFAULT_FILTER_SIGMA,
    DEFAULT_MAXIMUM_SHIFT, DEFAULT_STITCHER_PROGRAM,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default retile edge length for the `retile` command.
pub const DEFAULT_TILE_SIZE: u32 = 2000;

/// Default retile edge length for the `run` command.
pub const DEFAULT_RUN_TILE_SIZE: u32 = 6000;

/// Default alignment channel for the `run` command.
pub const DEFAULT_RUN_ALIGN_CHANNEL: usize = 4;

/// Default padding value for retiled canvases.
pub const DEFAULT_FILL: u16 = 0;

// =============================================================================
// CLI Arguments
// =============================================================================

/// mosaic-prep - Microscopy tile preprocessing.
///
/// Normalizes vendor tile exports into OME-TIFF mosaics, hands them to an
/// external stitcher, and retiles the stitched canvases into a fixed grid.
#[derive(Parser, Debug, Clone)]
#[command(name = "mosaic-prep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Assemble one OME-TIFF mosaic per cycle
    Mosaic(MosaicConfig),

    /// Stitch existing mosaics with the external stitcher
    Stitch(StitchConfig),

    /// Cut stitched canvases into fixed-size tiles
    Retile(RetileConfig),

    /// Mosaic, stitch and retile in one go
    Run(RunConfig),
}

/// Source layout argument for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum VendorArg {
    /// Detect from the first input directory
    #[default]
    Auto,
    /// ZEN TIFF export
    Zen,
    /// Leica navigator TIFF export
    Leica,
    /// Leica exported TIFF naming
    LeicaExported,
}

impl VendorArg {
    /// Explicit layout, or `None` to detect.
    pub fn layout(self) -> Option<VendorLayout> {
        match self {
            VendorArg::Auto => None,
            VendorArg::Zen => Some(VendorLayout::Zen),
            VendorArg::Leica => Some(VendorLayout::LeicaNavigator),
            VendorArg::LeicaExported => Some(VendorLayout::LeicaExported),
        }
    }
}

/// Stitched canvas naming argument for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum CanvasNamingArg {
    /// `Round{cycle}_{channel}.tif`, 0-based
    #[default]
    Round,
    /// `Base_{cycle}_stitched-{channel}.tif`, 1-based
    LegacyStitched,
}

impl CanvasNamingArg {
    pub fn naming(self) -> CanvasNaming {
        match self {
            CanvasNamingArg::Round => CanvasNaming::Round,
            CanvasNamingArg::LegacyStitched => CanvasNaming::LegacyStitched,
        }
    }
}

// =============================================================================
// Shared argument groups
// =============================================================================

/// Where the raw tiles come from and how they are calibrated.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Input directories: one ZEN export, or one Leica directory per cycle.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Source layout.
    #[arg(long, value_enum, default_value_t = VendorArg::Auto, env = "MOSAIC_VENDOR")]
    pub vendor: VendorArg,

    /// Physical pixel size written into the mosaics, in µm.
    #[arg(long, default_value_t = DEFAULT_PIXEL_SIZE_UM, env = "MOSAIC_PIXEL_SIZE")]
    pub pixel_size: f64,

    /// Leica stage calibration, in metres per pixel.
    #[arg(long, default_value_t = DEFAULT_LEICA_METRES_PER_PIXEL, env = "MOSAIC_STAGE_METRES_PER_PIXEL")]
    pub stage_metres_per_pixel: f64,

    /// Plane width used when a plane has to be zero-filled.
    #[arg(long, default_value_t = DEFAULT_PLANE_EDGE)]
    pub plane_width: u32,

    /// Plane height used when a plane has to be zero-filled.
    #[arg(long, default_value_t = DEFAULT_PLANE_EDGE)]
    pub plane_height: u32,

    /// Write a TileScanInfo sidecar next to each mosaic.
    #[arg(long, default_value_t = false)]
    pub sidecar: bool,
}

impl SourceArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.inputs.is_empty() {
            return Err("at least one input directory is required".to_string());
        }
        if !(self.pixel_size > 0.0) {
            return Err(format!("pixel size must be positive, got {}", self.pixel_size));
        }
        if !(self.stage_metres_per_pixel > 0.0) {
            return Err(format!(
                "stage calibration must be positive, got {}",
                self.stage_metres_per_pixel
            ));
        }
        if self.plane_width == 0 || self.plane_height == 0 {
            return Err("plane width and height must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn adapter_options(&self) -> AdapterOptions {
        AdapterOptions {
            calibration: Calibration::new(self.pixel_size),
            stage: StageCalibration::new(self.stage_metres_per_pixel),
            plane_shape: PlaneShape::new(self.plane_width, self.plane_height),
        }
    }
}

/// External stitcher settings.
#[derive(Args, Debug, Clone)]
pub struct StitchArgs {
    /// Stitcher executable.
    #[arg(long, default_value = DEFAULT_STITCHER_PROGRAM, env = "MOSAIC_STITCHER")]
    pub stitcher: PathBuf,

    /// Channel used for registration (0-based).
    #[arg(long, env = "MOSAIC_ALIGN_CHANNEL")]
    pub align_channel: Option<usize>,

    /// Flip tile positions along X.
    #[arg(long, default_value_t = false)]
    pub flip_x: bool,

    /// Flip tile positions along Y.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub flip_y: bool,

    /// Maximum tile shift during alignment, in µm.
    #[arg(long, default_value_t = DEFAULT_MAXIMUM_SHIFT)]
    pub maximum_shift: f64,

    /// Gaussian filter width applied before alignment.
    #[arg(long, default_value_t = DEFAULT_FILTER_SIGMA)]
    pub filter_sigma: f64,

    /// Channels to write (comma-separated); all when omitted.
    #[arg(long, value_delimiter = ',')]
    pub output_channels: Vec<usize>,

    /// Write one pyramidal OME-TIFF instead of per-channel canvases.
    #[arg(long, default_value_t = false)]
    pub pyramid: bool,

    /// Pyramid tile size (requires --pyramid).
    #[arg(long)]
    pub pyramid_tile_size: Option<u32>,

    /// Flat-field profile(s).
    #[arg(long = "ffp")]
    pub flat_field: Vec<PathBuf>,

    /// Dark-field profile(s).
    #[arg(long = "dfp")]
    pub dark_field: Vec<PathBuf>,
}

impl StitchArgs {
    pub fn params(&self, default_align_channel: usize) -> StitchParams {
        StitchParams {
            align_channel: self.align_channel.unwrap_or(default_align_channel),
            flip_x: self.flip_x,
            flip_y: self.flip_y,
            maximum_shift: self.maximum_shift,
            filter_sigma: self.filter_sigma,
            filename_format: DEFAULT_FILENAME_FORMAT.to_string(),
            output_channels: self.output_channels.clone(),
            pyramid: self.pyramid,
            tile_size: self.pyramid_tile_size,
            flat_field: self.flat_field.clone(),
            dark_field: self.dark_field.clone(),
        }
    }

    /// Checks that do not depend on the inputs; counts are checked at stitch time.
    pub fn validate(&self, default_align_channel: usize) -> Result<(), String> {
        let profiles = self.flat_field.len().max(self.dark_field.len()).max(1);
        self.params(default_align_channel)
            .validate(profiles, None)
            .map_err(|e| e.to_string())
    }
}

/// Retiling settings.
#[derive(Args, Debug, Clone)]
pub struct RetileArgs {
    /// Tile edge length in pixels (default: 2000, `run`: 6000).
    #[arg(long, env = "MOSAIC_TILE_SIZE")]
    pub tile_size: Option<u32>,

    /// Value used to pad canvases on the bottom and right.
    #[arg(long, default_value_t = DEFAULT_FILL)]
    pub fill: u16,

    /// File name grammar of the stitched canvases.
    #[arg(long, value_enum, default_value_t = CanvasNamingArg::Round, env = "MOSAIC_CANVAS_NAMING")]
    pub canvas_naming: CanvasNamingArg,
}

impl RetileArgs {
    pub fn tile_size_or(&self, default: u32) -> u32 {
        self.tile_size.unwrap_or(default)
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size_or(DEFAULT_TILE_SIZE)
    }

    pub fn validate(&self, default: u32) -> Result<(), String> {
        if self.tile_size_or(default) == 0 {
            return Err("tile size must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Per-command configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct MosaicConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output root directory.
    #[arg(short, long, env = "MOSAIC_OUTPUT")]
    pub output: PathBuf,
}

impl MosaicConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()
    }
}

#[derive(Args, Debug, Clone)]
pub struct StitchConfig {
    /// Output root written by `mosaic`.
    #[arg(short, long, env = "MOSAIC_OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub stitch: StitchArgs,
}

impl StitchConfig {
    pub fn params(&self) -> StitchParams {
        self.stitch.params(DEFAULT_ALIGN_CHANNEL)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.stitch.validate(DEFAULT_ALIGN_CHANNEL)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RetileConfig {
    /// Directory holding `Round{cycle}_{channel}.tif` canvases.
    pub canvases: PathBuf,

    /// Directory receiving the tiles and `tilepos.csv`.
    #[arg(short, long, env = "MOSAIC_OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub retile: RetileArgs,
}

impl RetileConfig {
    pub fn tile_size(&self) -> u32 {
        self.retile.tile_size_or(DEFAULT_TILE_SIZE)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.canvases == self.output {
            return Err("canvas and output directories must differ".to_string());
        }
        self.retile.validate(DEFAULT_TILE_SIZE)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output root directory.
    #[arg(short, long, env = "MOSAIC_OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub stitch: StitchArgs,

    #[command(flatten)]
    pub retile: RetileArgs,
}

impl RunConfig {
    pub fn params(&self) -> StitchParams {
        self.stitch.params(DEFAULT_RUN_ALIGN_CHANNEL)
    }

    pub fn tile_size(&self) -> u32 {
        self.retile.tile_size_or(DEFAULT_RUN_TILE_SIZE)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;
        self.stitch.validate(DEFAULT_RUN_ALIGN_CHANNEL)?;
        self.retile.validate(DEFAULT_RUN_TILE_SIZE)
    }
}
