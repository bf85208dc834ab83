use std::path::Path;

use thiserror::Error;

use crate::format::CycleId;

/// I/O errors that can occur when touching the local filesystem
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error reading a file or directory listing
    #[error("Read error at {path}: {message}")]
    Read { path: String, message: String },

    /// Error writing or renaming a file
    #[error("Write error at {path}: {message}")]
    Write { path: String, message: String },

    /// Error creating an output directory
    #[error("Cannot create directory {path}: {message}")]
    CreateDir { path: String, message: String },

    /// File or directory not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IoError {
    /// Classify a `std::io::Error` raised while reading `path`.
    pub fn read(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            IoError::NotFound(path.display().to_string())
        } else {
            IoError::Read {
                path: path.display().to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Wrap a `std::io::Error` raised while writing `path`.
    pub fn write(path: &Path, err: std::io::Error) -> Self {
        IoError::Write {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Wrap a `std::io::Error` raised while creating `path`.
    pub fn create_dir(path: &Path, err: std::io::Error) -> Self {
        IoError::CreateDir {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors raised while reading or producing a single 2-D plane
#[derive(Debug, Clone, Error)]
pub enum PlaneError {
    /// Source exists but could not be read or is not a valid image
    #[error("Corrupt plane {source_id}: {message}")]
    Corrupt { source_id: String, message: String },

    /// Source file does not exist
    #[error("Missing plane {0}")]
    Missing(String),

    /// Decoder rejected the data
    #[error("Failed to decode plane: {message}")]
    Decode { message: String },

    /// Encoder rejected the data
    #[error("Failed to encode plane: {message}")]
    Encode { message: String },

    /// Two planes that must agree in shape do not
    #[error("Plane shape mismatch: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    ShapeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Projection requested over zero planes
    #[error("Cannot project an empty depth stack")]
    EmptyStack,

    /// Depth index outside the stack
    #[error("Depth index {z} out of range (depth is {depth})")]
    DepthOutOfRange { z: usize, depth: usize },
}

/// Errors raised by a format adapter while building tile records
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while listing or reading source files
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Stage-position metadata for a cycle is absent or unreadable
    #[error("Missing metadata for {cycle}: {reason}")]
    MissingMetadata { cycle: CycleId, reason: String },

    /// Metadata exists but an attribute is malformed
    #[error("Invalid metadata in {source_id}: {message}")]
    InvalidMetadata { source_id: String, message: String },

    /// A filename did not match the vendor grammar
    #[error("Filename does not match {grammar} grammar: {name}")]
    InvalidFilename { grammar: &'static str, name: String },

    /// Directory layout matches none of the supported vendor conventions
    #[error("Unsupported layout: {reason}")]
    UnsupportedLayout { reason: String },

    /// Plane-level failure that could not be absorbed
    #[error("Plane error: {0}")]
    Plane(#[from] PlaneError),
}

/// Errors raised while validating and ordering an acquisition
#[derive(Debug, Clone, Error)]
pub enum ManifestError {
    /// No tile records were produced for the cycle
    #[error("Acquisition {cycle} has no tile records")]
    EmptyAcquisition { cycle: CycleId },

    /// Tiles within one cycle disagree on their channel count
    #[error("Channel count mismatch in {cycle}: tile {tile} has {actual} channels, expected {expected}")]
    ChannelCountMismatch {
        cycle: CycleId,
        tile: usize,
        expected: usize,
        actual: usize,
    },

    /// The same (tile, channel) pair was reported twice
    #[error("Duplicate record in {cycle}: tile {tile}, channel {channel}")]
    DuplicateRecord {
        cycle: CycleId,
        tile: usize,
        channel: usize,
    },
}

/// Errors raised while writing a mosaic container
#[derive(Debug, Clone, Error)]
pub enum MosaicError {
    /// I/O error while writing the container or sidecar
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Manifest validation failed
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// A plane could not be produced
    #[error("Plane error: {0}")]
    Plane(#[from] PlaneError),

    /// Planes within a cycle stack disagree in shape
    #[error("Dimension mismatch in {cycle} at tile {tile}, channel {channel}: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    DimensionMismatch {
        cycle: CycleId,
        tile: usize,
        channel: usize,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// The TIFF encoder rejected a page
    #[error("Container encode error: {message}")]
    Encode { message: String },
}

/// Errors reported by the external stitching collaborator
#[derive(Debug, Clone, Error)]
pub enum StitchError {
    /// Parameters rejected before the stitcher was launched
    #[error("Invalid stitch parameters: {0}")]
    InvalidParams(String),

    /// No mosaic containers were supplied
    #[error("No mosaic containers to stitch in {0}")]
    NoInputs(String),

    /// The stitcher process could not be started
    #[error("Failed to launch stitcher {program}: {message}")]
    Launch { program: String, message: String },

    /// The stitcher ran and reported failure
    #[error("Stitcher failed ({status}): {stderr}")]
    ExternalFailure { status: String, stderr: String },

    /// I/O error while preparing or collecting stitcher files
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Errors raised by the retiling engine
#[derive(Debug, Clone, Error)]
pub enum RetileError {
    /// I/O error while reading the canvas or writing tiles
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Canvas could not be decoded or a tile could not be encoded
    #[error("Plane error: {0}")]
    Plane(#[from] PlaneError),

    /// Tile edge length must be positive
    #[error("Invalid tile size: {0}")]
    InvalidTileSize(u32),

    /// Canvas filename does not encode cycle and channel
    #[error("Cannot derive cycle and channel from canvas name: {0}")]
    InvalidCanvasName(String),

    /// Canvas disagrees with the grid already established for this pass
    #[error("Canvas {name} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        name: String,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Checkpoint record could not be read or written
    #[error("Checkpoint error at {path}: {message}")]
    Checkpoint { path: String, message: String },
}

/// Errors surfaced by the pipeline runner
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Mosaic(#[from] MosaicError),

    #[error(transparent)]
    Stitch(#[from] StitchError),

    #[error(transparent)]
    Retile(#[from] RetileError),
}
