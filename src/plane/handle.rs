//! Lazy plane handles.
//!
//! A [`PlaneHandle`] records where a tile/channel plane comes from without
//! reading it. The mosaic writer materializes handles one tile at a time.
//!
//! Loading is tolerant: a missing or unreadable source yields a zero plane
//! of the expected shape instead of failing the cycle. Only shape conflicts
//! inside a depth stack are surfaced as errors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{IoError, PlaneError};
use crate::format::AcquisitionContainer;

use super::codec::TiffPlaneCodec;
use super::projection::MaxProjector;
use super::raster::{Plane, PlaneShape};

/// Where the pixels of one (tile, channel) plane live.
#[derive(Clone)]
pub enum PlaneSource {
    /// A single 2-D TIFF file
    File(PathBuf),

    /// One TIFF file per depth plane, projected on load
    DepthFiles(Vec<PathBuf>),

    /// A plane inside an open vendor container, projected over its depth
    Container {
        container: Arc<dyn AcquisitionContainer>,
        tile: usize,
        channel: usize,
    },

    /// No source was found for this (tile, channel)
    Absent,
}

impl fmt::Debug for PlaneSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaneSource::File(path) => f.debug_tuple("File").field(path).finish(),
            PlaneSource::DepthFiles(paths) => f.debug_tuple("DepthFiles").field(paths).finish(),
            PlaneSource::Container {
                container,
                tile,
                channel,
            } => f
                .debug_struct("Container")
                .field("container", &container.identifier())
                .field("tile", tile)
                .field("channel", channel)
                .finish(),
            PlaneSource::Absent => f.write_str("Absent"),
        }
    }
}

/// Result of a tolerant plane load.
#[derive(Debug, Clone)]
pub struct LoadedPlane {
    pub plane: Plane,

    /// True when all or part of the plane was zero-filled
    pub substituted: bool,
}

/// Deferred reference to one (tile, channel) plane.
#[derive(Debug, Clone)]
pub struct PlaneHandle {
    source: PlaneSource,
    shape: PlaneShape,
}

impl PlaneHandle {
    pub fn new(source: PlaneSource, shape: PlaneShape) -> Self {
        Self { source, shape }
    }

    pub fn file(path: impl Into<PathBuf>, shape: PlaneShape) -> Self {
        Self::new(PlaneSource::File(path.into()), shape)
    }

    /// Handle for a depth stack stored as one file per plane.
    ///
    /// An empty list is treated as an absent source.
    pub fn depth_files(paths: Vec<PathBuf>, shape: PlaneShape) -> Self {
        if paths.is_empty() {
            Self::absent(shape)
        } else {
            Self::new(PlaneSource::DepthFiles(paths), shape)
        }
    }

    pub fn container(
        container: Arc<dyn AcquisitionContainer>,
        tile: usize,
        channel: usize,
        shape: PlaneShape,
    ) -> Self {
        Self::new(
            PlaneSource::Container {
                container,
                tile,
                channel,
            },
            shape,
        )
    }

    pub fn absent(shape: PlaneShape) -> Self {
        Self::new(PlaneSource::Absent, shape)
    }

    pub fn source(&self) -> &PlaneSource {
        &self.source
    }

    /// Shape used when the plane has to be zero-filled.
    pub fn expected_shape(&self) -> PlaneShape {
        self.shape
    }

    /// Human-readable identifier for logs and error messages.
    pub fn source_id(&self) -> String {
        match &self.source {
            PlaneSource::File(path) => path.display().to_string(),
            PlaneSource::DepthFiles(paths) => match paths.first() {
                Some(first) if paths.len() > 1 => {
                    format!("{} (+{} depth planes)", first.display(), paths.len() - 1)
                }
                Some(first) => first.display().to_string(),
                None => "<absent>".to_string(),
            },
            PlaneSource::Container {
                container,
                tile,
                channel,
            } => format!("{}[tile={}, channel={}]", container.identifier(), tile, channel),
            PlaneSource::Absent => "<absent>".to_string(),
        }
    }

    /// Load the plane, zero-filling anything that cannot be read.
    ///
    /// # Errors
    ///
    /// Only `PlaneError::ShapeMismatch` is returned, when depth planes of
    /// one stack disagree in shape.
    pub async fn load(&self, codec: &TiffPlaneCodec) -> Result<LoadedPlane, PlaneError> {
        match &self.source {
            PlaneSource::File(path) => match read_plane_file(path, codec).await {
                Ok(plane) => Ok(LoadedPlane {
                    plane,
                    substituted: false,
                }),
                Err(e) => Ok(self.zero_fill(&e)),
            },
            PlaneSource::DepthFiles(paths) => self.load_depth_files(paths, codec).await,
            PlaneSource::Container {
                container,
                tile,
                channel,
            } => {
                self.load_from_container(container.as_ref(), *tile, *channel)
                    .await
            }
            PlaneSource::Absent => Ok(self.zero_fill(&PlaneError::Missing(self.source_id()))),
        }
    }

    async fn load_depth_files(
        &self,
        paths: &[PathBuf],
        codec: &TiffPlaneCodec,
    ) -> Result<LoadedPlane, PlaneError> {
        let mut projector = MaxProjector::new();
        let mut substituted = false;

        for path in paths {
            let plane = match read_plane_file(path, codec).await {
                Ok(plane) => plane,
                Err(e) => {
                    warn!(
                        "Image corrupted, reading black plane instead: {}",
                        e
                    );
                    substituted = true;
                    Plane::zeros(self.shape)
                }
            };
            projector.push(&plane)?;
        }

        debug!(
            "Projected {} depth planes for {}",
            projector.depth(),
            self.source_id()
        );

        Ok(LoadedPlane {
            plane: projector.finish()?,
            substituted,
        })
    }

    async fn load_from_container(
        &self,
        container: &dyn AcquisitionContainer,
        tile: usize,
        channel: usize,
    ) -> Result<LoadedPlane, PlaneError> {
        let depth = match container.depth(tile, channel).await {
            Ok(0) => return Ok(self.zero_fill(&PlaneError::EmptyStack)),
            Ok(depth) => depth,
            Err(e) => return Ok(self.zero_fill(&e)),
        };

        let mut projector = MaxProjector::new();
        let mut substituted = false;
        for z in 0..depth {
            let plane = match container.read_plane(tile, channel, z).await {
                Ok(plane) => plane,
                Err(e) => {
                    warn!(
                        "Corrupt plane {} at z={}, reading black plane instead: {}",
                        self.source_id(),
                        z,
                        e
                    );
                    substituted = true;
                    Plane::zeros(self.shape)
                }
            };
            projector.push(&plane)?;
        }

        debug!("Projected {} depth planes for {}", depth, self.source_id());

        Ok(LoadedPlane {
            plane: projector.finish()?,
            substituted,
        })
    }

    fn zero_fill(&self, cause: &PlaneError) -> LoadedPlane {
        warn!(
            "Substituting zero plane {} for {}: {}",
            self.shape,
            self.source_id(),
            cause
        );
        LoadedPlane {
            plane: Plane::zeros(self.shape),
            substituted: true,
        }
    }
}

/// Read raw bytes of a plane file.
pub async fn read_file_bytes(path: &Path) -> Result<Bytes, IoError> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|e| IoError::read(path, e))
}

/// Read a plane file's dimensions without decoding its pixels.
pub async fn read_plane_dimensions(
    path: &Path,
    codec: &TiffPlaneCodec,
) -> Result<PlaneShape, PlaneError> {
    let owned = path.to_path_buf();
    let codec = codec.clone();
    tokio::task::spawn_blocking(move || codec.file_dimensions(&owned))
        .await
        .map_err(|e| PlaneError::Decode {
            message: format!("header task failed: {}", e),
        })?
}

/// Read and decode a single plane file.
///
/// Missing files map to `PlaneError::Missing`, everything else that fails
/// maps to `PlaneError::Corrupt`.
pub async fn read_plane_file(path: &Path, codec: &TiffPlaneCodec) -> Result<Plane, PlaneError> {
    let bytes = read_file_bytes(path).await.map_err(|e| match e {
        IoError::NotFound(p) => PlaneError::Missing(p),
        other => PlaneError::Corrupt {
            source_id: path.display().to_string(),
            message: other.to_string(),
        },
    })?;

    codec.decode(&bytes).map_err(|e| PlaneError::Corrupt {
        source_id: path.display().to_string(),
        message: e.to_string(),
    })
}
