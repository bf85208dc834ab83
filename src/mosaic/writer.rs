//! Multi-page BigTIFF writer for cycle mosaics.
//!
//! Planes are loaded on the async side one at a time and handed to a
//! blocking encoder task through a bounded queue, so at most a few planes
//! are resident regardless of cycle size.
//!
//! ```text
//! load tile 0 ch 0 ──┐
//! load tile 0 ch 1 ──┤  mpsc (bounded)   ┌──────────────────────┐
//! ...                ├──────────────────▶│ spawn_blocking       │
//! load tile N ch C ──┘                   │ TiffEncoder::new_big │
//!                                        └──────────┬───────────┘
//!                                                   ▼
//!                                     cycle_N.ome.tif.partial → rename
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{IoError, MosaicError};
use crate::format::CycleId;
use crate::manifest::TileManifest;
use crate::plane::{PlaneShape, TiffPlaneCodec};

use super::ome::generate_ome_xml;
use super::sidecar::{generate_tile_scan_xml, sidecar_file_name};

/// Planes buffered between the loader and the encoder.
const PAGE_QUEUE_DEPTH: usize = 2;

/// Container file name for a cycle.
pub fn mosaic_file_name(cycle: CycleId) -> String {
    format!("{}.ome.tif", cycle.file_stem())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

/// Result of writing one cycle.
#[derive(Debug, Clone)]
pub struct MosaicOutput {
    pub cycle: CycleId,
    pub path: PathBuf,
    pub sidecar: Option<PathBuf>,
    pub tiles: usize,
    pub channels: usize,

    /// Planes that were zero-filled
    pub substituted: usize,

    /// True when an existing container was kept untouched
    pub skipped: bool,
}

/// One IFD worth of pixels.
struct Page {
    width: u32,
    height: u32,
    data: Vec<u16>,
    description: Option<String>,
}

/// Writes one OME-TIFF mosaic container per cycle.
#[derive(Debug, Clone)]
pub struct MosaicWriter {
    output_dir: PathBuf,
    codec: TiffPlaneCodec,
    write_sidecar: bool,
}

impl MosaicWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            codec: TiffPlaneCodec::new(),
            write_sidecar: false,
        }
    }

    /// Also emit a `TileScanInfo` sidecar next to each container.
    pub fn with_sidecar(mut self, enabled: bool) -> Self {
        self.write_sidecar = enabled;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the container for a cycle.
    pub fn mosaic_path(&self, cycle: CycleId) -> PathBuf {
        self.output_dir.join(mosaic_file_name(cycle))
    }

    /// Write the container for one cycle.
    ///
    /// An existing container is left in place and reported as skipped.
    ///
    /// # Errors
    ///
    /// * `MosaicError::DimensionMismatch` - a plane differs in shape from the first
    /// * `MosaicError::Plane` - a depth stack is internally inconsistent
    /// * `MosaicError::Encode` / `MosaicError::Io` - the container cannot be written
    ///
    /// On error no container file is left behind.
    pub async fn write_cycle(&self, manifest: &TileManifest) -> Result<MosaicOutput, MosaicError> {
        let path = self.mosaic_path(manifest.id);
        let sidecar = self
            .write_sidecar
            .then(|| self.output_dir.join(sidecar_file_name(manifest)));

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            info!("Mosaic for {} exists, skipping: {}", manifest.id, path.display());
            if let Some(sidecar_path) = &sidecar {
                if !tokio::fs::try_exists(sidecar_path).await.unwrap_or(false) {
                    debug!("Sidecar {} missing, writing it", sidecar_path.display());
                    write_sidecar(sidecar_path, manifest).await?;
                }
            }
            return Ok(MosaicOutput {
                cycle: manifest.id,
                path,
                sidecar,
                tiles: manifest.tile_count,
                channels: manifest.channel_count,
                substituted: 0,
                skipped: true,
            });
        }

        let partial = partial_path(&path);
        let (tx, rx) = mpsc::channel::<Page>(PAGE_QUEUE_DEPTH);
        let encoder_path = partial.clone();
        let encoder = tokio::task::spawn_blocking(move || encode_pages(&encoder_path, rx));

        let fed = self.feed_pages(manifest, tx).await;
        let encoded = encoder
            .await
            .map_err(|e| MosaicError::Encode {
                message: format!("encoder task failed: {}", e),
            })
            .and_then(|result| result);

        let substituted = match encoded.and(fed) {
            Ok(substituted) => substituted,
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&partial).await {
                    debug!("Could not remove {}: {}", partial.display(), remove);
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| IoError::write(&path, e))?;

        if let Some(sidecar_path) = &sidecar {
            write_sidecar(sidecar_path, manifest).await?;
        }

        info!(
            "Wrote mosaic {} ({} tiles x {} channels, {} zero-filled)",
            path.display(),
            manifest.tile_count,
            manifest.channel_count,
            substituted
        );

        Ok(MosaicOutput {
            cycle: manifest.id,
            path,
            sidecar,
            tiles: manifest.tile_count,
            channels: manifest.channel_count,
            substituted,
            skipped: false,
        })
    }

    /// Load every plane in tile-major order and send it to the encoder.
    ///
    /// Returns the number of zero-filled planes.
    async fn feed_pages(
        &self,
        manifest: &TileManifest,
        tx: mpsc::Sender<Page>,
    ) -> Result<usize, MosaicError> {
        let mut expected: Option<PlaneShape> = None;
        let mut substituted = 0;

        for tile in 0..manifest.tile_count {
            for (channel, record) in manifest.tile_records(tile).enumerate() {
                let loaded = record.plane.load(&self.codec).await?;
                if loaded.substituted {
                    substituted += 1;
                }

                let shape = loaded.plane.shape();
                let description = match expected {
                    None => {
                        expected = Some(shape);
                        Some(generate_ome_xml(manifest, shape))
                    }
                    Some(first) if first != shape => {
                        return Err(MosaicError::DimensionMismatch {
                            cycle: manifest.id,
                            tile,
                            channel,
                            expected_width: first.width,
                            expected_height: first.height,
                            actual_width: shape.width,
                            actual_height: shape.height,
                        });
                    }
                    Some(_) => None,
                };

                let page = Page {
                    width: shape.width,
                    height: shape.height,
                    data: loaded.plane.into_raster().into_raw(),
                    description,
                };
                if tx.send(page).await.is_err() {
                    // Encoder stopped; its own error is reported instead
                    warn!("Encoder for {} stopped early", manifest.id);
                    return Ok(substituted);
                }
            }
        }

        Ok(substituted)
    }
}

async fn write_sidecar(path: &Path, manifest: &TileManifest) -> Result<(), MosaicError> {
    tokio::fs::write(path, generate_tile_scan_xml(manifest))
        .await
        .map_err(|e| IoError::write(path, e))?;
    Ok(())
}

fn encode_error(e: tiff::TiffError) -> MosaicError {
    MosaicError::Encode {
        message: e.to_string(),
    }
}

/// Blocking side: write every received page as one BigTIFF IFD.
fn encode_pages(path: &Path, mut rx: mpsc::Receiver<Page>) -> Result<usize, MosaicError> {
    let file = File::create(path).map_err(|e| IoError::write(path, e))?;
    let mut writer = BufWriter::new(file);

    let mut pages = 0;
    {
        let mut encoder = TiffEncoder::new_big(&mut writer).map_err(encode_error)?;
        while let Some(page) = rx.blocking_recv() {
            let mut image = encoder
                .new_image::<colortype::Gray16>(page.width, page.height)
                .map_err(encode_error)?;
            if let Some(description) = &page.description {
                image
                    .encoder()
                    .write_tag(Tag::ImageDescription, description.as_str())
                    .map_err(encode_error)?;
            }
            image.write_data(&page.data).map_err(encode_error)?;
            pages += 1;
        }
    }

    writer.flush().map_err(|e| IoError::write(path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| IoError::write(path, e))?;
    Ok(pages)
}
