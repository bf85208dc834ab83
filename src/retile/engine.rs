//! Retiling engine.
//!
//! Cuts stitched canvases into fixed `T x T` tiles on the grid described in
//! [`super::grid`], one canvas resident at a time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::imageops;
use tracing::{debug, info, warn};

use crate::error::{IoError, RetileError};
use crate::format::list_file_names;
use crate::manifest::PixelOffset;
use crate::plane::{read_plane_dimensions, read_plane_file, Plane, PlaneShape, TiffPlaneCodec};

use super::checkpoint::Checkpoint;
use super::grid::TileGrid;
use super::ledger::write_ledger;
use super::naming::{parse_canvas_name, tile_file_name, CanvasId, CanvasNaming, LEDGER_FILE_NAME};

/// One emitted tile.
#[derive(Debug, Clone)]
pub struct RetiledTile {
    /// 1-based row-major index
    pub index: usize,

    /// Top-left pixel of the tile in the unpadded canvas
    pub offset: PixelOffset,

    pub plane: Plane,
}

/// Outcome of a directory pass.
#[derive(Debug, Default)]
pub struct RetileReport {
    /// Grid shared by every canvas of the pass
    pub grid: Option<TileGrid>,

    /// Canvases whose tiles are all present after the pass
    pub canvases: usize,

    pub tiles_written: usize,

    /// Tiles already recorded as complete
    pub tiles_skipped: usize,

    /// Canvases that could not be retiled, by file name
    pub failures: Vec<(String, RetileError)>,
}

impl RetileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Cuts canvases into fixed-size tiles.
#[derive(Debug, Clone)]
pub struct Retiler {
    tile_size: u32,
    fill: u16,
    naming: CanvasNaming,
    codec: TiffPlaneCodec,
}

impl Retiler {
    /// # Errors
    ///
    /// `RetileError::InvalidTileSize` when `tile_size` is zero.
    pub fn new(tile_size: u32) -> Result<Self, RetileError> {
        if tile_size == 0 {
            return Err(RetileError::InvalidTileSize(tile_size));
        }
        Ok(Self {
            tile_size,
            fill: 0,
            naming: CanvasNaming::default(),
            codec: TiffPlaneCodec::new(),
        })
    }

    /// Value written into the bottom and right padding.
    pub fn with_fill(mut self, fill: u16) -> Self {
        self.fill = fill;
        self
    }

    /// Grammar used to read cycle and channel from canvas names.
    pub fn with_naming(mut self, naming: CanvasNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn fill(&self) -> u16 {
        self.fill
    }

    pub fn naming(&self) -> CanvasNaming {
        self.naming
    }

    /// Grid for a canvas of the given shape.
    pub fn grid(&self, shape: PlaneShape) -> Result<TileGrid, RetileError> {
        TileGrid::new(shape.width, shape.height, self.tile_size)
    }

    /// Cut the tile at `index` (1-based) out of `canvas`.
    ///
    /// Pixels past the canvas edge take the fill value.
    pub fn cut(&self, canvas: &Plane, grid: &TileGrid, index: usize) -> Option<RetiledTile> {
        let offset = grid.offset(index)?;
        let mut plane = Plane::filled(PlaneShape::new(self.tile_size, self.tile_size), self.fill);
        imageops::replace(
            plane.raster_mut(),
            canvas.raster(),
            -(offset.x as i64),
            -(offset.y as i64),
        );
        Some(RetiledTile {
            index,
            offset,
            plane,
        })
    }

    /// Cut every tile of a canvas, in index order.
    pub fn retile_plane(&self, canvas: &Plane) -> Result<Vec<RetiledTile>, RetileError> {
        let grid = self.grid(canvas.shape())?;
        Ok((1..=grid.tile_count())
            .filter_map(|index| self.cut(canvas, &grid, index))
            .collect())
    }

    /// Retile every stitched canvas in `canvas_dir` into `output_dir`.
    ///
    /// Canvases are processed in (cycle, channel) order. Failures are
    /// isolated per canvas and collected in the report; only failing to
    /// list the input or to create the output root aborts the pass.
    pub async fn retile_directory(
        &self,
        canvas_dir: &Path,
        output_dir: &Path,
    ) -> Result<RetileReport, RetileError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| IoError::create_dir(output_dir, e))?;

        let mut pass = RetilePass {
            retiler: self,
            output_dir,
            checkpoints: BTreeMap::new(),
            report: RetileReport::default(),
        };

        let mut canvases = Vec::new();
        for name in list_file_names(canvas_dir).await? {
            let lower = name.to_ascii_lowercase();
            if !(lower.ends_with(".tif") || lower.ends_with(".tiff")) {
                continue;
            }
            match parse_canvas_name(&name, self.naming) {
                Some(id) => canvases.push((id, name)),
                None => {
                    warn!("Skipping canvas with unparseable name: {}", name);
                    pass.report
                        .failures
                        .push((name.clone(), RetileError::InvalidCanvasName(name)));
                }
            }
        }
        canvases.sort();

        info!(
            "Retiling {} canvases from {} at {}px",
            canvases.len(),
            canvas_dir.display(),
            self.tile_size
        );

        for (id, name) in canvases {
            let path = canvas_dir.join(&name);
            match pass.retile_canvas(id, &name, &path).await {
                Ok(()) => pass.report.canvases += 1,
                Err(e) => {
                    warn!("Failed to retile {}: {}", name, e);
                    pass.report.failures.push((name, e));
                }
            }
        }

        if let Some(grid) = pass.report.grid {
            let ledger = output_dir.join(LEDGER_FILE_NAME);
            write_ledger(&ledger, &grid.offsets()).await?;
            debug!("Wrote {} offsets to {}", grid.tile_count(), ledger.display());
        }

        let report = pass.report;
        info!(
            "Retiled {} canvases: {} tiles written, {} skipped, {} failures",
            report.canvases,
            report.tiles_written,
            report.tiles_skipped,
            report.failures.len()
        );
        Ok(report)
    }
}

/// State of one directory pass.
struct RetilePass<'a> {
    retiler: &'a Retiler,
    output_dir: &'a Path,
    checkpoints: BTreeMap<u32, Checkpoint>,
    report: RetileReport,
}

impl RetilePass<'_> {
    async fn checkpoint(&mut self, id: CanvasId) -> Result<&mut Checkpoint, RetileError> {
        if !self.checkpoints.contains_key(&id.cycle) {
            if let Some(checkpoint) = Checkpoint::load(&self.checkpoint_path(id)).await? {
                debug!(
                    "Resuming cycle {} with {} completed tiles",
                    checkpoint.cycle,
                    checkpoint.completed.len()
                );
                self.checkpoints.insert(id.cycle, checkpoint);
            }
        }
        Ok(self
            .checkpoints
            .entry(id.cycle)
            .or_insert_with(|| Checkpoint::new(id.cycle + 1)))
    }

    fn checkpoint_path(&self, id: CanvasId) -> PathBuf {
        self.output_dir.join(id.checkpoint_file_name())
    }

    /// Check that `grid` matches the canvas size established for this pass.
    fn accept_grid(&mut self, name: &str, grid: TileGrid) -> Result<(), RetileError> {
        match self.report.grid {
            Some(pass) if (pass.width, pass.height) != (grid.width, grid.height) => {
                Err(RetileError::DimensionMismatch {
                    name: name.to_string(),
                    expected_width: pass.width,
                    expected_height: pass.height,
                    actual_width: grid.width,
                    actual_height: grid.height,
                })
            }
            Some(_) => Ok(()),
            None => {
                self.report.grid = Some(grid);
                Ok(())
            }
        }
    }

    /// Grid of a canvas whose tiles are all recorded and present.
    ///
    /// The canvas header must still match the recorded grid size.
    async fn completed_grid(
        &mut self,
        id: CanvasId,
        path: &Path,
        tile_dir: &Path,
    ) -> Result<Option<TileGrid>, RetileError> {
        let tile_size = self.retiler.tile_size;
        let checkpoint = self.checkpoint(id).await?;
        let grid = match checkpoint.grid {
            Some(grid) if grid.tile_size == tile_size && checkpoint.channel_complete(id.channel) => grid,
            _ => return Ok(None),
        };
        let shape = read_plane_dimensions(path, &self.retiler.codec).await?;
        if (shape.width, shape.height) != (grid.width, grid.height) {
            debug!(
                "Canvas {} is now {}, recorded grid was {}x{}",
                path.display(),
                shape,
                grid.width,
                grid.height
            );
            return Ok(None);
        }
        for index in 1..=grid.tile_count() {
            let exists = tokio::fs::try_exists(tile_dir.join(tile_file_name(index)))
                .await
                .unwrap_or(false);
            if !exists {
                return Ok(None);
            }
        }
        Ok(Some(grid))
    }

    async fn retile_canvas(
        &mut self,
        id: CanvasId,
        name: &str,
        path: &Path,
    ) -> Result<(), RetileError> {
        let tile_dir = self.output_dir.join(id.tile_dir_name());

        if let Some(grid) = self.completed_grid(id, path, &tile_dir).await? {
            self.accept_grid(name, grid)?;
            info!("Canvas {} already retiled, skipping", name);
            self.report.tiles_skipped += grid.tile_count();
            return Ok(());
        }

        let canvas = read_plane_file(path, &self.retiler.codec).await?;
        let grid = self.retiler.grid(canvas.shape())?;
        self.accept_grid(name, grid)?;

        debug!(
            "Canvas {} is {}: {} rows x {} cols, padding bottom {} right {}",
            name,
            canvas.shape(),
            grid.rows(),
            grid.cols(),
            grid.pad_bottom(),
            grid.pad_right()
        );

        tokio::fs::create_dir_all(&tile_dir)
            .await
            .map_err(|e| IoError::create_dir(&tile_dir, e))?;

        let checkpoint_path = self.checkpoint_path(id);
        self.checkpoint(id).await?.adopt_grid(grid);

        for index in 1..=grid.tile_count() {
            let tile_path = tile_dir.join(tile_file_name(index));
            let recorded = self.checkpoint(id).await?.is_complete(index, id.channel);
            if recorded && tokio::fs::try_exists(&tile_path).await.unwrap_or(false) {
                self.report.tiles_skipped += 1;
                continue;
            }

            let Some(tile) = self.retiler.cut(&canvas, &grid, index) else {
                continue;
            };
            let bytes = self.retiler.codec.encode(&tile.plane)?;
            write_atomic(&tile_path, &bytes).await?;
            debug!(
                "Wrote {} at ({}, {})",
                tile_path.display(),
                tile.offset.x,
                tile.offset.y
            );

            let checkpoint = self.checkpoint(id).await?;
            checkpoint.mark(index, id.channel);
            checkpoint.save(&checkpoint_path).await?;
            self.report.tiles_written += 1;
        }

        info!(
            "Retiled {} into {} tiles at {}",
            name,
            grid.tile_count(),
            tile_dir.display()
        );
        Ok(())
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), IoError> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, data)
        .await
        .map_err(|e| IoError::write(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| IoError::write(path, e))
}
