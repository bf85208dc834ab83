//! End-to-end runs over a synthetic ZEN export.
//!
//! The stitcher is replaced by a stand-in that writes one flat canvas per
//! (cycle, channel) so the retiling stage has real input.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use mosaic_prep::error::{IoError, ManifestError, MosaicError, PipelineError, StitchError};
use mosaic_prep::format::{Calibration, StageCalibration};
use mosaic_prep::pipeline::{open_adapter, AdapterOptions, Pipeline, RunReport};
use mosaic_prep::plane::{Plane, PlaneShape, TiffPlaneCodec};
use mosaic_prep::retile::Retiler;
use mosaic_prep::stitch::{StitchOutput, StitchParams, Stitcher};
use tempfile::TempDir;

use super::test_utils::{acquisition, read_container, read_plane, write_zen_cycle, FixedAdapter};

const SHAPE: PlaneShape = PlaneShape::new(8, 8);

/// Writes `Round{cycle}_{channel}.tif` canvases holding `10 * cycle + channel`.
struct CanvasStitcher {
    channels: usize,
    canvas: PlaneShape,
    seen: Mutex<Vec<PathBuf>>,
}

impl CanvasStitcher {
    fn new(channels: usize, canvas: PlaneShape) -> Self {
        Self {
            channels,
            canvas,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Stitcher for CanvasStitcher {
    fn name(&self) -> &str {
        "canvas"
    }

    async fn stitch(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        _params: &StitchParams,
    ) -> Result<StitchOutput, StitchError> {
        self.seen.lock().unwrap().extend_from_slice(inputs);

        let codec = TiffPlaneCodec::new();
        let mut canvases = Vec::new();
        for cycle in 0..inputs.len() {
            for channel in 0..self.channels {
                let value = (10 * cycle + channel) as u16;
                let bytes = codec.encode(&Plane::filled(self.canvas, value)).unwrap();
                let path = output_dir.join(format!("Round{}_{}.tif", cycle, channel));
                tokio::fs::write(&path, bytes)
                    .await
                    .map_err(|e| IoError::write(&path, e))?;
                canvases.push(path);
            }
        }
        Ok(StitchOutput {
            output_dir: output_dir.to_path_buf(),
            canvases,
        })
    }
}

fn options() -> AdapterOptions {
    AdapterOptions {
        calibration: Calibration::default(),
        stage: StageCalibration::default(),
        plane_shape: SHAPE,
    }
}

#[tokio::test]
async fn test_full_run() {
    let export = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let positions = [(0, 0), (8, 0), (0, 8), (8, 8)];
    write_zen_cycle(export.path(), 1, &positions, 2, SHAPE).await;
    write_zen_cycle(export.path(), 2, &positions, 2, SHAPE).await;

    let adapter = open_adapter(None, &[export.path().to_path_buf()], options())
        .await
        .unwrap();
    let (pipeline, cycles) = Pipeline::prepare(out.path(), adapter.as_ref()).await.unwrap();
    assert_eq!(cycles.len(), 2);

    let stitcher = CanvasStitcher::new(2, PlaneShape::new(6, 5));
    let retiler = Retiler::new(4).unwrap();
    let report = pipeline
        .run_all(
            adapter.as_ref(),
            &cycles,
            &stitcher,
            &StitchParams::default(),
            &retiler,
        )
        .await;

    assert!(report.is_clean(), "failures: {:?}", report.failures);
    assert_eq!(report.mosaics.len(), 2);
    assert_eq!(report.stitched.len(), 1);
    assert_eq!(report.retiled.len(), 1);

    let preprocessing = out.path().join("preprocessing");
    let mosaics = preprocessing.join("OME_tiffs");
    assert_eq!(
        *stitcher.seen.lock().unwrap(),
        vec![mosaics.join("cycle_1.ome.tif"), mosaics.join("cycle_2.ome.tif")]
    );

    let second = read_container(&mosaics.join("cycle_2.ome.tif"));
    assert_eq!(second.pages.len(), 8);
    // tile 3, channel 1 of cycle 2
    assert!(second.pages[7].2.iter().all(|&v| v == 2031));

    let retiled = preprocessing.join("ReslicedTiles");
    assert_eq!(report.retiled[0].tiles_written, 2 * 2 * 4);
    let corner = read_plane(&retiled.join("Base_2_stitched-2").join("tile1.tif")).await;
    assert_eq!(corner.get(0, 0), 11);
    assert_eq!(corner.get(3, 3), 11);
    let padded = read_plane(&retiled.join("Base_2_stitched-2").join("tile4.tif")).await;
    assert_eq!(padded.get(1, 0), 11);
    assert_eq!(padded.get(2, 0), 0);
    assert_eq!(padded.get(0, 1), 0);

    let ledger = tokio::fs::read_to_string(retiled.join("tilepos.csv"))
        .await
        .unwrap();
    assert_eq!(ledger, "0,0\n4,0\n0,4\n4,4\n");
}

#[tokio::test]
async fn test_bad_cycle_does_not_block_others() {
    let out = TempDir::new().unwrap();
    let positions = [(0.0, 0.0), (8.0, 0.0)];
    let adapter = FixedAdapter::new(vec![
        acquisition(1, &positions, 2, &[(1, 1)]),
        acquisition(2, &positions, 2, &[]),
    ]);
    let (pipeline, cycles) = Pipeline::prepare(out.path(), &adapter).await.unwrap();

    let mut report = RunReport::default();
    pipeline.run_mosaics(&adapter, &cycles, &mut report).await;

    assert_eq!(report.mosaics.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].unit, "cycle 1");
    assert!(matches!(
        report.failures[0].error,
        PipelineError::Mosaic(MosaicError::Manifest(ManifestError::ChannelCountMismatch { .. }))
    ));

    let mosaics = pipeline.layout().mosaic_dir(None);
    assert!(!mosaics.join("cycle_1.ome.tif").exists());
    assert!(mosaics.join("cycle_2.ome.tif").exists());
}
