//! Manifest builder integration tests over real adapter output.

use mosaic_prep::error::ManifestError;
use mosaic_prep::format::{Calibration, CycleId, FormatAdapter, ZenExportAdapter};
use mosaic_prep::manifest::{build_manifest, PixelOffset};
use mosaic_prep::plane::PlaneShape;
use tempfile::TempDir;

use super::test_utils::{acquisition, write_zen_cycle};

const SHAPE: PlaneShape = PlaneShape::new(8, 8);

#[tokio::test]
async fn test_positions_origin_normalized() {
    let dir = TempDir::new().unwrap();
    write_zen_cycle(
        dir.path(),
        1,
        &[(-500, 1200), (1300, 1200), (-500, 3000), (1300, 3000)],
        2,
        SHAPE,
    )
    .await;

    let adapter = ZenExportAdapter::new(dir.path(), Calibration::default());
    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();

    assert_eq!(manifest.tile_count, 4);
    assert_eq!(manifest.channel_count, 2);
    let offsets: Vec<PixelOffset> = manifest.positions.iter().map(|(_, o)| o).collect();
    assert_eq!(offsets.iter().map(|o| o.x).min(), Some(0));
    assert_eq!(offsets.iter().map(|o| o.y).min(), Some(0));
    assert_eq!(
        offsets,
        vec![
            PixelOffset::new(0, 0),
            PixelOffset::new(1800, 0),
            PixelOffset::new(0, 1800),
            PixelOffset::new(1800, 1800),
        ]
    );
}

#[tokio::test]
async fn test_records_sorted_by_channel_then_tile() {
    let dir = TempDir::new().unwrap();
    write_zen_cycle(dir.path(), 1, &[(0, 0), (10, 0), (20, 0)], 3, SHAPE).await;

    let adapter = ZenExportAdapter::new(dir.path(), Calibration::default());
    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();

    let order: Vec<(usize, usize)> = manifest
        .records
        .iter()
        .map(|r| (r.channel, r.tile))
        .collect();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);
    assert_eq!(order.len(), 9);
    assert_eq!(manifest.record(2, 1).map(|r| (r.tile, r.channel)), Some((2, 1)));
}

#[tokio::test]
async fn test_single_tile_cycle() {
    let dir = TempDir::new().unwrap();
    write_zen_cycle(dir.path(), 1, &[(4321, 1234)], 1, SHAPE).await;

    let adapter = ZenExportAdapter::new(dir.path(), Calibration::default());
    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();
    assert_eq!(manifest.tile_count, 1);
    assert_eq!(manifest.offset(0), Some(PixelOffset::new(0, 0)));
}

#[test]
fn test_channel_count_mismatch_detected() {
    let result = build_manifest(acquisition(1, &[(0.0, 0.0), (8.0, 0.0)], 2, &[(1, 1)]));
    assert!(matches!(
        result,
        Err(ManifestError::ChannelCountMismatch {
            tile: 1,
            expected: 2,
            actual: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn test_missing_zen_file_keeps_cycle() {
    let dir = TempDir::new().unwrap();
    write_zen_cycle(dir.path(), 1, &[(0, 0), (8, 0)], 2, SHAPE).await;
    tokio::fs::remove_file(dir.path().join("Base_1_c2m02_ORG.tif"))
        .await
        .unwrap();

    let adapter = ZenExportAdapter::new(dir.path(), Calibration::default());
    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();
    assert_eq!(manifest.tile_count, 2);
    assert_eq!(manifest.channel_count, 2);
    assert_eq!(manifest.records.len(), 4);
}
