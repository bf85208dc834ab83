//! Format adapter integration tests.
//!
//! Covers layout detection, the ZEN and Leica TIFF exports, container
//! sources with depth projection, and zero-fill recovery.

use std::sync::Arc;

use mosaic_prep::error::FormatError;
use mosaic_prep::format::{
    detect_vendor, AcquisitionContainer, Calibration, ContainerAdapter, CycleId, FormatAdapter,
    LeicaExportAdapter, LeicaNaming, StageCalibration, StagePosition, VendorLayout,
    ZenExportAdapter,
};
use mosaic_prep::plane::{max_intensity_projection, Plane, PlaneShape, TiffPlaneCodec};
use tempfile::TempDir;

use super::test_utils::{
    tile_scan_xml, write_filled, write_zen_cycle, MockContainer,
};

const SHAPE: PlaneShape = PlaneShape::new(8, 6);

// =============================================================================
// Layout detection
// =============================================================================

#[tokio::test]
async fn test_detect_zen_layout() {
    let dir = TempDir::new().unwrap();
    write_zen_cycle(dir.path(), 1, &[(0, 0), (8, 0)], 2, SHAPE).await;

    assert_eq!(detect_vendor(dir.path()).await.unwrap(), VendorLayout::Zen);
}

#[tokio::test]
async fn test_detect_leica_layouts() {
    let navigator = TempDir::new().unwrap();
    write_filled(navigator.path(), "Pos1--Stage00--Z00--C00.tif", SHAPE, 1).await;
    write_filled(navigator.path(), "Pos1--Stage01--Z00--C00.tif", SHAPE, 1).await;
    assert_eq!(
        detect_vendor(navigator.path()).await.unwrap(),
        VendorLayout::LeicaNavigator
    );

    let exported = TempDir::new().unwrap();
    write_filled(exported.path(), "Region1_s00_z00_ch00.tif", SHAPE, 1).await;
    assert_eq!(
        detect_vendor(exported.path()).await.unwrap(),
        VendorLayout::LeicaExported
    );
}

#[tokio::test]
async fn test_detect_unknown_layout() {
    let dir = TempDir::new().unwrap();
    tokio::fs::write(dir.path().join("notes.txt"), b"hello").await.unwrap();

    let result = detect_vendor(dir.path()).await;
    assert!(matches!(result, Err(FormatError::UnsupportedLayout { .. })));
}

// =============================================================================
// ZEN export
// =============================================================================

#[tokio::test]
async fn test_zen_two_cycles() {
    let dir = TempDir::new().unwrap();
    write_zen_cycle(dir.path(), 1, &[(100, 40), (1900, 40), (100, 1800)], 3, SHAPE).await;
    write_zen_cycle(dir.path(), 2, &[(101, 41), (1901, 41), (101, 1801)], 3, SHAPE).await;

    let adapter = ZenExportAdapter::new(dir.path(), Calibration::default());
    let cycles = adapter.discover().await.unwrap();
    assert_eq!(cycles, vec![CycleId::new(1), CycleId::new(2)]);

    let acquisition = adapter.load_cycle(CycleId::new(2)).await.unwrap();
    assert_eq!(acquisition.len(), 9);
    let record = acquisition
        .records
        .iter()
        .find(|r| r.tile == 2 && r.channel == 1)
        .unwrap();
    assert_eq!(record.position.x, 101.0);
    assert_eq!(record.position.y, 1801.0);

    let loaded = record.plane.load(&TiffPlaneCodec::new()).await.unwrap();
    assert!(!loaded.substituted);
    assert!(loaded.plane.as_raw().iter().all(|&v| v == 2021));
}

#[tokio::test]
async fn test_zen_corrupt_plane_zero_filled() {
    let dir = TempDir::new().unwrap();
    write_zen_cycle(dir.path(), 1, &[(0, 0), (8, 0)], 2, SHAPE).await;
    tokio::fs::write(dir.path().join("Base_1_c2m02_ORG.tif"), b"truncated")
        .await
        .unwrap();

    let adapter = ZenExportAdapter::new(dir.path(), Calibration::default());
    let acquisition = adapter.load_cycle(CycleId::new(1)).await.unwrap();
    let codec = TiffPlaneCodec::new();

    let sibling = acquisition
        .records
        .iter()
        .find(|r| r.tile == 1 && r.channel == 0)
        .unwrap()
        .plane
        .load(&codec)
        .await
        .unwrap();
    let broken = acquisition
        .records
        .iter()
        .find(|r| r.tile == 1 && r.channel == 1)
        .unwrap()
        .plane
        .load(&codec)
        .await
        .unwrap();

    assert!(broken.substituted);
    assert!(broken.plane.is_zero());
    assert_eq!(broken.plane.shape(), sibling.plane.shape());
}

#[tokio::test]
async fn test_zen_missing_plane_file_zero_filled() {
    let dir = TempDir::new().unwrap();
    write_zen_cycle(dir.path(), 1, &[(0, 0), (8, 0)], 2, SHAPE).await;
    tokio::fs::remove_file(dir.path().join("Base_1_c1m02_ORG.tif"))
        .await
        .unwrap();

    let adapter = ZenExportAdapter::new(dir.path(), Calibration::default());
    let acquisition = adapter.load_cycle(CycleId::new(1)).await.unwrap();
    assert_eq!(acquisition.len(), 4);

    let codec = TiffPlaneCodec::new();
    let gap = acquisition
        .records
        .iter()
        .find(|r| r.tile == 1 && r.channel == 0)
        .unwrap()
        .plane
        .load(&codec)
        .await
        .unwrap();
    assert!(gap.substituted);
    assert!(gap.plane.is_zero());
    assert_eq!(gap.plane.shape(), SHAPE);
}

#[tokio::test]
async fn test_zen_missing_info_is_cycle_local() {
    let dir = TempDir::new().unwrap();
    write_zen_cycle(dir.path(), 1, &[(0, 0)], 1, SHAPE).await;
    write_zen_cycle(dir.path(), 2, &[(0, 0)], 1, SHAPE).await;
    tokio::fs::remove_file(dir.path().join("Base_2_info.xml"))
        .await
        .unwrap();

    let adapter = ZenExportAdapter::new(dir.path(), Calibration::default());
    assert!(adapter.load_cycle(CycleId::new(1)).await.is_ok());
    assert!(matches!(
        adapter.load_cycle(CycleId::new(2)).await,
        Err(FormatError::MissingMetadata { .. })
    ));
}

// =============================================================================
// Leica export
// =============================================================================

#[tokio::test]
async fn test_leica_missing_channel_is_zero_plane() {
    let dir = TempDir::new().unwrap();
    write_filled(dir.path(), "Pos1--Stage00--Z00--C00.tif", SHAPE, 4).await;
    write_filled(dir.path(), "Pos1--Stage00--Z00--C01.tif", SHAPE, 5).await;
    write_filled(dir.path(), "Pos1--Stage01--Z00--C00.tif", SHAPE, 6).await;
    let meta = dir.path().join("Metadata");
    tokio::fs::create_dir(&meta).await.unwrap();
    tokio::fs::write(
        meta.join("Pos1.xml"),
        tile_scan_xml(&[(0.001, 0.002), (0.0010025, 0.002)]),
    )
    .await
    .unwrap();

    let adapter = LeicaExportAdapter::new(
        vec![dir.path().to_path_buf()],
        LeicaNaming::Navigator,
        StageCalibration::new(1.0e-7),
        Calibration::default(),
    );
    let acquisition = adapter.load_cycle(CycleId::new(1)).await.unwrap();
    assert_eq!(acquisition.len(), 4);

    let missing = acquisition
        .records
        .iter()
        .find(|r| r.tile == 1 && r.channel == 1)
        .unwrap();
    let loaded = missing.plane.load(&TiffPlaneCodec::new()).await.unwrap();
    assert!(loaded.substituted);
    assert!(loaded.plane.is_zero());
    assert_eq!(loaded.plane.shape(), SHAPE);

    let second = &acquisition.records.iter().find(|r| r.tile == 1).unwrap().position;
    assert!((second.x - 10025.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_leica_without_metadata() {
    let dir = TempDir::new().unwrap();
    write_filled(dir.path(), "Pos1--Stage00--Z00--C00.tif", SHAPE, 4).await;

    let adapter = LeicaExportAdapter::new(
        vec![dir.path().to_path_buf()],
        LeicaNaming::Navigator,
        StageCalibration::default(),
        Calibration::default(),
    );
    assert!(matches!(
        adapter.load_cycle(CycleId::new(1)).await,
        Err(FormatError::MissingMetadata { .. })
    ));
}

// =============================================================================
// Containers
// =============================================================================

#[tokio::test]
async fn test_container_projection_matches_stack_maximum() {
    let shape = PlaneShape::new(3, 2);
    // Maxima spread over different depth planes
    let values = |z: usize, x: u32, y: u32| -> u16 {
        match (z, x, y) {
            (0, 0, 0) => 900,
            (1, 1, 0) => 800,
            (2, 2, 1) => 65535,
            _ => (z as u16 + 1) * 10 + (x + y) as u16,
        }
    };
    let container = MockContainer::new(
        "cycle1.czi",
        vec![StagePosition::Pixels { x: 0.0, y: 0.0 }],
        1,
        shape,
    )
    .with_depth(3)
    .with_pixels(move |_, _, z, x, y| values(z, x, y));

    let stack: Vec<Plane> = (0..3)
        .map(|z| Plane::from_fn(3, 2, |x, y| values(z, x, y)))
        .collect();
    let expected = max_intensity_projection(&stack).unwrap();
    assert_eq!(expected.get(0, 0), 900);
    assert_eq!(expected.get(1, 0), 800);
    assert_eq!(expected.get(2, 1), 65535);
    assert_eq!(expected.get(0, 1), 31);

    let adapter = ContainerAdapter::czi(vec![Arc::new(container)], Calibration::default());
    let acquisition = adapter.load_cycle(CycleId::new(1)).await.unwrap();
    let loaded = acquisition.records[0]
        .plane
        .load(&TiffPlaneCodec::new())
        .await
        .unwrap();
    assert_eq!(loaded.plane, expected);
}

#[tokio::test]
async fn test_container_corrupt_depth_plane() {
    let container = MockContainer::new(
        "cycle1.lif",
        vec![StagePosition::Metres { x: 0.0, y: 0.0 }],
        2,
        SHAPE,
    )
    .with_depth(2)
    .with_pixels(|_, channel, z, _, _| (channel * 10 + z + 1) as u16)
    .with_corrupt(0, 1, 1);
    let container: Arc<dyn AcquisitionContainer> = Arc::new(container);

    let adapter = ContainerAdapter::lif(
        vec![Arc::clone(&container)],
        StageCalibration::default(),
        Calibration::default(),
    );
    let acquisition = adapter.load_cycle(CycleId::new(1)).await.unwrap();
    let codec = TiffPlaneCodec::new();

    let healthy = acquisition.records[0].plane.load(&codec).await.unwrap();
    assert!(!healthy.substituted);
    assert!(healthy.plane.as_raw().iter().all(|&v| v == 2));

    let partial = acquisition.records[1].plane.load(&codec).await.unwrap();
    assert!(partial.substituted);
    assert!(partial.plane.as_raw().iter().all(|&v| v == 11));
}
