//! Mosaic writer integration tests.
//!
//! Containers are read back with the `tiff` decoder to check page order,
//! pixel values and the embedded OME-XML.

use std::sync::Arc;

use mosaic_prep::error::{ManifestError, MosaicError};
use mosaic_prep::format::{
    Calibration, ContainerAdapter, CycleId, FormatAdapter, StagePosition, ZenExportAdapter,
};
use mosaic_prep::manifest::build_manifest;
use mosaic_prep::mosaic::{export_cycle, MosaicWriter};
use mosaic_prep::plane::{PlaneShape, TiffPlaneCodec};
use tempfile::TempDir;

use super::test_utils::{
    acquisition, read_container, read_plane, write_filled, write_zen_cycle, MockContainer,
};

fn pixel_grid() -> Vec<StagePosition> {
    vec![
        StagePosition::Pixels { x: 50.0, y: 10.0 },
        StagePosition::Pixels { x: 1050.0, y: 10.0 },
        StagePosition::Pixels { x: 50.0, y: 1010.0 },
    ]
}

#[tokio::test]
async fn test_container_pages_and_metadata() {
    let out = TempDir::new().unwrap();
    let shape = PlaneShape::new(6, 4);
    let container = MockContainer::new("cycle1.czi", pixel_grid(), 2, shape)
        .with_pixels(|tile, channel, _, x, _| (tile * 1000 + channel * 100) as u16 + x as u16);
    let adapter = ContainerAdapter::czi(vec![Arc::new(container)], Calibration::default());

    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();
    let writer = MosaicWriter::new(out.path()).with_sidecar(true);
    let output = writer.write_cycle(&manifest).await.unwrap();

    assert!(!output.skipped);
    assert_eq!(output.substituted, 0);
    assert_eq!(output.path, out.path().join("cycle_1.ome.tif"));
    assert!(!out.path().join("cycle_1.ome.tif.partial").exists());

    let container = read_container(&output.path);
    assert_eq!(container.pages.len(), 3 * 2);
    for (index, (width, height, data)) in container.pages.iter().enumerate() {
        let (tile, channel) = (index / 2, index % 2);
        assert_eq!((*width, *height), (6, 4));
        assert_eq!(data[0], (tile * 1000 + channel * 100) as u16);
        assert_eq!(data[5], (tile * 1000 + channel * 100 + 5) as u16);
    }

    let description = container.description.unwrap();
    assert!(description.is_ascii());
    assert!(description.contains("DimensionOrder=\"XYCZT\""));
    assert!(description.contains("Type=\"uint16\""));
    assert!(description.contains("PhysicalSizeX=\"0.1625\""));
    assert!(description.contains("PhysicalSizeXUnit=\"&#181;m\""));
    assert!(description.contains("<TiffData IFD=\"4\" PlaneCount=\"2\"/>"));
    // tile 1 sits 1000 px right of the origin
    assert!(description.contains("PositionX=\"162.5\""));

    let sidecar = tokio::fs::read_to_string(output.sidecar.unwrap()).await.unwrap();
    assert!(sidecar.contains("Name=\"TileScanInfo\""));
    assert!(sidecar.contains("FieldX=\"1\" FieldY=\"0\" PosX=\"0.0001625000\""));
}

#[tokio::test]
async fn test_zero_filled_plane_written() {
    let out = TempDir::new().unwrap();
    let container = MockContainer::new("cycle1.czi", pixel_grid(), 1, PlaneShape::new(4, 4))
        .with_pixels(|_, _, _, _, _| 7)
        .with_corrupt(2, 0, 0);
    let adapter = ContainerAdapter::czi(vec![Arc::new(container)], Calibration::default());

    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();
    let output = MosaicWriter::new(out.path())
        .write_cycle(&manifest)
        .await
        .unwrap();
    assert_eq!(output.substituted, 1);

    let pages = read_container(&output.path).pages;
    assert_eq!(pages.len(), 3);
    assert!(pages[1].2.iter().all(|&v| v == 7));
    assert!(pages[2].2.iter().all(|&v| v == 0));
}

#[tokio::test]
async fn test_existing_container_skipped() {
    let out = TempDir::new().unwrap();
    let container = MockContainer::new("cycle1.czi", pixel_grid(), 1, PlaneShape::new(4, 4));
    let adapter = ContainerAdapter::czi(vec![Arc::new(container)], Calibration::default());
    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();

    let writer = MosaicWriter::new(out.path());
    writer.write_cycle(&manifest).await.unwrap();
    let second = writer.write_cycle(&manifest).await.unwrap();
    assert!(second.skipped);
}

#[tokio::test]
async fn test_skipped_container_restores_sidecar() {
    let out = TempDir::new().unwrap();
    let container = MockContainer::new("cycle1.czi", pixel_grid(), 1, PlaneShape::new(4, 4));
    let adapter = ContainerAdapter::czi(vec![Arc::new(container)], Calibration::default());
    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();

    MosaicWriter::new(out.path())
        .write_cycle(&manifest)
        .await
        .unwrap();
    let sidecar = out.path().join("cycle_1.tilescan.xml");
    assert!(!sidecar.exists());

    let second = MosaicWriter::new(out.path())
        .with_sidecar(true)
        .write_cycle(&manifest)
        .await
        .unwrap();
    assert!(second.skipped);
    assert_eq!(second.sidecar.as_deref(), Some(sidecar.as_path()));
    let xml = tokio::fs::read_to_string(&sidecar).await.unwrap();
    assert!(xml.contains("Name=\"TileScanInfo\""));
}

#[tokio::test]
async fn test_dimension_mismatch_leaves_no_file() {
    let export = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_zen_cycle(export.path(), 1, &[(0, 0), (8, 0)], 1, PlaneShape::new(8, 8)).await;
    write_filled(export.path(), "Base_1_c1m02_ORG.tif", PlaneShape::new(9, 8), 1).await;

    let adapter = ZenExportAdapter::new(export.path(), Calibration::default());
    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();
    let writer = MosaicWriter::new(out.path());
    let result = writer.write_cycle(&manifest).await;

    assert!(matches!(
        result,
        Err(MosaicError::DimensionMismatch { tile: 1, .. })
    ));
    assert!(!writer.mosaic_path(CycleId::new(1)).exists());
    assert!(!out.path().join("cycle_1.ome.tif.partial").exists());
}

#[tokio::test]
async fn test_missing_zen_file_written_as_zero_page() {
    let export = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_zen_cycle(export.path(), 1, &[(0, 0), (8, 0)], 2, PlaneShape::new(8, 8)).await;
    tokio::fs::remove_file(export.path().join("Base_1_c2m02_ORG.tif"))
        .await
        .unwrap();

    let adapter = ZenExportAdapter::new(export.path(), Calibration::default());
    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();
    let output = MosaicWriter::new(out.path())
        .write_cycle(&manifest)
        .await
        .unwrap();
    assert_eq!(output.substituted, 1);

    let pages = read_container(&output.path).pages;
    assert_eq!(pages.len(), 4);
    assert!(pages[2].2.iter().all(|&v| v == 1010));
    assert_eq!((pages[3].0, pages[3].1), (8, 8));
    assert!(pages[3].2.iter().all(|&v| v == 0));
}

#[tokio::test]
async fn test_channel_mismatch_produces_no_container() {
    let out = TempDir::new().unwrap();
    let result = build_manifest(acquisition(1, &[(0.0, 0.0), (8.0, 0.0)], 2, &[(0, 1)]))
        .map_err(MosaicError::from);

    assert!(matches!(
        result,
        Err(MosaicError::Manifest(ManifestError::ChannelCountMismatch { .. }))
    ));
    assert!(!out.path().join("cycle_1.ome.tif").exists());
}

#[tokio::test]
async fn test_export_round_trips_through_zen_adapter() {
    let out = TempDir::new().unwrap();
    let container = MockContainer::new("cycle1.czi", pixel_grid(), 2, PlaneShape::new(4, 4))
        .with_depth(2)
        .with_pixels(|tile, channel, z, _, _| (tile * 10 + channel + z) as u16);
    let adapter = ContainerAdapter::czi(vec![Arc::new(container)], Calibration::default());
    let manifest = build_manifest(adapter.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();

    let exported = export_cycle(&manifest, out.path(), &TiffPlaneCodec::new())
        .await
        .unwrap();
    assert_eq!(exported.planes.len(), 6);

    let plane = read_plane(&out.path().join("Base_1_c2m03_ORG.tif")).await;
    assert!(plane.as_raw().iter().all(|&v| v == 22));

    let reread = ZenExportAdapter::new(out.path(), Calibration::default());
    let again = build_manifest(reread.load_cycle(CycleId::new(1)).await.unwrap()).unwrap();
    assert_eq!(again.tile_count, 3);
    assert_eq!(again.channel_count, 2);
    assert_eq!(again.positions, manifest.positions);
}
