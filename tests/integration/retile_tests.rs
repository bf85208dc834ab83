//! Retiling integration tests: grid math, on-disk output, resumption.

use std::path::Path;

use mosaic_prep::error::RetileError;
use mosaic_prep::manifest::PixelOffset;
use mosaic_prep::plane::{Plane, PlaneShape};
use mosaic_prep::retile::{read_ledger, CanvasNaming, Checkpoint, Retiler, TileGrid};
use tempfile::TempDir;

use super::test_utils::{read_plane, write_plane};

fn gradient(width: u32, height: u32) -> Plane {
    Plane::from_fn(width, height, |x, y| ((y * width + x) % 65_000) as u16 + 1)
}

async fn tile_names(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    names
}

#[test]
fn test_grid_for_tall_canvas() {
    let grid = TileGrid::new(3000, 4096, 2000).unwrap();
    assert_eq!(grid.rows(), 3);
    assert_eq!(grid.cols(), 2);
    assert_eq!(grid.tile_count(), 6);
    assert_eq!(grid.pad_bottom(), 3 * 2000 - 4096);
    assert_eq!(grid.pad_right(), 2 * 2000 - 3000);
    assert_eq!(grid.offset(1), Some(PixelOffset::new(0, 0)));
    assert_eq!(grid.offset(2), Some(PixelOffset::new(2000, 0)));
    assert_eq!(grid.offset(3), Some(PixelOffset::new(0, 2000)));
    assert_eq!(grid.offset(6), Some(PixelOffset::new(2000, 4000)));
    assert_eq!(grid.offset(7), None);
}

#[tokio::test]
async fn test_retile_directory_reconstructs_canvases() {
    let stitched = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let (width, height, tile) = (10, 7, 4);
    let canvases = [gradient(width, height), Plane::filled(PlaneShape::new(width, height), 77)];
    write_plane(stitched.path(), "Round0_0.tif", &canvases[0]).await;
    write_plane(stitched.path(), "Round0_1.tif", &canvases[1]).await;

    let report = Retiler::new(tile)
        .unwrap()
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.canvases, 2);
    assert_eq!(report.tiles_written, 12);
    let grid = report.grid.unwrap();
    assert_eq!((grid.rows(), grid.cols()), (2, 3));

    for (channel, canvas) in canvases.iter().enumerate() {
        let dir = out.path().join(format!("Base_1_stitched-{}", channel + 1));
        assert_eq!(
            tile_names(&dir).await,
            vec!["tile1.tif", "tile2.tif", "tile3.tif", "tile4.tif", "tile5.tif", "tile6.tif"]
        );

        let mut rebuilt = vec![0u16; (width * height) as usize];
        for (index, offset) in grid.offsets().into_iter().enumerate() {
            let piece = read_plane(&dir.join(format!("tile{}.tif", index + 1))).await;
            assert_eq!(piece.shape(), PlaneShape::new(tile, tile));
            for y in 0..tile {
                for x in 0..tile {
                    let (cx, cy) = (offset.x as u32 + x, offset.y as u32 + y);
                    if cx < width && cy < height {
                        rebuilt[(cy * width + cx) as usize] = piece.get(x, y);
                    } else {
                        assert_eq!(piece.get(x, y), 0);
                    }
                }
            }
        }
        assert_eq!(rebuilt.as_slice(), canvas.as_raw());
    }

    let ledger = read_ledger(&out.path().join("tilepos.csv")).await.unwrap();
    assert_eq!(ledger, grid.offsets());
}

#[tokio::test]
async fn test_rerun_skips_completed_tiles() {
    let stitched = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_plane(stitched.path(), "Round0_0.tif", &gradient(9, 9)).await;
    let retiler = Retiler::new(4).unwrap();

    let first = retiler
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();
    assert_eq!(first.tiles_written, 9);

    let checkpoint = Checkpoint::load(&out.path().join("Base_1.checkpoint.json"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.completed.len(), 9);
    assert!(checkpoint.channel_complete(0));

    let second = retiler
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();
    assert_eq!(second.tiles_written, 0);
    assert_eq!(second.tiles_skipped, 9);
    assert_eq!(second.canvases, 1);

    let tile_dir = out.path().join("Base_1_stitched-1");
    let before = read_plane(&tile_dir.join("tile5.tif")).await;
    tokio::fs::remove_file(tile_dir.join("tile5.tif")).await.unwrap();

    let third = retiler
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();
    assert_eq!(third.tiles_written, 1);
    assert_eq!(third.tiles_skipped, 8);
    assert_eq!(read_plane(&tile_dir.join("tile5.tif")).await, before);
}

#[tokio::test]
async fn test_new_tile_size_restarts_progress() {
    let stitched = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_plane(stitched.path(), "Round0_0.tif", &gradient(8, 8)).await;

    Retiler::new(4)
        .unwrap()
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();
    let report = Retiler::new(8)
        .unwrap()
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();

    assert_eq!(report.tiles_written, 1);
    assert_eq!(report.tiles_skipped, 0);
    let piece = read_plane(&out.path().join("Base_1_stitched-1").join("tile1.tif")).await;
    assert_eq!(piece.shape(), PlaneShape::new(8, 8));
}

#[tokio::test]
async fn test_resized_canvas_is_retiled_again() {
    let stitched = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let retiler = Retiler::new(4).unwrap();
    write_plane(stitched.path(), "Round0_0.tif", &gradient(8, 8)).await;
    retiler
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();

    write_plane(stitched.path(), "Round0_0.tif", &gradient(12, 12)).await;
    let report = retiler
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.grid, Some(TileGrid::new(12, 12, 4).unwrap()));
    assert_eq!(report.tiles_written, 9);
    assert_eq!(report.tiles_skipped, 0);
    assert!(out.path().join("Base_1_stitched-1").join("tile9.tif").exists());

    let ledger = read_ledger(&out.path().join("tilepos.csv")).await.unwrap();
    assert_eq!(ledger.len(), 9);
    assert_eq!(ledger[8], PixelOffset::new(8, 8));
}

#[tokio::test]
async fn test_mismatched_canvas_is_isolated() {
    let stitched = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_plane(stitched.path(), "Round0_0.tif", &gradient(8, 8)).await;
    write_plane(stitched.path(), "Round0_1.tif", &gradient(8, 6)).await;
    write_plane(stitched.path(), "Round1_0.tif", &gradient(8, 8)).await;
    write_plane(stitched.path(), "overview.tif", &gradient(2, 2)).await;

    let report = Retiler::new(4)
        .unwrap()
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();

    assert_eq!(report.canvases, 2);
    assert_eq!(report.tiles_written, 8);
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().any(|(name, e)| name == "overview.tif"
        && matches!(e, RetileError::InvalidCanvasName(_))));
    assert!(report.failures.iter().any(|(name, e)| name == "Round0_1.tif"
        && matches!(
            e,
            RetileError::DimensionMismatch {
                actual_height: 6,
                ..
            }
        )));
    assert!(out.path().join("Base_2_stitched-1").join("tile4.tif").exists());
}

#[tokio::test]
async fn test_legacy_stitched_names() {
    let stitched = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let shape = PlaneShape::new(8, 8);
    write_plane(stitched.path(), "Base_1_stitched-2.tif", &Plane::filled(shape, 12)).await;
    write_plane(stitched.path(), "Base_2_stitched-1.tif", &Plane::filled(shape, 21)).await;
    write_plane(stitched.path(), "Round0_0.tif", &Plane::filled(shape, 1)).await;

    let report = Retiler::new(4)
        .unwrap()
        .with_naming(CanvasNaming::LegacyStitched)
        .retile_directory(stitched.path(), out.path())
        .await
        .unwrap();

    assert_eq!(report.canvases, 2);
    assert_eq!(report.tiles_written, 8);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        (name, RetileError::InvalidCanvasName(_)) if name == "Round0_0.tif"
    ));

    let second = read_plane(&out.path().join("Base_1_stitched-2").join("tile4.tif")).await;
    assert!(second.as_raw().iter().all(|&v| v == 12));
    let first = read_plane(&out.path().join("Base_2_stitched-1").join("tile1.tif")).await;
    assert!(first.as_raw().iter().all(|&v| v == 21));
    assert!(out.path().join("Base_1.checkpoint.json").exists());
    assert!(out.path().join("Base_2.checkpoint.json").exists());
}
