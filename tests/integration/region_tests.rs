//! Region composition tests over tiled and plain sources.

use std::sync::Arc;

use rasterhub::{Error, FormatRegistry, MemoryStream, MetaSession, RegionReader, Session};

use super::test_utils::{checker_tile_value, png_gradient, CheckerCodec};

fn checker_reader(failing_tiles: Vec<(u64, u64)>) -> RegionReader {
    let mut registry = FormatRegistry::new();
    registry.register(Arc::new(CheckerCodec::with_failing_tiles(failing_tiles)));
    let mut meta = MetaSession::new(Session::new(registry));
    meta.start_read(CheckerCodec::stream(), None).unwrap();
    RegionReader::new(meta)
}

// =============================================================================
// Level Resolution
// =============================================================================

#[test]
fn test_level_dimensions_follow_scales() {
    let mut reader = checker_reader(Vec::new());
    assert_eq!(reader.level_count(0).unwrap(), 3);
    assert_eq!(reader.level_dimensions(0, 0).unwrap(), (128, 128));
    assert_eq!(reader.level_dimensions(0, 1).unwrap(), (64, 64));
    assert_eq!(reader.level_dimensions(0, 2).unwrap(), (32, 32));
}

#[test]
fn test_unmatched_scale_fails_hard() {
    let mut reader = checker_reader(Vec::new());
    assert!(matches!(
        reader.read_region(0, 0, 0, 8, 8, 4),
        Err(Error::NotFound { .. })
    ));
}

// =============================================================================
// Composition
// =============================================================================

#[test]
fn test_tile_aligned_region_is_exact() {
    let mut reader = checker_reader(Vec::new());
    let region = reader.read_region(0, 32, 64, 64, 96, 0).unwrap();
    assert_eq!(region.info().width, 32);
    assert_eq!(region.info().height, 32);
    assert!(region
        .plane(0)
        .iter()
        .all(|&b| b == checker_tile_value(0, 1, 2)));
}

#[test]
fn test_stitching_across_four_tiles() {
    let mut reader = checker_reader(Vec::new());
    // 16..48 touches tiles (0,0), (1,0), (0,1), (1,1).
    let region = reader.read_region(0, 16, 16, 48, 48, 0).unwrap();
    let row = region.row_bytes();
    assert_eq!(region.plane(0)[0], checker_tile_value(0, 0, 0));
    assert_eq!(region.plane(0)[31], checker_tile_value(0, 1, 0));
    assert_eq!(region.plane(0)[31 * row], checker_tile_value(0, 0, 1));
    assert_eq!(region.plane(0)[31 * row + 31], checker_tile_value(0, 1, 1));
}

#[test]
fn test_failed_tiles_leave_footprint_blank() {
    let mut reader = checker_reader(vec![(1, 1)]);
    let region = reader.read_region(0, 16, 16, 48, 48, 0).unwrap();
    let row = region.row_bytes();
    // Three quadrants intact, the failing tile's quadrant zeroed.
    assert_eq!(region.plane(0)[0], checker_tile_value(0, 0, 0));
    assert_eq!(region.plane(0)[31], checker_tile_value(0, 1, 0));
    assert_eq!(region.plane(0)[31 * row + 31], 0);
}

#[test]
fn test_region_clamps_to_level_bounds() {
    let mut reader = checker_reader(Vec::new());
    let region = reader.read_region(0, 112, 120, 500, 500, 0).unwrap();
    assert_eq!(region.info().width, 16);
    assert_eq!(region.info().height, 8);
    assert!(region
        .plane(0)
        .iter()
        .all(|&b| b == checker_tile_value(0, 3, 3)));

    assert!(reader.read_region(0, 130, 0, 140, 8, 0).is_err());
}

#[test]
fn test_downsampled_level_composition() {
    let mut reader = checker_reader(Vec::new());
    // Level 2 is a single 32px tile.
    let level = reader.read_level(0, 2).unwrap();
    assert_eq!(level.info().width, 32);
    assert!(level
        .plane(0)
        .iter()
        .all(|&b| b == checker_tile_value(2, 0, 0)));

    // Level 1 stitches a 2x2 tile grid.
    let level = reader.read_level(0, 1).unwrap();
    assert_eq!(level.info().width, 64);
    let row = level.row_bytes();
    assert_eq!(level.plane(0)[0], checker_tile_value(1, 0, 0));
    assert_eq!(level.plane(0)[63 * row + 63], checker_tile_value(1, 1, 1));
}

#[test]
fn test_arbitrary_tile_grid_recomposition() {
    let mut reader = checker_reader(Vec::new());
    // A 48px grid over the 128px level: tile (1, 0) spans 48..96 and
    // crosses native tile columns 1..3.
    let tile = reader.read_tile(0, 1, 0, 48, 0).unwrap();
    assert_eq!(tile.info().width, 48);
    assert_eq!(tile.info().height, 48);
    assert_eq!(tile.plane(0)[0], checker_tile_value(0, 1, 0));
    assert_eq!(tile.plane(0)[47], checker_tile_value(0, 2, 0));

    // Edge tile is clamped.
    let edge = reader.read_tile(0, 2, 2, 48, 0).unwrap();
    assert_eq!(edge.info().width, 32);
    assert_eq!(edge.info().height, 32);

    assert!(matches!(
        reader.read_tile(0, 3, 0, 48, 0),
        Err(Error::NotFound { .. })
    ));
}

// =============================================================================
// Non-Tiled Fallback
// =============================================================================

#[test]
fn test_png_region_crops_full_decode() {
    let mut meta = MetaSession::with_default_codecs();
    meta.start_read(Box::new(MemoryStream::from_vec(png_gradient(16, 16))), None)
        .unwrap();
    let mut reader = RegionReader::new(meta);

    let region = reader.read_region(0, 4, 2, 12, 10, 0).unwrap();
    assert_eq!(region.info().width, 8);
    assert_eq!(region.info().height, 8);
    // Red plane carries the x coordinate of the source.
    assert_eq!(region.plane(0)[0], 4);
    // Green plane carries the y coordinate of the source.
    assert_eq!(region.plane(1)[0], 2);

    // No pyramid behind a plain PNG.
    assert!(reader.read_region(0, 0, 0, 8, 8, 1).is_err());
}
