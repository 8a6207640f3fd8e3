//! Metadata normalization tests: canonical tags, precedence, memoization.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use rasterhub::meta::tags;
use rasterhub::{FormatRegistry, MemoryStream, MetaSession, Session};

use super::test_utils::{png_gradient, CheckerCodec, MultiPageCodec};

fn checker_meta() -> MetaSession {
    let mut registry = FormatRegistry::new();
    registry.register(Arc::new(CheckerCodec::new()));
    let mut meta = MetaSession::new(Session::new(registry));
    meta.start_read(CheckerCodec::stream(), None).unwrap();
    meta
}

// =============================================================================
// Canonical Tags
// =============================================================================

#[test]
fn test_geometry_and_pixel_tags_derived() {
    let mut meta = checker_meta();
    let map = meta.metadata(0).unwrap();

    assert_eq!(map.get_int(tags::IMAGE_NUM_X, 0), 128);
    assert_eq!(map.get_int(tags::IMAGE_NUM_Y, 0), 128);
    assert_eq!(map.get_int(tags::IMAGE_NUM_C, 0), 1);
    assert_eq!(map.get_int(tags::IMAGE_NUM_P, 0), 1);
    assert_eq!(map.get_int(tags::PIXEL_DEPTH, 0), 8);
    assert_eq!(map.get_str(tags::PIXEL_FORMAT, ""), "unsigned integer");
    assert_eq!(map.get_str(tags::IMAGE_MODE, ""), "grayscale");
    assert_eq!(map.get_str(tags::IMAGE_DIMENSIONS, ""), "XYC");
    assert_eq!(map.get_str(tags::IMAGE_FORMAT, ""), "chk");
}

#[test]
fn test_pyramid_and_tile_tags() {
    let mut meta = checker_meta();
    let map = meta.metadata(0).unwrap();

    assert_eq!(map.get_int(tags::IMAGE_NUM_RES_L, 0), 3);
    assert_eq!(map.get_float_list(tags::IMAGE_RES_L_SCALES), vec![1.0, 0.5, 0.25]);
    assert_eq!(map.get_int(tags::TILE_NUM_X, 0), 32);
    assert_eq!(map.get_int(tags::TILE_NUM_Y, 0), 32);
    assert_eq!(map.get_str(tags::TILE_LAYOUT, ""), "constant");
}

#[test]
fn test_resolution_published_in_micrometers() {
    let mut meta = checker_meta();
    assert!((meta.pixel_size_x().unwrap() - 0.25).abs() < 1e-9);

    let map = meta.metadata(0).unwrap();
    assert!((map.get_float(tags::PIXEL_RESOLUTION_X, 0.0) - 0.25).abs() < 1e-9);
    assert_eq!(map.get_str(tags::PIXEL_RESOLUTION_UNIT_X, ""), "microns");
}

#[test]
fn test_codec_supplied_tags_win() {
    let mut meta = checker_meta();
    assert_eq!(meta.imaging_time().unwrap(), "2020-01-02 03:04:05");
    let names = meta.channel_names().unwrap();
    assert_eq!(names, &["Gray".to_string()]);
}

#[test]
fn test_single_channel_display_defaults() {
    let mut meta = checker_meta();
    let map = meta.metadata(0).unwrap();

    // One gray channel lights red, green and blue; the rest is unassigned.
    assert_eq!(map.get_int(tags::DISPLAY_CHANNEL_RED, -2), 0);
    assert_eq!(map.get_int(tags::DISPLAY_CHANNEL_GREEN, -2), 0);
    assert_eq!(map.get_int(tags::DISPLAY_CHANNEL_BLUE, -2), 0);
    assert_eq!(map.get_int(tags::DISPLAY_CHANNEL_CYAN, -2), -1);
    assert_eq!(map.get_str(&tags::channel_color(0), ""), "255,255,255");
}

#[test]
fn test_rgb_png_normalizes() {
    let mut meta = MetaSession::with_default_codecs();
    meta.start_read(Box::new(MemoryStream::from_vec(png_gradient(12, 8))), None)
        .unwrap();
    let map = meta.metadata(0).unwrap();

    assert_eq!(map.get_int(tags::IMAGE_NUM_X, 0), 12);
    assert_eq!(map.get_int(tags::IMAGE_NUM_C, 0), 3);
    assert_eq!(map.get_str(tags::IMAGE_MODE, ""), "RGB");
    assert_eq!(map.get_str(tags::IMAGE_FORMAT, ""), "png");
    assert_eq!(map.get_str(&tags::channel_name(0), ""), "Red");
    assert_eq!(map.get_str(&tags::channel_name(2), ""), "Blue");
    // Codec-native tag travels through untouched.
    assert_eq!(map.get_str("png_color_type", ""), "truecolor");
    // No pyramid: one level, no scale or tile tags.
    assert_eq!(map.get_int(tags::IMAGE_NUM_RES_L, 0), 1);
    assert!(!map.contains(tags::IMAGE_RES_L_SCALES));
    assert!(!map.contains(tags::TILE_NUM_X));
}

// =============================================================================
// Memoization
// =============================================================================

#[test]
fn test_memo_holds_one_page() {
    let codec = Arc::new(MultiPageCodec::new());
    let mut registry = FormatRegistry::new();
    registry.register(codec.clone());
    let mut meta = MetaSession::new(Session::new(registry));
    meta.start_read(MultiPageCodec::stream(), None).unwrap();

    assert_eq!(meta.metadata(0).unwrap().get_int("source_page", -1), 0);
    meta.metadata(0).unwrap();
    meta.metadata(0).unwrap();
    assert_eq!(codec.metadata_appends.load(Ordering::SeqCst), 1);

    // Switching pages reparses; switching back reparses again.
    assert_eq!(meta.metadata(1).unwrap().get_int("source_page", -1), 1);
    assert_eq!(codec.metadata_appends.load(Ordering::SeqCst), 2);
    meta.metadata(0).unwrap();
    assert_eq!(codec.metadata_appends.load(Ordering::SeqCst), 3);
}

#[test]
fn test_restart_invalidates_memo() {
    let codec = Arc::new(MultiPageCodec::new());
    let mut registry = FormatRegistry::new();
    registry.register(codec.clone());
    let mut meta = MetaSession::new(Session::new(registry));

    meta.start_read(MultiPageCodec::stream(), None).unwrap();
    meta.metadata(0).unwrap();
    meta.start_read(MultiPageCodec::stream(), None).unwrap();
    meta.metadata(0).unwrap();
    assert_eq!(codec.metadata_appends.load(Ordering::SeqCst), 2);
}
