//! Session lifecycle tests over real encoded files and synthetic codecs.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use rasterhub::{Error, FormatRegistry, MemoryStream, Session, SessionState};

use super::test_utils::{jpeg_gray, png_gradient, CheckerCodec};

fn checker_session() -> (Session, Arc<CheckerCodec>) {
    let codec = Arc::new(CheckerCodec::new());
    let mut registry = FormatRegistry::new();
    registry.register(codec.clone());
    (Session::new(registry), codec)
}

// =============================================================================
// End-to-End Reads
// =============================================================================

#[test]
fn test_png_read_end_to_end() {
    let mut session = Session::with_default_codecs();
    session
        .start_read(Box::new(MemoryStream::from_vec(png_gradient(8, 6))), None)
        .unwrap();

    assert_eq!(session.state(), SessionState::Reading);
    assert_eq!(session.format_name(), Some("png"));
    assert_eq!(session.codec_name(), Some("PNG codec"));
    assert_eq!(session.info().width, 8);
    assert_eq!(session.info().height, 6);
    assert_eq!(session.page_count().unwrap(), 1);

    let image = session.read_image(0).unwrap();
    assert_eq!(image.samples(), 3);
    // Red plane carries the x coordinate.
    assert_eq!(image.plane(0)[0], 0);
    assert_eq!(image.plane(0)[7], 7);
}

#[test]
fn test_jpeg_read_end_to_end() {
    let mut session = Session::with_default_codecs();
    session
        .start_read(Box::new(MemoryStream::from_vec(jpeg_gray(10, 10, 200))), None)
        .unwrap();

    assert_eq!(session.format_name(), Some("jpeg"));
    let image = session.read_image(0).unwrap();
    assert!(image.plane(0).iter().all(|&b| (b as i16 - 200).abs() <= 4));
}

#[test]
fn test_convert_png_to_jpeg_via_two_sessions() {
    let registry = FormatRegistry::with_default_codecs();
    let dir = std::env::temp_dir().join("rasterhub_session_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("converted.jpg");

    let mut reader = Session::new(registry.clone());
    reader
        .start_read(Box::new(MemoryStream::from_vec(png_gradient(16, 16))), None)
        .unwrap();
    let image = reader.read_image(0).unwrap();

    let mut writer = Session::new(registry);
    writer.create_file(&path, "jpeg", None, 90).unwrap();
    writer.write_image(&image, 0).unwrap();
    writer.end();

    let mut check = Session::with_default_codecs();
    check.open_file(&path).unwrap();
    assert_eq!(check.format_name(), Some("jpeg"));
    assert_eq!(check.info().width, 16);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_same_session_reusable_for_write_after_end() {
    let dir = std::env::temp_dir().join("rasterhub_session_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("reused.jpg");

    let mut session = Session::with_default_codecs();
    session
        .start_read(Box::new(MemoryStream::from_vec(png_gradient(9, 7))), None)
        .unwrap();
    let image = session.read_image(0).unwrap();
    session.end();
    assert_eq!(session.state(), SessionState::Inactive);

    // The very same session starts a write, then reads its output back.
    session.create_file(&path, "jpeg", None, 90).unwrap();
    assert_eq!(session.state(), SessionState::Writing);
    session.write_image(&image, 0).unwrap();
    session.end();

    session.open_file(&path).unwrap();
    assert_eq!(session.format_name(), Some("jpeg"));
    assert_eq!(session.info().width, 9);
    assert_eq!(session.info().height, 7);

    std::fs::remove_file(&path).ok();
}

// =============================================================================
// Lifecycle Invariants
// =============================================================================

#[test]
fn test_implicit_end_and_idempotent_teardown() {
    let (mut session, codec) = checker_session();
    session.start_read(CheckerCodec::stream(), None).unwrap();
    session.start_read(CheckerCodec::stream(), None).unwrap();
    assert_eq!(codec.closes.load(Ordering::SeqCst), 1);

    session.end();
    session.end();
    assert_eq!(codec.closes.load(Ordering::SeqCst), 2);
    assert_eq!(codec.opens.load(Ordering::SeqCst), 2);
    assert_eq!(session.state(), SessionState::Inactive);
}

#[test]
fn test_failed_start_leaves_previous_session_closed() {
    let (mut session, codec) = checker_session();
    session.start_read(CheckerCodec::stream(), None).unwrap();

    // Unknown content fails detection, but the first session is still ended.
    let bad = Box::new(MemoryStream::from_vec(b"????????".to_vec()));
    assert!(session.start_read(bad, None).is_err());
    assert_eq!(session.state(), SessionState::Inactive);
    assert_eq!(codec.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_state_gating() {
    let mut session = Session::with_default_codecs();
    assert!(matches!(
        session.page_count(),
        Err(Error::InvalidState { .. })
    ));

    session
        .start_read(Box::new(MemoryStream::from_vec(png_gradient(4, 4))), None)
        .unwrap();
    let image = session.read_image(0).unwrap();
    assert!(matches!(
        session.write_image(&image, 0),
        Err(Error::InvalidState {
            expected: "writing",
            actual: "reading",
        })
    ));
}

#[test]
fn test_abort_callback_stops_decode() {
    let mut session = Session::with_default_codecs();
    session.set_abort(Arc::new(|| true));
    session
        .start_read(Box::new(MemoryStream::from_vec(png_gradient(4, 4))), None)
        .unwrap();
    assert!(matches!(session.read_image(0), Err(Error::Decode(_))));
}

#[test]
fn test_tile_capabilities_surface_through_session() {
    let (mut session, _) = checker_session();
    session.start_read(CheckerCodec::stream(), None).unwrap();

    assert!(session.supports_tiles());
    let tile = session.read_tile(0, 2, 1, 0).unwrap();
    assert_eq!(tile.info().width, 32);
    assert!(tile
        .plane(0)
        .iter()
        .all(|&b| b == super::test_utils::checker_tile_value(0, 2, 1)));

    // Levels are not served directly by this codec.
    assert!(!session.supports_levels());
    assert!(matches!(
        session.read_level(0, 1),
        Err(Error::Unsupported {
            operation: "read_level"
        })
    ));
}
