//! Content and name detection tests over the registry.

use std::sync::Arc;

use rasterhub::{Error, FormatRegistry, MemoryStream, Session};

use super::test_utils::{jpeg_gray, png_gradient, CheckerCodec, MultiPageCodec};

// =============================================================================
// Built-in Codec Detection
// =============================================================================

#[test]
fn test_detects_real_png_and_jpeg() {
    let registry = FormatRegistry::with_default_codecs();

    let mut png = MemoryStream::from_vec(png_gradient(4, 4));
    let m = registry.detect_by_content(&mut png, None).unwrap();
    let codec = registry.codec(m.codec_index).unwrap();
    assert_eq!(codec.descriptor().sub_formats[m.sub_format].name, "png");

    let mut jpeg = MemoryStream::from_vec(jpeg_gray(4, 4, 100));
    let m = registry.detect_by_content(&mut jpeg, None).unwrap();
    let codec = registry.codec(m.codec_index).unwrap();
    assert_eq!(codec.descriptor().sub_formats[m.sub_format].name, "jpeg");
}

#[test]
fn test_unknown_content_is_not_found() {
    let registry = FormatRegistry::with_default_codecs();
    let mut stream = MemoryStream::from_vec(vec![0x42; 64]);
    assert!(matches!(
        registry.detect_by_content(&mut stream, None),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn test_raw_binds_by_name_only() {
    let registry = FormatRegistry::with_default_codecs();

    // Raw bytes never match by content, even with a raw extension hint.
    let mut stream = MemoryStream::from_vec(vec![0u8; 64]);
    assert!(registry
        .detect_by_content(&mut stream, Some("image.raw"))
        .is_err());

    // A forced name resolves and opens.
    let mut session = Session::new(registry);
    session
        .start_read_as(
            Box::new(MemoryStream::from_vec(vec![9u8; 64])),
            "raw",
            Some("width=8 height=8".to_string()),
        )
        .unwrap();
    assert_eq!(session.format_name(), Some("raw"));
    let image = session.read_image(0).unwrap();
    assert!(image.plane(0).iter().all(|&b| b == 9));
}

// =============================================================================
// Precedence and Enumeration
// =============================================================================

#[test]
fn test_registration_order_beats_later_codecs() {
    // CheckerCodec and a second copy share a magic; the earliest wins.
    let first = Arc::new(CheckerCodec::new());
    let second = Arc::new(CheckerCodec::new());

    let mut registry = FormatRegistry::new();
    registry.register(first.clone());
    registry.register(second.clone());

    let mut session = Session::new(registry);
    session.start_read(CheckerCodec::stream(), None).unwrap();
    assert_eq!(first.opens.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(second.opens.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn test_name_lookup_is_case_insensitive() {
    let registry = FormatRegistry::with_default_codecs();
    assert!(registry.detect_by_name("JPEG").is_ok());
    assert!(registry.detect_by_name("Png").is_ok());
    assert!(registry.detect_by_name("webp").is_err());
}

#[test]
fn test_capability_queries_over_builtins() {
    let registry = FormatRegistry::with_default_codecs();
    assert!(registry.supports_reading("jpeg"));
    assert!(registry.supports_writing("png"));
    assert!(!registry.supports_multipage_writing("png"));
    assert!(registry.supports_multipage_writing("raw"));
    assert!(registry.accepts_bits_per_sample("png", 16));
    assert!(!registry.accepts_bits_per_sample("jpeg", 16));
}

#[test]
fn test_extension_enumeration_and_filters() {
    let registry = FormatRegistry::with_default_codecs();
    let extensions = registry.all_extensions();
    assert!(extensions.contains(&"jpg"));
    assert!(extensions.contains(&"png"));
    assert!(extensions.contains(&"raw"));

    let read_filter = registry.read_filter_string();
    assert!(read_filter.contains("*.jpeg"));
    assert!(read_filter.contains("*.png"));
}

#[test]
fn test_registry_clone_carries_codecs_not_sessions() {
    let mut registry = FormatRegistry::new();
    registry.register(Arc::new(MultiPageCodec::new()));

    let mut session = Session::new(registry.clone());
    session.start_read(MultiPageCodec::stream(), None).unwrap();

    // The clone still detects, and the original registry is untouched by
    // the running session.
    let mut second = Session::new(registry);
    second.start_read(MultiPageCodec::stream(), None).unwrap();
    assert_eq!(session.page_count().unwrap(), 2);
    assert_eq!(second.page_count().unwrap(), 2);
}
