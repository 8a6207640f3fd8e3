//! Built-in codecs and the planar/interleaved conversion helpers they share.
//!
//! [`install_defaults`] registers the bundled codecs in their standard
//! precedence order. Registration order is detection order, so JPEG is probed
//! before PNG and the headerless raw codec goes last (its probe never
//! matches; raw files bind by forced format name only).

pub mod jpeg;
pub mod png;
pub mod raw;

use std::sync::Arc;

use image::DynamicImage;

use crate::codec::{ImageInfo, ImageMode, PixelBuffer};
use crate::error::{Error, Result};
use crate::registry::FormatRegistry;

/// Register the bundled codecs on `registry` in precedence order.
pub fn install_defaults(registry: &mut FormatRegistry) {
    registry.register(Arc::new(jpeg::JpegCodec::new()));
    registry.register(Arc::new(png::PngCodec::new()));
    registry.register(Arc::new(raw::RawCodec::new()));
}

/// Image mode implied by a bare sample count.
pub(crate) fn mode_for_samples(samples: u32) -> ImageMode {
    match samples {
        1 => ImageMode::Grayscale,
        3 => ImageMode::Rgb,
        4 => ImageMode::Rgba,
        _ => ImageMode::MultiChannel,
    }
}

// =============================================================================
// Interleaved <-> planar conversion
// =============================================================================

/// Split interleaved 8-bit samples into per-sample planes.
pub(crate) fn deinterleave8(data: &[u8], samples: usize) -> Vec<Vec<u8>> {
    let pixels = data.len() / samples;
    let mut planes: Vec<Vec<u8>> = (0..samples).map(|_| Vec::with_capacity(pixels)).collect();
    for chunk in data.chunks_exact(samples) {
        for (s, &value) in chunk.iter().enumerate() {
            planes[s].push(value);
        }
    }
    planes
}

/// Split interleaved 16-bit samples into per-sample planes of
/// little-endian bytes.
pub(crate) fn deinterleave16(data: &[u16], samples: usize) -> Vec<Vec<u8>> {
    let pixels = data.len() / samples;
    let mut planes: Vec<Vec<u8>> = (0..samples)
        .map(|_| Vec::with_capacity(pixels * 2))
        .collect();
    for chunk in data.chunks_exact(samples) {
        for (s, &value) in chunk.iter().enumerate() {
            planes[s].extend_from_slice(&value.to_le_bytes());
        }
    }
    planes
}

/// Convert a decoded [`DynamicImage`] into a planar buffer.
///
/// Exotic layouts are routed through an RGBA8 conversion rather than
/// rejected.
pub(crate) fn buffer_from_dynamic(img: DynamicImage) -> Result<PixelBuffer> {
    let (width, height) = (img.width() as u64, img.height() as u64);
    let (samples, depth, planes) = match img {
        DynamicImage::ImageLuma8(i) => (1u32, 8u32, vec![i.into_raw()]),
        DynamicImage::ImageLumaA8(i) => (2, 8, deinterleave8(&i.into_raw(), 2)),
        DynamicImage::ImageRgb8(i) => (3, 8, deinterleave8(&i.into_raw(), 3)),
        DynamicImage::ImageRgba8(i) => (4, 8, deinterleave8(&i.into_raw(), 4)),
        DynamicImage::ImageLuma16(i) => (1, 16, deinterleave16(&i.into_raw(), 1)),
        DynamicImage::ImageLumaA16(i) => (2, 16, deinterleave16(&i.into_raw(), 2)),
        DynamicImage::ImageRgb16(i) => (3, 16, deinterleave16(&i.into_raw(), 3)),
        DynamicImage::ImageRgba16(i) => (4, 16, deinterleave16(&i.into_raw(), 4)),
        other => return buffer_from_dynamic(DynamicImage::ImageRgba8(other.to_rgba8())),
    };

    let info = ImageInfo {
        width,
        height,
        samples,
        depth,
        mode: mode_for_samples(samples),
        ..Default::default()
    };
    PixelBuffer::from_planes(info, planes)
}

/// Convert a planar buffer back into an interleaved [`DynamicImage`] for
/// encoding. Supports 8- and 16-bit buffers with 1, 3 or 4 samples.
pub(crate) fn dynamic_from_buffer(buf: &PixelBuffer) -> Result<DynamicImage> {
    let info = buf.info();
    let (width, height) = (info.width as u32, info.height as u32);
    let pixels = (info.width * info.height) as usize;

    let invalid = || Error::decode("pixel buffer does not match its declared geometry");
    match (info.depth, info.samples) {
        (8, 1) => image::GrayImage::from_raw(width, height, buf.plane(0).to_vec())
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(invalid),
        (8, samples @ (3 | 4)) => {
            let mut data = Vec::with_capacity(pixels * samples as usize);
            for p in 0..pixels {
                for s in 0..samples as usize {
                    data.push(buf.plane(s)[p]);
                }
            }
            if samples == 3 {
                image::RgbImage::from_raw(width, height, data)
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(invalid)
            } else {
                image::RgbaImage::from_raw(width, height, data)
                    .map(DynamicImage::ImageRgba8)
                    .ok_or_else(invalid)
            }
        }
        (16, samples @ (1 | 3 | 4)) => {
            let mut data = Vec::with_capacity(pixels * samples as usize);
            for p in 0..pixels {
                for s in 0..samples as usize {
                    let plane = buf.plane(s);
                    data.push(u16::from_le_bytes([plane[p * 2], plane[p * 2 + 1]]));
                }
            }
            match samples {
                1 => image::ImageBuffer::from_raw(width, height, data)
                    .map(DynamicImage::ImageLuma16)
                    .ok_or_else(invalid),
                3 => image::ImageBuffer::from_raw(width, height, data)
                    .map(DynamicImage::ImageRgb16)
                    .ok_or_else(invalid),
                _ => image::ImageBuffer::from_raw(width, height, data)
                    .map(DynamicImage::ImageRgba16)
                    .ok_or_else(invalid),
            }
        }
        (depth, samples) => Err(Error::decode(format!(
            "no interleaved encoding for {samples} samples at {depth} bits"
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================
