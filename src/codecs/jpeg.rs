//! Baseline JPEG codec backed by the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::{DynamicImage, ImageDecoder, ImageFormat};

use crate::codec::{
    CapabilityDescriptor, Codec, CodecInstance, FormatConstraints, ImageInfo, OpenContext,
    OpenMode, PixelBuffer, SubFormat,
};
use crate::codecs::{buffer_from_dynamic, dynamic_from_buffer, mode_for_samples};
use crate::error::{Error, Result};
use crate::io::Stream;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

pub struct JpegCodec {
    descriptor: CapabilityDescriptor,
}

impl JpegCodec {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor {
                name: "JPEG codec",
                version: "1.0.0",
                sniff_len: JPEG_MAGIC.len(),
                sub_formats: vec![SubFormat {
                    name: "jpeg",
                    long_name: "JPEG File Interchange Format",
                    extensions: "jpg|jpeg|jpe",
                    can_read: true,
                    can_write: true,
                    can_read_meta: false,
                    can_write_meta: false,
                    can_write_multipage: false,
                    constraints: FormatConstraints {
                        max_width: 65535,
                        max_height: 65535,
                        max_pages: 1,
                        min_samples_per_pixel: 1,
                        max_samples_per_pixel: 3,
                        min_bits_per_sample: 8,
                        max_bits_per_sample: 8,
                        lut_not_supported: true,
                    },
                }],
            },
        }
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for JpegCodec {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    fn validate(&self, magic: &[u8], _name: Option<&str>) -> Option<usize> {
        magic.starts_with(JPEG_MAGIC).then_some(0)
    }

    fn open(
        &self,
        mut stream: Box<dyn Stream>,
        mode: OpenMode,
        ctx: OpenContext,
    ) -> Result<Box<dyn CodecInstance>> {
        match mode {
            OpenMode::Read => {
                // Slurp the source once; the stream is not needed afterwards.
                let data = stream.read_all()?;
                stream.close()?;
                let mut instance = JpegReader {
                    data,
                    info: None,
                    ctx,
                };
                instance.header_info()?; // fail on a corrupt header here
                Ok(Box::new(instance))
            }
            OpenMode::Write => Ok(Box::new(JpegWriter {
                stream: Some(stream),
                quality: ctx.quality,
                written: false,
            })),
        }
    }
}

// =============================================================================
// Reading
// =============================================================================

struct JpegReader {
    data: Vec<u8>,
    info: Option<ImageInfo>,
    ctx: OpenContext,
}

impl JpegReader {
    /// Geometry from the header alone, memoized; no pixel decode.
    fn header_info(&mut self) -> Result<ImageInfo> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }
        let decoder = JpegDecoder::new(Cursor::new(&self.data))
            .map_err(|e| Error::decode(format!("jpeg header: {e}")))?;
        let (width, height) = decoder.dimensions();
        let samples = decoder.color_type().channel_count() as u32;
        let info = ImageInfo {
            width: width as u64,
            height: height as u64,
            samples,
            depth: 8,
            mode: mode_for_samples(samples),
            ..Default::default()
        };
        self.info = Some(info.clone());
        Ok(info)
    }
}

impl CodecInstance for JpegReader {
    fn info(&mut self, page: usize) -> Result<ImageInfo> {
        if page > 0 {
            return Err(Error::decode("jpeg files hold a single page"));
        }
        self.header_info()
    }

    fn page_count(&mut self) -> Result<usize> {
        Ok(1)
    }

    fn read_image(&mut self, page: usize) -> Result<PixelBuffer> {
        if page > 0 {
            return Err(Error::decode("jpeg files hold a single page"));
        }
        if self.ctx.aborted() {
            return Err(Error::decode("decode aborted"));
        }
        let img = image::load_from_memory_with_format(&self.data, ImageFormat::Jpeg)
            .map_err(|e| Error::decode(format!("jpeg decode: {e}")))?;
        buffer_from_dynamic(img)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Writing
// =============================================================================

struct JpegWriter {
    stream: Option<Box<dyn Stream>>,
    quality: u8,
    written: bool,
}

impl CodecInstance for JpegWriter {
    fn info(&mut self, _page: usize) -> Result<ImageInfo> {
        Err(Error::InvalidState {
            expected: "reading",
            actual: "writing",
        })
    }

    fn page_count(&mut self) -> Result<usize> {
        Ok(if self.written { 1 } else { 0 })
    }

    fn read_image(&mut self, _page: usize) -> Result<PixelBuffer> {
        Err(Error::InvalidState {
            expected: "reading",
            actual: "writing",
        })
    }

    fn write_image(&mut self, image: &PixelBuffer, _page: usize) -> Result<()> {
        if self.written {
            return Err(Error::Unsupported {
                operation: "multi-page jpeg write",
            });
        }
        let stream = self.stream.as_mut().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "write target is closed",
            ))
        })?;

        // JPEG is 8-bit grayscale or RGB; anything else converts down.
        let img = dynamic_from_buffer(image)?;
        let img = match img {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
            other if other.color().has_color() => DynamicImage::ImageRgb8(other.to_rgb8()),
            other => DynamicImage::ImageLuma8(other.to_luma8()),
        };

        let mut encoded = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut encoded), self.quality);
        img.write_with_encoder(encoder)
            .map_err(|e| Error::decode(format!("jpeg encode: {e}")))?;
        stream.write_all(&encoded)?;
        stream.flush()?;
        self.written = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.close()?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
