//! PNG codec backed by the `image` crate.
//!
//! PNG carries 8- and 16-bit grayscale, RGB and alpha variants losslessly,
//! which makes it the conversion target of choice for anything the JPEG
//! codec would have to clip.

use std::io::Cursor;

use image::codecs::png::PngDecoder;
use image::{ImageDecoder, ImageFormat};

use crate::codec::{
    CapabilityDescriptor, Codec, CodecInstance, FormatConstraints, ImageInfo, OpenContext,
    OpenMode, PixelBuffer, SubFormat,
};
use crate::codecs::{buffer_from_dynamic, dynamic_from_buffer, mode_for_samples};
use crate::error::{Error, Result};
use crate::io::Stream;
use crate::meta::MetadataMap;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub struct PngCodec {
    descriptor: CapabilityDescriptor,
}

impl PngCodec {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor {
                name: "PNG codec",
                version: "1.0.0",
                sniff_len: PNG_MAGIC.len(),
                sub_formats: vec![SubFormat {
                    name: "png",
                    long_name: "Portable Network Graphics",
                    extensions: "png",
                    can_read: true,
                    can_write: true,
                    can_read_meta: true,
                    can_write_meta: false,
                    can_write_multipage: false,
                    constraints: FormatConstraints {
                        max_pages: 1,
                        min_samples_per_pixel: 1,
                        max_samples_per_pixel: 4,
                        min_bits_per_sample: 8,
                        max_bits_per_sample: 16,
                        ..Default::default()
                    },
                }],
            },
        }
    }
}

impl Default for PngCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for PngCodec {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    fn validate(&self, magic: &[u8], _name: Option<&str>) -> Option<usize> {
        magic.starts_with(PNG_MAGIC).then_some(0)
    }

    fn open(
        &self,
        mut stream: Box<dyn Stream>,
        mode: OpenMode,
        ctx: OpenContext,
    ) -> Result<Box<dyn CodecInstance>> {
        match mode {
            OpenMode::Read => {
                let data = stream.read_all()?;
                stream.close()?;
                let mut instance = PngReader {
                    data,
                    info: None,
                    color_type: "",
                    ctx,
                };
                instance.header_info()?;
                Ok(Box::new(instance))
            }
            OpenMode::Write => Ok(Box::new(PngWriter {
                stream: Some(stream),
                written: false,
            })),
        }
    }
}

// =============================================================================
// Reading
// =============================================================================

struct PngReader {
    data: Vec<u8>,
    info: Option<ImageInfo>,
    color_type: &'static str,
    ctx: OpenContext,
}

impl PngReader {
    fn header_info(&mut self) -> Result<ImageInfo> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }
        let decoder = PngDecoder::new(Cursor::new(&self.data))
            .map_err(|e| Error::decode(format!("png header: {e}")))?;
        let (width, height) = decoder.dimensions();
        let color = decoder.color_type();
        let samples = color.channel_count() as u32;
        let depth = (color.bits_per_pixel() / color.channel_count() as u16) as u32;
        self.color_type = match color {
            image::ColorType::L8 | image::ColorType::L16 => "grayscale",
            image::ColorType::La8 | image::ColorType::La16 => "grayscale alpha",
            image::ColorType::Rgb8 | image::ColorType::Rgb16 => "truecolor",
            image::ColorType::Rgba8 | image::ColorType::Rgba16 => "truecolor alpha",
            _ => "unknown",
        };
        let info = ImageInfo {
            width: width as u64,
            height: height as u64,
            samples,
            depth,
            mode: mode_for_samples(samples),
            ..Default::default()
        };
        self.info = Some(info.clone());
        Ok(info)
    }
}

impl CodecInstance for PngReader {
    fn info(&mut self, page: usize) -> Result<ImageInfo> {
        if page > 0 {
            return Err(Error::decode("png files hold a single page"));
        }
        self.header_info()
    }

    fn page_count(&mut self) -> Result<usize> {
        Ok(1)
    }

    fn read_image(&mut self, page: usize) -> Result<PixelBuffer> {
        if page > 0 {
            return Err(Error::decode("png files hold a single page"));
        }
        if self.ctx.aborted() {
            return Err(Error::decode("decode aborted"));
        }
        let img = image::load_from_memory_with_format(&self.data, ImageFormat::Png)
            .map_err(|e| Error::decode(format!("png decode: {e}")))?;
        buffer_from_dynamic(img)
    }

    fn supports_metadata(&self) -> bool {
        true
    }

    fn append_metadata(&mut self, _page: usize, map: &mut MetadataMap) -> Result<()> {
        map.set_str("png_color_type", self.color_type);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Writing
// =============================================================================

struct PngWriter {
    stream: Option<Box<dyn Stream>>,
    written: bool,
}

impl CodecInstance for PngWriter {
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
                operation: "multi-page png write",
            });
        }
        let stream = self.stream.as_mut().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "write target is closed",
            ))
        })?;

        let img = dynamic_from_buffer(image)?;
        let mut encoded = Vec::new();
        img.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .map_err(|e| Error::decode(format!("png encode: {e}")))?;
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
