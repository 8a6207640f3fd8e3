//! Headerless raw codec.
//!
//! Raw buffers carry no magic, so the content probe never matches; a raw
//! source binds only through a forced format name, with the pixel layout
//! supplied in the open options string:
//!
//! ```text
//! width=512 height=512 channels=3 depth=8 offset=0 big_endian=0 interleaved=0
//! ```
//!
//! `width` and `height` are required for reading; everything else defaults.
//! Multiple pages are stored back to back, so the page count falls out of
//! the source size.

use crate::codec::{
    CapabilityDescriptor, Codec, CodecInstance, FormatConstraints, ImageInfo, OpenContext,
    OpenMode, PixelBuffer, SubFormat,
};
use crate::codecs::mode_for_samples;
use crate::error::{Error, Result};
use crate::io::Stream;

pub struct RawCodec {
    descriptor: CapabilityDescriptor,
}

impl RawCodec {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor {
                name: "RAW codec",
                version: "1.0.0",
                sniff_len: 0,
                sub_formats: vec![SubFormat {
                    name: "raw",
                    long_name: "Headerless pixel buffer",
                    extensions: "raw|bin",
                    can_read: true,
                    can_write: true,
                    can_read_meta: false,
                    can_write_meta: false,
                    can_write_multipage: true,
                    constraints: FormatConstraints::default(),
                }],
            },
        }
    }
}

impl Default for RawCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for RawCodec {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    /// Raw data is unrecognizable by content.
    fn validate(&self, _magic: &[u8], _name: Option<&str>) -> Option<usize> {
        None
    }

    fn open(
        &self,
        stream: Box<dyn Stream>,
        mode: OpenMode,
        ctx: OpenContext,
    ) -> Result<Box<dyn CodecInstance>> {
        match mode {
            OpenMode::Read => {
                let layout = RawLayout::parse(ctx.options.as_deref())?;
                if layout.width == 0 || layout.height == 0 {
                    return Err(Error::decode(
                        "raw layout requires width= and height= options",
                    ));
                }
                Ok(Box::new(RawReader { stream, layout }))
            }
            OpenMode::Write => Ok(Box::new(RawWriter {
                stream: Some(stream),
                pages_written: 0,
            })),
        }
    }
}

// =============================================================================
// Layout options
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawLayout {
    width: u64,
    height: u64,
    samples: u32,
    depth: u32,
    offset: u64,
    big_endian: bool,
    interleaved: bool,
}

impl Default for RawLayout {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            samples: 1,
            depth: 8,
            offset: 0,
            big_endian: false,
            interleaved: false,
        }
    }
}

impl RawLayout {
    /// Parse a whitespace- or comma-separated `key=value` options string.
    fn parse(options: Option<&str>) -> Result<Self> {
        let mut layout = Self::default();
        let Some(options) = options else {
            return Ok(layout);
        };
        for pair in options.split(|c: char| c.is_whitespace() || c == ',') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::decode(format!("malformed raw option '{pair}'")))?;
            let parse_err = || Error::decode(format!("bad value in raw option '{pair}'"));
            match key {
                "width" => layout.width = value.parse().map_err(|_| parse_err())?,
                "height" => layout.height = value.parse().map_err(|_| parse_err())?,
                "channels" => layout.samples = value.parse().map_err(|_| parse_err())?,
                "depth" => layout.depth = value.parse().map_err(|_| parse_err())?,
                "offset" => layout.offset = value.parse().map_err(|_| parse_err())?,
                "big_endian" => layout.big_endian = value == "1" || value == "true",
                "interleaved" => layout.interleaved = value == "1" || value == "true",
                other => {
                    return Err(Error::decode(format!("unknown raw option '{other}'")));
                }
            }
        }
        if layout.depth % 8 != 0 || layout.depth == 0 {
            return Err(Error::decode("raw depth must be a whole number of bytes"));
        }
        if layout.samples == 0 {
            return Err(Error::decode("raw channels must be at least 1"));
        }
        Ok(layout)
    }

    fn info(&self, pages: u64) -> ImageInfo {
        ImageInfo {
            width: self.width,
            height: self.height,
            pages,
            samples: self.samples,
            depth: self.depth,
            mode: mode_for_samples(self.samples),
            big_endian: self.big_endian,
            ..Default::default()
        }
    }

    fn plane_bytes(&self) -> u64 {
        self.width * self.height * (self.depth as u64 / 8)
    }

    fn page_bytes(&self) -> u64 {
        self.plane_bytes() * self.samples as u64
    }
}

// =============================================================================
// Reading
// =============================================================================

struct RawReader {
    stream: Box<dyn Stream>,
    layout: RawLayout,
}

impl RawReader {
    fn pages(&self) -> u64 {
        let payload = self.stream.size().saturating_sub(self.layout.offset);
        (payload / self.layout.page_bytes()).max(1)
    }
}

impl CodecInstance for RawReader {
    fn info(&mut self, page: usize) -> Result<ImageInfo> {
        if page as u64 >= self.pages() {
            return Err(Error::decode(format!(
                "page {page} outside the {}-page raw source",
                self.pages()
            )));
        }
        Ok(self.layout.info(self.pages()))
    }

    fn page_count(&mut self) -> Result<usize> {
        Ok(self.pages() as usize)
    }

    fn read_image(&mut self, page: usize) -> Result<PixelBuffer> {
        let info = self.info(page)?;
        let start = self.layout.offset + page as u64 * self.layout.page_bytes();
        self.stream.seek(std::io::SeekFrom::Start(start))?;

        let samples = self.layout.samples as usize;
        let plane_bytes = self.layout.plane_bytes() as usize;
        let planes = if self.layout.interleaved {
            let mut page_data = vec![0u8; self.layout.page_bytes() as usize];
            self.stream.read_exact(&mut page_data)?;
            deinterleave_bytes(&page_data, samples, (self.layout.depth / 8) as usize)
        } else {
            let mut planes = Vec::with_capacity(samples);
            for _ in 0..samples {
                let mut plane = vec![0u8; plane_bytes];
                self.stream.read_exact(&mut plane)?;
                planes.push(plane);
            }
            planes
        };
        PixelBuffer::from_planes(info, planes)
    }

    fn close(&mut self) -> Result<()> {
        self.stream.close()
    }
}

/// Split sample-interleaved bytes into planes, `bytes_per_sample` at a time.
fn deinterleave_bytes(data: &[u8], samples: usize, bytes_per_sample: usize) -> Vec<Vec<u8>> {
    let plane_len = data.len() / samples;
    let mut planes: Vec<Vec<u8>> = (0..samples).map(|_| Vec::with_capacity(plane_len)).collect();
    for pixel in data.chunks_exact(samples * bytes_per_sample) {
        for (s, sample) in pixel.chunks_exact(bytes_per_sample).enumerate() {
            planes[s].extend_from_slice(sample);
        }
    }
    planes
}

// =============================================================================
// Writing
// =============================================================================

/// Appends pages back to back as planar bytes, no header.
struct RawWriter {
    stream: Option<Box<dyn Stream>>,
    pages_written: usize,
}

impl CodecInstance for RawWriter {
    fn info(&mut self, _page: usize) -> Result<ImageInfo> {
        Err(Error::InvalidState {
            expected: "reading",
            actual: "writing",
        })
    }

    fn page_count(&mut self) -> Result<usize> {
        Ok(self.pages_written)
    }

    fn read_image(&mut self, _page: usize) -> Result<PixelBuffer> {
        Err(Error::InvalidState {
            expected: "reading",
            actual: "writing",
        })
    }

    fn write_image(&mut self, image: &PixelBuffer, _page: usize) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "write target is closed",
            ))
        })?;
        for s in 0..image.samples() {
            stream.write_all(image.plane(s))?;
        }
        stream.flush()?;
        self.pages_written += 1;
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
