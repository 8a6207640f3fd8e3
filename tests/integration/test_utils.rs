//! Test utilities for integration tests.
//!
//! Provides synthetic codecs with predictable pixel content plus helpers
//! for producing real encoded files in memory.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rasterhub::meta::tags;
use rasterhub::{
    CapabilityDescriptor, Codec, CodecInstance, Error, FormatConstraints, ImageInfo, MetadataMap,
    OpenContext, OpenMode, PixelBuffer, ResolutionUnit, Result, Stream, SubFormat,
};

// =============================================================================
// Checkerboard Pyramid Codec
// =============================================================================

pub const CHECKER_MAGIC: &[u8] = b"CHK0";

/// Deterministic fill value of one native tile.
pub fn checker_tile_value(level: usize, xid: u64, yid: u64) -> u8 {
    (level as u8) * 50 + (yid as u8) * 8 + xid as u8 + 1
}

/// Synthetic tiled pyramid: 128x128 grayscale, 32px tiles, three levels
/// with scales 1.0, 0.5, 0.25. Every tile is filled with
/// [`checker_tile_value`]; selected level-0 tiles can be made to fail.
/// Opens and closes are counted for lifecycle assertions.
pub struct CheckerCodec {
    descriptor: CapabilityDescriptor,
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    failing_tiles: Vec<(u64, u64)>,
}

impl CheckerCodec {
    pub fn new() -> Self {
        Self::with_failing_tiles(Vec::new())
    }

    pub fn with_failing_tiles(failing_tiles: Vec<(u64, u64)>) -> Self {
        Self {
            descriptor: CapabilityDescriptor {
                name: "Checker codec",
                version: "1.0.0",
                sniff_len: CHECKER_MAGIC.len(),
                sub_formats: vec![SubFormat {
                    name: "chk",
                    long_name: "Checkerboard Pyramid",
                    extensions: "chk",
                    can_read: true,
                    can_write: false,
                    can_read_meta: true,
                    can_write_meta: false,
                    can_write_multipage: false,
                    constraints: FormatConstraints::default(),
                }],
            },
            opens: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            failing_tiles,
        }
    }

    /// A read-only stream whose content binds to this codec.
    pub fn stream() -> Box<dyn Stream> {
        Box::new(rasterhub::MemoryStream::from_vec(b"CHK0data".to_vec()))
    }
}

impl Codec for CheckerCodec {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    fn validate(&self, magic: &[u8], _name: Option<&str>) -> Option<usize> {
        magic.starts_with(CHECKER_MAGIC).then_some(0)
    }

    fn open(
        &self,
        _stream: Box<dyn Stream>,
        _mode: OpenMode,
        _ctx: OpenContext,
    ) -> Result<Box<dyn CodecInstance>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CheckerInstance {
            closes: self.closes.clone(),
            failing_tiles: self.failing_tiles.clone(),
        }))
    }
}

struct CheckerInstance {
    closes: Arc<AtomicUsize>,
    failing_tiles: Vec<(u64, u64)>,
}

impl CodecInstance for CheckerInstance {
    fn info(&mut self, _page: usize) -> Result<ImageInfo> {
        Ok(ImageInfo {
            width: 128,
            height: 128,
            levels: 3,
            level_scales: vec![1.0, 0.5, 0.25],
            tile_width: 32,
            tile_height: 32,
            res_units: ResolutionUnit::Micrometers,
            x_res: 0.25,
            y_res: 0.25,
            ..Default::default()
        })
    }

    fn page_count(&mut self) -> Result<usize> {
        Ok(1)
    }

    fn read_image(&mut self, page: usize) -> Result<PixelBuffer> {
        let mut buf = PixelBuffer::alloc(self.info(page)?);
        buf.plane_mut(0).fill(255);
        Ok(buf)
    }

    fn supports_tiles(&self) -> bool {
        true
    }

    fn read_tile(&mut self, _page: usize, xid: u64, yid: u64, level: usize) -> Result<PixelBuffer> {
        if level == 0 && self.failing_tiles.contains(&(xid, yid)) {
            return Err(Error::decode("synthetic tile failure"));
        }
        let side = 128u64 >> level;
        let tiles = side.div_ceil(32);
        if level > 2 || xid >= tiles || yid >= tiles {
            return Err(Error::decode("tile index out of range"));
        }
        let mut info = self.info(0)?;
        info.width = 32;
        info.height = 32;
        let mut buf = PixelBuffer::alloc(info);
        buf.plane_mut(0).fill(checker_tile_value(level, xid, yid));
        Ok(buf)
    }

    fn supports_metadata(&self) -> bool {
        true
    }

    fn append_metadata(&mut self, _page: usize, map: &mut MetadataMap) -> Result<()> {
        map.set_str(tags::IMAGE_DATE_TIME, "2020-01-02 03:04:05");
        map.set_str(tags::channel_name(0), "Gray");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Multi-Page Codec
// =============================================================================

pub const MULTIPAGE_MAGIC: &[u8] = b"MPG0";

/// Two-page 32x16 grayscale codec. Page `p` is filled with `p + 1` and
/// tags itself with `source_page`; metadata appends are counted so tests
/// can observe the per-page memo.
pub struct MultiPageCodec {
    descriptor: CapabilityDescriptor,
    pub metadata_appends: Arc<AtomicUsize>,
}

impl MultiPageCodec {
    pub fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor {
                name: "Multi-page codec",
                version: "1.0.0",
                sniff_len: MULTIPAGE_MAGIC.len(),
                sub_formats: vec![SubFormat {
                    name: "mpg",
                    long_name: "Multi-page Test Format",
                    extensions: "mpg",
                    can_read: true,
                    can_write: false,
                    can_read_meta: true,
                    can_write_meta: false,
                    can_write_multipage: false,
                    constraints: FormatConstraints::default(),
                }],
            },
            metadata_appends: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn stream() -> Box<dyn Stream> {
        Box::new(rasterhub::MemoryStream::from_vec(b"MPG0data".to_vec()))
    }
}

impl Codec for MultiPageCodec {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    fn validate(&self, magic: &[u8], _name: Option<&str>) -> Option<usize> {
        magic.starts_with(MULTIPAGE_MAGIC).then_some(0)
    }

    fn open(
        &self,
        _stream: Box<dyn Stream>,
        _mode: OpenMode,
        _ctx: OpenContext,
    ) -> Result<Box<dyn CodecInstance>> {
        Ok(Box::new(MultiPageInstance {
            metadata_appends: self.metadata_appends.clone(),
        }))
    }
}

struct MultiPageInstance {
    metadata_appends: Arc<AtomicUsize>,
}

impl CodecInstance for MultiPageInstance {
    fn info(&mut self, page: usize) -> Result<ImageInfo> {
        if page > 1 {
            return Err(Error::decode("page out of range"));
        }
        Ok(ImageInfo {
            width: 32,
            height: 16,
            pages: 2,
            ..Default::default()
        })
    }

    fn page_count(&mut self) -> Result<usize> {
        Ok(2)
    }

    fn read_image(&mut self, page: usize) -> Result<PixelBuffer> {
        let mut buf = PixelBuffer::alloc(self.info(page)?);
        buf.plane_mut(0).fill(page as u8 + 1);
        Ok(buf)
    }

    fn supports_metadata(&self) -> bool {
        true
    }

    fn append_metadata(&mut self, page: usize, map: &mut MetadataMap) -> Result<()> {
        self.metadata_appends.fetch_add(1, Ordering::SeqCst);
        map.set_int("source_page", page as i64);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Encoded File Helpers
// =============================================================================

/// A real PNG: RGB gradient where red = x and green = y.
pub fn png_gradient(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([x as u8, y as u8, 0])
    });
    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
        .unwrap();
    encoded
}

/// A real JPEG: uniform grayscale field.
pub fn jpeg_gray(width: u32, height: u32, fill: u8) -> Vec<u8> {
    let img = image::GrayImage::from_pixel(width, height, image::Luma([fill]));
    let mut encoded = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Jpeg)
        .unwrap();
    encoded
}
