//! Planar pixel buffer passed across the codec boundary.

use crate::codec::info::ImageInfo;
use crate::error::{Error, Result};

// =============================================================================
// PixelBuffer
// =============================================================================

/// Decoded pixels for one page, stored plane by plane.
///
/// Each sample occupies its own contiguous plane; rows are byte-aligned and
/// stored top to bottom. The buffer carries the [`ImageInfo`] it was
/// allocated for, so metadata derived from a read (dimensions, depth, tile
/// geometry) travels with the pixels.
#[derive(Debug, Clone, Default)]
pub struct PixelBuffer {
    info: ImageInfo,
    planes: Vec<Vec<u8>>,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer for the given geometry.
    pub fn alloc(info: ImageInfo) -> Self {
        let plane_bytes = info.plane_bytes();
        let planes = (0..info.samples)
            .map(|_| vec![0u8; plane_bytes])
            .collect();
        Self { info, planes }
    }

    /// Wrap pre-decoded planes. Each plane must be exactly
    /// `info.plane_bytes()` long.
    pub fn from_planes(info: ImageInfo, planes: Vec<Vec<u8>>) -> Result<Self> {
        if planes.len() != info.samples as usize {
            return Err(Error::decode(format!(
                "expected {} planes, got {}",
                info.samples,
                planes.len()
            )));
        }
        let expected = info.plane_bytes();
        for (i, plane) in planes.iter().enumerate() {
            if plane.len() != expected {
                return Err(Error::decode(format!(
                    "plane {} is {} bytes, expected {}",
                    i,
                    plane.len(),
                    expected
                )));
            }
        }
        Ok(Self { info, planes })
    }

    /// Geometry and layout of the held pixels.
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Number of sample planes.
    pub fn samples(&self) -> usize {
        self.planes.len()
    }

    /// Whether the buffer holds any pixels.
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty() || self.info.width == 0 || self.info.height == 0
    }

    /// One sample plane.
    pub fn plane(&self, sample: usize) -> &[u8] {
        &self.planes[sample]
    }

    /// One sample plane, mutable.
    pub fn plane_mut(&mut self, sample: usize) -> &mut [u8] {
        &mut self.planes[sample]
    }

    /// Bytes per row in each plane.
    pub fn row_bytes(&self) -> usize {
        ((self.info.width * self.info.depth as u64).div_ceil(8)) as usize
    }

    fn bytes_per_pixel(&self) -> Result<usize> {
        if self.info.depth % 8 != 0 {
            return Err(Error::Unsupported {
                operation: "sub-byte pixel addressing",
            });
        }
        Ok((self.info.depth / 8) as usize)
    }

    /// Paste `src` into this buffer with its top-left corner at `(x, y)`,
    /// clipping whatever falls outside.
    ///
    /// Sample count and depth must match; depth must be whole-byte. Used by
    /// the region composer to stitch native tiles onto a scratch canvas.
    pub fn paste(&mut self, x: u64, y: u64, src: &PixelBuffer) -> Result<()> {
        if src.info.samples != self.info.samples || src.info.depth != self.info.depth {
            return Err(Error::decode(format!(
                "paste layout mismatch: {}x{}bit into {}x{}bit",
                src.info.samples, src.info.depth, self.info.samples, self.info.depth
            )));
        }
        let px = self.bytes_per_pixel()?;
        if x >= self.info.width || y >= self.info.height {
            return Ok(()); // fully outside
        }

        let copy_w = src.info.width.min(self.info.width - x) as usize;
        let copy_h = src.info.height.min(self.info.height - y) as usize;
        let dst_row = self.row_bytes();
        let src_row = src.row_bytes();

        for s in 0..self.planes.len() {
            for r in 0..copy_h {
                let dst_off = (y as usize + r) * dst_row + x as usize * px;
                let src_off = r * src_row;
                let n = copy_w * px;
                self.planes[s][dst_off..dst_off + n]
                    .copy_from_slice(&src.planes[s][src_off..src_off + n]);
            }
        }
        Ok(())
    }

    /// Extract the `(x, y, w, h)` sub-rectangle into a new buffer.
    ///
    /// The rectangle must lie inside the buffer; callers clamp first.
    pub fn crop(&self, x: u64, y: u64, w: u64, h: u64) -> Result<PixelBuffer> {
        if x + w > self.info.width || y + h > self.info.height {
            return Err(Error::decode(format!(
                "crop {}x{}+{}+{} outside {}x{} buffer",
                w, h, x, y, self.info.width, self.info.height
            )));
        }
        let px = self.bytes_per_pixel()?;
        let src_row = self.row_bytes();

        let mut out_info = self.info.clone();
        out_info.width = w;
        out_info.height = h;
        let mut out = PixelBuffer::alloc(out_info);
        let dst_row = out.row_bytes();

        for s in 0..self.planes.len() {
            for r in 0..h as usize {
                let src_off = (y as usize + r) * src_row + x as usize * px;
                let dst_off = r * dst_row;
                let n = w as usize * px;
                out.planes[s][dst_off..dst_off + n]
                    .copy_from_slice(&self.planes[s][src_off..src_off + n]);
            }
        }
        Ok(out)
    }
}

// =============================================================================
// Tests
// =============================================================================
