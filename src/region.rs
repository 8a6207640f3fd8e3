//! Region composition over tiled, pyramidal sources.
//!
//! [`RegionReader`] serves arbitrary rectangles at arbitrary pyramid levels
//! regardless of how the bound codec stores pixels. Tiled codecs are read
//! tile by tile onto a scratch canvas and cropped; codecs that serve whole
//! levels are cropped directly; plain codecs fall back to a full-page decode.
//!
//! Requested levels are downsample exponents: level `L` means scale `2^-L`.
//! The exponent is matched against the codec-reported per-level scales within
//! a fixed tolerance, and a request that matches no stored level fails hard
//! rather than resampling.

use tracing::{debug, warn};

use crate::codec::{ImageInfo, PixelBuffer};
use crate::error::{Error, Result};
use crate::meta::MetaSession;

/// Maximum distance between `2^-level` and a stored scale for the level to
/// be considered a match.
const LEVEL_SCALE_TOLERANCE: f64 = 0.01;

// =============================================================================
// Level geometry
// =============================================================================

/// Resolved geometry of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LevelGeometry {
    /// Codec-native level index.
    native_level: usize,
    /// Scale relative to level 0.
    scale: f64,
    /// Level dimensions in pixels.
    width: u64,
    height: u64,
    /// Native tile size at this level; 0 when the source is not tiled.
    tile_width: u64,
    tile_height: u64,
}

fn resolve_level(info: &ImageInfo, level: usize) -> Result<LevelGeometry> {
    let scales: Vec<f64> = if info.level_scales.is_empty() {
        (0..info.levels).map(|l| 0.5f64.powi(l as i32)).collect()
    } else {
        info.level_scales.clone()
    };

    let target = 0.5f64.powi(level as i32);
    let native_level = scales
        .iter()
        .position(|s| (s - target).abs() < LEVEL_SCALE_TOLERANCE)
        .ok_or_else(|| {
            Error::not_found(format!(
                "no pyramid level with scale {target} (stored scales: {scales:?})"
            ))
        })?;
    let scale = scales[native_level];

    let (tile_width, tile_height) = if info.is_tiled() {
        if info.flat_tile_layout {
            // Tile size shrinks with the level in flat layouts.
            (
                ((info.tile_width as f64 * scale).round() as u64).max(1),
                ((info.tile_height as f64 * scale).round() as u64).max(1),
            )
        } else {
            (info.tile_width, info.tile_height)
        }
    } else {
        (0, 0)
    };

    Ok(LevelGeometry {
        native_level,
        scale,
        width: ((info.width as f64 * scale).ceil() as u64).max(1),
        height: ((info.height as f64 * scale).ceil() as u64).max(1),
        tile_width,
        tile_height,
    })
}

// =============================================================================
// RegionReader
// =============================================================================

/// Rectangle-oriented reader over a metadata-aware session.
pub struct RegionReader {
    meta: MetaSession,
}

impl RegionReader {
    pub fn new(meta: MetaSession) -> Self {
        Self { meta }
    }

    /// Reader over the built-in codecs with `path` opened for reading.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let mut meta = MetaSession::with_default_codecs();
        meta.open_file(path)?;
        Ok(Self { meta })
    }

    /// The wrapped metadata session.
    pub fn meta(&mut self) -> &mut MetaSession {
        &mut self.meta
    }

    pub fn into_inner(self) -> MetaSession {
        self.meta
    }

    /// Number of pyramid levels the source reports.
    pub fn level_count(&mut self, page: usize) -> Result<u64> {
        Ok(self.meta.session_mut().page_info(page)?.levels)
    }

    /// Dimensions of `page` at downsample level `level`.
    pub fn level_dimensions(&mut self, page: usize, level: usize) -> Result<(u64, u64)> {
        let info = self.meta.session_mut().page_info(page)?;
        let geo = resolve_level(&info, level)?;
        Ok((geo.width, geo.height))
    }

    /// Decode the full page at level 0.
    pub fn read(&mut self, page: usize) -> Result<PixelBuffer> {
        self.meta.read_image(page)
    }

    /// Decode the full page at downsample level `level`.
    pub fn read_level(&mut self, page: usize, level: usize) -> Result<PixelBuffer> {
        let info = self.meta.session_mut().page_info(page)?;
        let geo = resolve_level(&info, level)?;

        if self.meta.session_mut().supports_levels() {
            return self.meta.session_mut().read_level(page, geo.native_level);
        }
        if geo.native_level == 0 {
            return self.meta.read_image(page);
        }
        if self.meta.session_mut().supports_tiles() {
            return self.read_region(page, 0, 0, geo.width, geo.height, level);
        }
        Err(Error::Unsupported {
            operation: "read_level",
        })
    }

    /// Read one tile of an arbitrary `tile_size` grid laid over `page` at
    /// `level`. Edge tiles come back smaller than `tile_size`.
    pub fn read_tile(
        &mut self,
        page: usize,
        xid: u64,
        yid: u64,
        tile_size: u64,
        level: usize,
    ) -> Result<PixelBuffer> {
        let info = self.meta.session_mut().page_info(page)?;
        let geo = resolve_level(&info, level)?;
        let x1 = xid * tile_size;
        let y1 = yid * tile_size;
        if x1 >= geo.width || y1 >= geo.height {
            return Err(Error::not_found(format!(
                "tile ({xid}, {yid}) outside the {}x{} level",
                geo.width, geo.height
            )));
        }
        let x2 = (x1 + tile_size).min(geo.width);
        let y2 = (y1 + tile_size).min(geo.height);
        self.read_region(page, x1, y1, x2, y2, level)
    }

    /// Read the half-open rectangle `[x1, x2) x [y1, y2)` of `page` at
    /// downsample level `level`, in level coordinates.
    ///
    /// The rectangle is clamped to the level bounds. Individual native-tile
    /// read failures are tolerated and leave their footprint blank; failure
    /// to resolve the level is a hard error.
    pub fn read_region(
        &mut self,
        page: usize,
        x1: u64,
        y1: u64,
        x2: u64,
        y2: u64,
        level: usize,
    ) -> Result<PixelBuffer> {
        let info = self.meta.session_mut().page_info(page)?;
        let geo = resolve_level(&info, level)?;

        let x1 = x1.min(geo.width);
        let y1 = y1.min(geo.height);
        let x2 = x2.clamp(x1, geo.width);
        let y2 = y2.clamp(y1, geo.height);
        if x1 == x2 || y1 == y2 {
            return Err(Error::not_found("requested region is empty after clamping"));
        }

        if self.meta.session_mut().supports_tiles() && geo.tile_width > 0 && geo.tile_height > 0 {
            return self.compose_from_tiles(page, &info, &geo, x1, y1, x2, y2);
        }

        // Non-tiled fallback: decode the whole level, then crop.
        let full = if geo.native_level == 0 {
            self.meta.read_image(page)?
        } else if self.meta.session_mut().supports_levels() {
            self.meta.session_mut().read_level(page, geo.native_level)?
        } else {
            return Err(Error::Unsupported {
                operation: "read_region at a downsampled level",
            });
        };
        full.crop(x1, y1, x2 - x1, y2 - y1)
    }

    fn compose_from_tiles(
        &mut self,
        page: usize,
        info: &ImageInfo,
        geo: &LevelGeometry,
        x1: u64,
        y1: u64,
        x2: u64,
        y2: u64,
    ) -> Result<PixelBuffer> {
        let (tw, th) = (geo.tile_width, geo.tile_height);

        // Single-tile fast path: the request is exactly one native tile, or
        // the whole level fits inside one tile.
        let aligned_single = x1 % tw == 0
            && y1 % th == 0
            && x2 - x1 == tw.min(geo.width - x1)
            && y2 - y1 == th.min(geo.height - y1)
            && x2 - x1 <= tw
            && y2 - y1 <= th;
        if aligned_single {
            let tile = self
                .meta
                .session_mut()
                .read_tile(page, x1 / tw, y1 / th, geo.native_level)?;
            let (w, h) = (x2 - x1, y2 - y1);
            if tile.info().width == w && tile.info().height == h {
                return Ok(tile);
            }
            if tile.info().width >= w && tile.info().height >= h {
                // Edge tile padded to full size by the codec.
                return tile.crop(0, 0, w, h);
            }
            // Unexpected tile shape; fall through to the canvas path.
        }

        let tx1 = x1 / tw;
        let ty1 = y1 / th;
        let tx2 = x2.div_ceil(tw);
        let ty2 = y2.div_ceil(th);
        debug!(
            page,
            level = geo.native_level,
            tiles_x = tx2 - tx1,
            tiles_y = ty2 - ty1,
            "composing region from native tiles"
        );

        let mut canvas_info = info.clone();
        canvas_info.width = (tx2 - tx1) * tw;
        canvas_info.height = (ty2 - ty1) * th;
        let mut canvas = PixelBuffer::alloc(canvas_info);

        for ty in ty1..ty2 {
            for tx in tx1..tx2 {
                match self
                    .meta
                    .session_mut()
                    .read_tile(page, tx, ty, geo.native_level)
                {
                    Ok(tile) => {
                        canvas.paste((tx - tx1) * tw, (ty - ty1) * th, &tile)?;
                    }
                    Err(err) => {
                        warn!(tx, ty, level = geo.native_level, error = %err,
                            "tile read failed, region left blank");
                    }
                }
            }
        }

        canvas.crop(x1 - tx1 * tw, y1 - ty1 * th, x2 - x1, y2 - y1)
    }
}

impl std::fmt::Debug for RegionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionReader").field("meta", &self.meta).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
