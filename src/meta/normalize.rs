//! Metadata normalization over a live session.
//!
//! [`MetaSession`] wraps a [`Session`] and produces one canonical
//! [`MetadataMap`] per page. Parsing is codec-first: the bound codec appends
//! its native tags before any generic tag is derived, and derived tags are
//! only appended when absent, so a codec-supplied value always wins. The
//! parsed map is memoized for the most recently parsed page.
//!
//! Physical pixel resolution is normalized to micrometers (time to seconds);
//! units with no defined conversion normalize to unknown, reported as pixel
//! size 0.

use tracing::debug;

use crate::codec::{ImageInfo, ImageMode, PixelBuffer, ResolutionUnit};
use crate::error::Result;
use crate::io::Stream;
use crate::meta::map::MetadataMap;
use crate::meta::tags;
use crate::session::Session;

/// Display LUT entry meaning "no channel assigned to this display color".
pub const UNASSIGNED_DISPLAY: i32 = -1;

// =============================================================================
// Display colors
// =============================================================================

/// One display color as 8-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl DisplayColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl std::fmt::Display for DisplayColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// Default per-channel display palette, cycled when a file carries more
/// channels than colors.
pub fn default_channel_colors() -> [DisplayColor; 8] {
    [
        DisplayColor::new(255, 0, 0),
        DisplayColor::new(0, 255, 0),
        DisplayColor::new(0, 0, 255),
        DisplayColor::new(255, 255, 255),
        DisplayColor::new(255, 0, 255),
        DisplayColor::new(0, 255, 255),
        DisplayColor::new(255, 255, 0),
        DisplayColor::new(255, 128, 0),
    ]
}

// =============================================================================
// MetaSession
// =============================================================================

/// Session wrapper producing canonical, normalized metadata per page.
pub struct MetaSession {
    session: Session,
    parsed_page: Option<usize>,
    metadata: MetadataMap,
    /// Normalized pixel size: x, y, z in micrometers, t in seconds.
    /// Zero means unknown.
    pixel_size: [f64; 4],
    channel_names: Vec<String>,
    /// Maps display color slot (red, green, blue, yellow, magenta, cyan,
    /// gray) to a channel index, or [`UNASSIGNED_DISPLAY`].
    display_lut: Vec<i32>,
    imaging_time: String,
}

impl MetaSession {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            parsed_page: None,
            metadata: MetadataMap::new(),
            pixel_size: [0.0; 4],
            channel_names: Vec::new(),
            display_lut: vec![UNASSIGNED_DISPLAY; tags::DISPLAY_CHANNEL_TAGS.len()],
            imaging_time: String::new(),
        }
    }

    /// Wrapper over a session with the built-in codecs installed.
    pub fn with_default_codecs() -> Self {
        Self::new(Session::with_default_codecs())
    }

    /// The wrapped session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The wrapped session, mutable. Side-stepping the wrapper does not
    /// invalidate the memo; pass session restarts through this type instead.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    // =========================================================================
    // Session pass-throughs (memo-invalidating)
    // =========================================================================

    /// See [`Session::open_file`].
    pub fn open_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.invalidate();
        self.session.open_file(path)
    }

    /// See [`Session::start_read`].
    pub fn start_read(&mut self, stream: Box<dyn Stream>, file_name: Option<&str>) -> Result<()> {
        self.invalidate();
        self.session.start_read(stream, file_name)
    }

    /// See [`Session::start_read_as`].
    pub fn start_read_as(
        &mut self,
        stream: Box<dyn Stream>,
        format_name: &str,
        options: Option<String>,
    ) -> Result<()> {
        self.invalidate();
        self.session.start_read_as(stream, format_name, options)
    }

    /// See [`Session::end`].
    pub fn end(&mut self) {
        self.invalidate();
        self.session.end();
    }

    /// See [`Session::read_image`]. The quick-access fields (pixel size,
    /// channel names, display LUT, imaging time) follow the page being
    /// read, so they describe the returned image.
    pub fn read_image(&mut self, page: usize) -> Result<PixelBuffer> {
        if self.parsed_page != Some(page) {
            self.parse_page(page)?;
        }
        self.session.read_image(page)
    }

    /// See [`Session::page_count`].
    pub fn page_count(&mut self) -> Result<usize> {
        self.session.page_count()
    }

    /// See [`Session::info`].
    pub fn info(&self) -> &ImageInfo {
        self.session.info()
    }

    fn invalidate(&mut self) {
        self.parsed_page = None;
        self.metadata.clear();
        self.pixel_size = [0.0; 4];
        self.channel_names.clear();
        self.display_lut = vec![UNASSIGNED_DISPLAY; tags::DISPLAY_CHANNEL_TAGS.len()];
        self.imaging_time.clear();
    }

    // =========================================================================
    // Parsed accessors
    // =========================================================================

    /// Canonical metadata for `page`, parsed on first request and memoized.
    ///
    /// The memo holds one page; asking for a different page reparses.
    pub fn metadata(&mut self, page: usize) -> Result<&MetadataMap> {
        if self.parsed_page != Some(page) {
            self.parse_page(page)?;
        }
        Ok(&self.metadata)
    }

    /// Normalized pixel size `[x, y, z, t]`; x, y, z in micrometers, t in
    /// seconds, 0 when unknown. Parses page 0 when nothing is parsed yet.
    pub fn pixel_size(&mut self) -> Result<[f64; 4]> {
        self.ensure_parsed()?;
        Ok(self.pixel_size)
    }

    pub fn pixel_size_x(&mut self) -> Result<f64> {
        Ok(self.pixel_size()?[0])
    }

    pub fn pixel_size_y(&mut self) -> Result<f64> {
        Ok(self.pixel_size()?[1])
    }

    pub fn pixel_size_z(&mut self) -> Result<f64> {
        Ok(self.pixel_size()?[2])
    }

    /// Time step between frames in seconds, 0 when unknown.
    pub fn pixel_size_t(&mut self) -> Result<f64> {
        Ok(self.pixel_size()?[3])
    }

    /// Acquisition timestamp as reported by the codec, empty when unknown.
    pub fn imaging_time(&mut self) -> Result<&str> {
        self.ensure_parsed()?;
        Ok(&self.imaging_time)
    }

    /// Channel names, one per sample.
    pub fn channel_names(&mut self) -> Result<&[String]> {
        self.ensure_parsed()?;
        Ok(&self.channel_names)
    }

    /// Display LUT: channel index per display color slot, in
    /// [`tags::DISPLAY_CHANNEL_TAGS`] order, [`UNASSIGNED_DISPLAY`] when
    /// nothing maps there.
    pub fn display_lut(&mut self) -> Result<&[i32]> {
        self.ensure_parsed()?;
        Ok(&self.display_lut)
    }

    fn ensure_parsed(&mut self) -> Result<()> {
        if self.parsed_page.is_none() {
            self.parse_page(0)?;
        }
        Ok(())
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    fn parse_page(&mut self, page: usize) -> Result<()> {
        let info = self.session.page_info(page)?;

        // Codec first; everything derived below is append-if-absent.
        let mut map = MetadataMap::new();
        self.session.append_metadata(page, &mut map)?;
        debug!(page, codec_tags = map.len(), "parsing page metadata");

        self.fill_statics(&info, &map);
        self.append_geometry(&info, &mut map);
        self.append_pixels(&info, &mut map);
        self.append_pyramid(&info, &mut map);
        self.append_resolution(&mut map);
        self.append_channels(&info, &mut map);

        if let Some(name) = self.session.format_name() {
            map.append_str(tags::IMAGE_FORMAT, name);
        }

        self.metadata = map;
        self.parsed_page = Some(page);
        Ok(())
    }

    /// Resolve the typed convenience fields from codec tags, falling back to
    /// the info snapshot.
    fn fill_statics(&mut self, info: &ImageInfo, map: &MetadataMap) {
        // Resolution: codec tags win over the info snapshot; both normalize
        // to micrometers.
        let (from_info_x, from_info_y) = normalize_info_resolution(info);
        self.pixel_size[0] = tag_resolution(map, tags::PIXEL_RESOLUTION_X, tags::PIXEL_RESOLUTION_UNIT_X)
            .unwrap_or(from_info_x);
        self.pixel_size[1] = tag_resolution(map, tags::PIXEL_RESOLUTION_Y, tags::PIXEL_RESOLUTION_UNIT_Y)
            .unwrap_or(from_info_y);
        self.pixel_size[2] = tag_resolution(map, tags::PIXEL_RESOLUTION_Z, tags::PIXEL_RESOLUTION_UNIT_Z)
            .unwrap_or(0.0);
        // Time resolution is normalized to seconds; anything but seconds is
        // unknown.
        self.pixel_size[3] = match map.get(tags::PIXEL_RESOLUTION_UNIT_T) {
            Some(unit) if unit.as_string() == tags::PIXEL_RESOLUTION_UNIT_SECONDS => {
                map.get_float(tags::PIXEL_RESOLUTION_T, 0.0)
            }
            _ => 0.0,
        };

        self.imaging_time = map.get_str(tags::IMAGE_DATE_TIME, "");

        let samples = info.samples as usize;
        self.channel_names = (0..samples)
            .map(|i| {
                let tag = tags::channel_name(i);
                if map.contains(&tag) {
                    map.get_str(&tag, "")
                } else {
                    default_channel_name(info.mode, i)
                }
            })
            .collect();

        // Display mapping: codec tags win; otherwise one gray channel lights
        // red, green and blue, and multi-channel images map identically up
        // to the number of display slots.
        let slots = tags::DISPLAY_CHANNEL_TAGS.len();
        self.display_lut = vec![UNASSIGNED_DISPLAY; slots];
        if samples == 1 {
            self.display_lut[0] = 0;
            self.display_lut[1] = 0;
            self.display_lut[2] = 0;
        } else {
            for slot in 0..samples.min(slots) {
                self.display_lut[slot] = slot as i32;
            }
        }
        for (slot, tag) in tags::DISPLAY_CHANNEL_TAGS.iter().enumerate() {
            if map.contains(tag) {
                self.display_lut[slot] = map.get_int(tag, UNASSIGNED_DISPLAY as i64) as i32;
            }
        }
    }

    fn append_geometry(&self, info: &ImageInfo, map: &mut MetadataMap) {
        map.append_int(tags::IMAGE_NUM_X, info.width as i64);
        map.append_int(tags::IMAGE_NUM_Y, info.height as i64);
        map.append_int(tags::IMAGE_NUM_Z, info.number_z as i64);
        map.append_int(tags::IMAGE_NUM_T, info.number_t as i64);
        map.append_int(tags::IMAGE_NUM_C, info.samples as i64);
        map.append_int(tags::IMAGE_NUM_P, info.pages as i64);
        map.append_str(tags::IMAGE_DIMENSIONS, info.dimension_string());
    }

    fn append_pixels(&self, info: &ImageInfo, map: &mut MetadataMap) {
        map.append_int(tags::PIXEL_DEPTH, info.depth as i64);
        map.append_str(tags::PIXEL_FORMAT, info.pixel_format.name());
        map.append_str(tags::IMAGE_MODE, info.mode.name());
        map.append_str(
            tags::RAW_ENDIAN,
            if info.big_endian { "big" } else { "little" },
        );
    }

    fn append_pyramid(&self, info: &ImageInfo, map: &mut MetadataMap) {
        map.append_int(tags::IMAGE_NUM_RES_L, info.levels as i64);
        if info.levels > 1 {
            let scales: Vec<String> = if info.level_scales.is_empty() {
                // No codec-reported scales; assume the conventional halving.
                (0..info.levels).map(|l| (0.5f64.powi(l as i32)).to_string()).collect()
            } else {
                info.level_scales.iter().map(|s| s.to_string()).collect()
            };
            map.append_str(tags::IMAGE_RES_L_SCALES, scales.join(","));
        }
        if info.is_tiled() {
            map.append_int(tags::TILE_NUM_X, info.tile_width as i64);
            map.append_int(tags::TILE_NUM_Y, info.tile_height as i64);
            map.append_str(
                tags::TILE_LAYOUT,
                if info.flat_tile_layout {
                    tags::TILE_LAYOUT_FLAT
                } else {
                    tags::TILE_LAYOUT_CONSTANT
                },
            );
        }
    }

    /// Publish the normalized resolution back into the map, units included.
    fn append_resolution(&self, map: &mut MetadataMap) {
        let axes = [
            (0, tags::PIXEL_RESOLUTION_X, tags::PIXEL_RESOLUTION_UNIT_X),
            (1, tags::PIXEL_RESOLUTION_Y, tags::PIXEL_RESOLUTION_UNIT_Y),
            (2, tags::PIXEL_RESOLUTION_Z, tags::PIXEL_RESOLUTION_UNIT_Z),
        ];
        for (axis, value_tag, unit_tag) in axes {
            if self.pixel_size[axis] > 0.0 {
                map.set_float(value_tag, self.pixel_size[axis]);
                map.set_str(unit_tag, tags::PIXEL_RESOLUTION_UNIT_MICRONS);
            }
        }
        if self.pixel_size[3] > 0.0 {
            map.set_float(tags::PIXEL_RESOLUTION_T, self.pixel_size[3]);
            map.set_str(tags::PIXEL_RESOLUTION_UNIT_T, tags::PIXEL_RESOLUTION_UNIT_SECONDS);
        }
    }

    fn append_channels(&self, info: &ImageInfo, map: &mut MetadataMap) {
        let palette = default_channel_colors();
        for (i, name) in self.channel_names.iter().enumerate() {
            map.append_str(tags::channel_name(i), name.clone());
            let color = if info.samples == 1 {
                DisplayColor::new(255, 255, 255)
            } else {
                palette[i % palette.len()]
            };
            map.append_str(tags::channel_color(i), color.to_string());
        }
        for (slot, tag) in tags::DISPLAY_CHANNEL_TAGS.iter().enumerate() {
            map.append_int(*tag, self.display_lut[slot] as i64);
        }
    }
}

impl std::fmt::Debug for MetaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaSession")
            .field("session", &self.session)
            .field("parsed_page", &self.parsed_page)
            .field("tags", &self.metadata.len())
            .finish()
    }
}

// =============================================================================
// Unit conversion
// =============================================================================

/// Pixel size in micrometers from the codec's info snapshot, 0 when the
/// reported unit has no defined conversion.
fn normalize_info_resolution(info: &ImageInfo) -> (f64, f64) {
    let factor = match info.res_units {
        ResolutionUnit::Micrometers => 1.0,
        ResolutionUnit::Nanometers => 1.0 / 1000.0,
        ResolutionUnit::Millimeters => 1000.0,
        ResolutionUnit::None | ResolutionUnit::Inches => return (0.0, 0.0),
    };
    (info.x_res * factor, info.y_res * factor)
}

/// Resolution from a codec-written tag pair, normalized to micrometers.
/// `None` when the tag is absent or its unit has no defined conversion.
fn tag_resolution(map: &MetadataMap, value_tag: &str, unit_tag: &str) -> Option<f64> {
    if !map.contains(value_tag) {
        return None;
    }
    let value = map.get_float(value_tag, 0.0);
    let unit = map.get_str(unit_tag, tags::PIXEL_RESOLUTION_UNIT_MICRONS);
    let factor = match unit.as_str() {
        "microns" | "um" | "micrometers" => 1.0,
        "nm" | "nanometers" => 1.0 / 1000.0,
        "mm" | "millimeters" => 1000.0,
        _ => return Some(0.0),
    };
    Some(value * factor)
}

fn default_channel_name(mode: ImageMode, index: usize) -> String {
    match (mode, index) {
        (ImageMode::Rgb | ImageMode::Rgba, 0) => "Red".to_string(),
        (ImageMode::Rgb | ImageMode::Rgba, 1) => "Green".to_string(),
        (ImageMode::Rgb | ImageMode::Rgba, 2) => "Blue".to_string(),
        (ImageMode::Rgba, 3) => "Alpha".to_string(),
        _ => format!("Channel {}", index + 1),
    }
}

// =============================================================================
// Tests
// =============================================================================
