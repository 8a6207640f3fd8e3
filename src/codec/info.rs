//! Per-page image description shared across the codec boundary.

// =============================================================================
// Enums
// =============================================================================

/// Storage format of one sample, alongside its bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    Unsigned,
    Signed,
    Float,
}

impl DataFormat {
    /// Canonical metadata string for this format.
    pub const fn name(&self) -> &'static str {
        match self {
            DataFormat::Unsigned => "unsigned integer",
            DataFormat::Signed => "signed integer",
            DataFormat::Float => "floating point",
        }
    }
}

/// Interpretation of the samples in one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageMode {
    Bitmap,
    #[default]
    Grayscale,
    Indexed,
    Rgb,
    Rgba,
    /// Many separate grayscale channels with no fixed color meaning.
    MultiChannel,
}

impl ImageMode {
    /// Canonical metadata string for this mode.
    pub const fn name(&self) -> &'static str {
        match self {
            ImageMode::Bitmap => "monochrome",
            ImageMode::Grayscale => "grayscale",
            ImageMode::Indexed => "indexed",
            ImageMode::Rgb => "RGB",
            ImageMode::Rgba => "RGBA",
            ImageMode::MultiChannel => "multichannel",
        }
    }
}

/// Physical unit of the codec-reported pixel resolution.
///
/// The metadata normalization layer converts all of these to micrometers;
/// units without a defined conversion normalize to "unknown" (pixel size 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionUnit {
    #[default]
    None,
    Micrometers,
    Nanometers,
    Millimeters,
    Inches,
}

/// One axis in the dimension-order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    X,
    Y,
    C,
    Z,
    T,
}

impl Dim {
    /// Single-letter name used in the dimension-order string.
    pub const fn letter(&self) -> char {
        match self {
            Dim::X => 'X',
            Dim::Y => 'Y',
            Dim::C => 'C',
            Dim::Z => 'Z',
            Dim::T => 'T',
        }
    }
}

// =============================================================================
// ImageInfo
// =============================================================================

/// Snapshot of one page's geometry and pixel layout.
///
/// Populated by the codec on open and on `info(page)` queries; pages within
/// one file may differ. The metadata normalization layer derives its
/// standard tags from this snapshot, so a codec only needs to fill in what
/// it knows and leave the rest at defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub width: u64,
    pub height: u64,

    /// Number of pages/frames in the file.
    pub pages: u64,

    /// Number of levels in the resolution pyramid (1 = no pyramid).
    pub levels: u64,

    /// Per-level scale factors relative to level 0 (e.g. [1.0, 0.5, 0.25]).
    /// Empty when the codec reports no pyramid.
    pub level_scales: Vec<f64>,

    /// Interpretative dimension counts; not needed for decoding.
    pub number_z: u64,
    pub number_t: u64,

    /// Samples per pixel.
    pub samples: u32,

    /// Bits per sample.
    pub depth: u32,

    pub pixel_format: DataFormat,
    pub mode: ImageMode,

    /// Codec-reported physical resolution, pixels-per-unit semantics left to
    /// the codec; the normalization layer interprets `x_res` as the pixel
    /// size in `res_units`.
    pub res_units: ResolutionUnit,
    pub x_res: f64,
    pub y_res: f64,

    /// Native tile geometry. Zero when the format is not tiled.
    pub tile_width: u64,
    pub tile_height: u64,

    /// True when tile size shrinks with each pyramid level ("flat" layout);
    /// false when the tile size is constant and only the tile count shrinks.
    pub flat_tile_layout: bool,

    /// Dimension order; XYC minimum, pages then interpreted as Z, T or ZT.
    pub dimensions: Vec<Dim>,

    /// True when samples are stored big-endian in the source.
    pub big_endian: bool,
}

impl Default for ImageInfo {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            pages: 1,
            levels: 1,
            level_scales: Vec::new(),
            number_z: 1,
            number_t: 1,
            samples: 1,
            depth: 8,
            pixel_format: DataFormat::Unsigned,
            mode: ImageMode::Grayscale,
            res_units: ResolutionUnit::None,
            x_res: 0.0,
            y_res: 0.0,
            tile_width: 0,
            tile_height: 0,
            flat_tile_layout: false,
            dimensions: vec![Dim::X, Dim::Y, Dim::C],
            big_endian: false,
        }
    }
}

impl ImageInfo {
    /// Bytes needed for one plane (one sample across the whole page),
    /// byte-aligned per row.
    pub fn plane_bytes(&self) -> usize {
        let row_bytes = (self.width * self.depth as u64).div_ceil(8);
        (row_bytes * self.height) as usize
    }

    /// Dimension-order string, e.g. "XYCZT".
    pub fn dimension_string(&self) -> String {
        self.dimensions.iter().map(|d| d.letter()).collect()
    }

    /// Whether the page carries a native tile grid.
    pub fn is_tiled(&self) -> bool {
        self.tile_width > 0 && self.tile_height > 0
    }
}

// =============================================================================
// Tests
// =============================================================================
