//! Canonical metadata tag names.
//!
//! Keys are lowercase, underscore-separated, and namespaced by family.
//! Indexed families (`channel_N_name`, `channel_color_N`) are produced by the
//! helper functions at the bottom.

// -----------------------------------------------------------------------------
// Image identity
// -----------------------------------------------------------------------------

pub const IMAGE_FORMAT: &str = "format";
pub const IMAGE_DATE_TIME: &str = "date_time";

// -----------------------------------------------------------------------------
// Geometry
// -----------------------------------------------------------------------------

/// Number of pixels in X.
pub const IMAGE_NUM_X: &str = "image_num_x";
/// Number of pixels in Y.
pub const IMAGE_NUM_Y: &str = "image_num_y";
/// Number of voxels in Z.
pub const IMAGE_NUM_Z: &str = "image_num_z";
/// Number of time points.
pub const IMAGE_NUM_T: &str = "image_num_t";
/// Number of channels.
pub const IMAGE_NUM_C: &str = "image_num_c";
/// Total number of pages (combines T, Z and possibly C).
pub const IMAGE_NUM_P: &str = "image_num_p";

// -----------------------------------------------------------------------------
// Pyramid and tiles
// -----------------------------------------------------------------------------

pub const IMAGE_NUM_RES_L: &str = "image_num_resolution_levels";
/// Comma-joined per-level scale factors, e.g. "1.0,0.5,0.25".
pub const IMAGE_RES_L_SCALES: &str = "image_resolution_level_scales";
pub const TILE_NUM_X: &str = "tile_num_x";
pub const TILE_NUM_Y: &str = "tile_num_y";
/// "flat" when tile size shrinks per level, "constant" otherwise.
pub const TILE_LAYOUT: &str = "tile_layout";
pub const TILE_LAYOUT_FLAT: &str = "flat";
pub const TILE_LAYOUT_CONSTANT: &str = "constant";

// -----------------------------------------------------------------------------
// Pixels
// -----------------------------------------------------------------------------

/// Bit depth of one sample.
pub const PIXEL_DEPTH: &str = "image_pixel_depth";
/// Sample storage format: unsigned, signed, float.
pub const PIXEL_FORMAT: &str = "image_pixel_format";
/// RGB, grayscale, multichannel...
pub const IMAGE_MODE: &str = "image_mode";
/// Source byte order: "little" or "big".
pub const RAW_ENDIAN: &str = "raw_endian";
/// Dimension-order string: "XYCZT", "XYC", ...
pub const IMAGE_DIMENSIONS: &str = "image_dimensions";

// -----------------------------------------------------------------------------
// Physical resolution (normalized to micrometers by the metadata layer)
// -----------------------------------------------------------------------------

pub const PIXEL_RESOLUTION_X: &str = "pixel_resolution_x";
pub const PIXEL_RESOLUTION_Y: &str = "pixel_resolution_y";
pub const PIXEL_RESOLUTION_Z: &str = "pixel_resolution_z";
pub const PIXEL_RESOLUTION_T: &str = "pixel_resolution_t";

pub const PIXEL_RESOLUTION_UNIT_X: &str = "pixel_resolution_unit_x";
pub const PIXEL_RESOLUTION_UNIT_Y: &str = "pixel_resolution_unit_y";
pub const PIXEL_RESOLUTION_UNIT_Z: &str = "pixel_resolution_unit_z";
pub const PIXEL_RESOLUTION_UNIT_T: &str = "pixel_resolution_unit_t";

pub const PIXEL_RESOLUTION_UNIT_MICRONS: &str = "microns";
pub const PIXEL_RESOLUTION_UNIT_SECONDS: &str = "seconds";

// -----------------------------------------------------------------------------
// Channels and display mapping
// -----------------------------------------------------------------------------

pub const DISPLAY_CHANNEL_RED: &str = "display_channel_red";
pub const DISPLAY_CHANNEL_GREEN: &str = "display_channel_green";
pub const DISPLAY_CHANNEL_BLUE: &str = "display_channel_blue";
pub const DISPLAY_CHANNEL_YELLOW: &str = "display_channel_yellow";
pub const DISPLAY_CHANNEL_MAGENTA: &str = "display_channel_magenta";
pub const DISPLAY_CHANNEL_CYAN: &str = "display_channel_cyan";
pub const DISPLAY_CHANNEL_GRAY: &str = "display_channel_gray";

/// Display channel tags in LUT index order.
pub const DISPLAY_CHANNEL_TAGS: [&str; 7] = [
    DISPLAY_CHANNEL_RED,
    DISPLAY_CHANNEL_GREEN,
    DISPLAY_CHANNEL_BLUE,
    DISPLAY_CHANNEL_YELLOW,
    DISPLAY_CHANNEL_MAGENTA,
    DISPLAY_CHANNEL_CYAN,
    DISPLAY_CHANNEL_GRAY,
];

/// Name tag for channel `i`: `channel_<i>_name`.
pub fn channel_name(i: usize) -> String {
    format!("channel_{i}_name")
}

/// Display color tag for channel `i`: `channel_color_<i>`.
pub fn channel_color(i: usize) -> String {
    format!("channel_color_{i}")
}
