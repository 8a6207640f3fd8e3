//! Command-line configuration.
//!
//! The binary exposes one subcommand per workflow:
//! - `formats` lists the registered codecs and their capabilities
//! - `info` prints the normalized metadata of a file
//! - `convert` re-encodes a file page by page into another format
//! - `region` extracts a rectangle from a pyramid level
//!
//! Options common to file-opening commands can also come from the
//! environment with the `RASTERHUB_` prefix.

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Default Values
// =============================================================================

/// Default quality for lossy encoders (1-100).
pub const DEFAULT_QUALITY: u8 = 95;

/// Default pyramid level for region extraction (full resolution).
pub const DEFAULT_REGION_LEVEL: usize = 0;

// =============================================================================
// CLI Arguments
// =============================================================================

/// rasterhub - one registry, one session, one metadata schema.
///
/// Reads and writes images across incompatible binary formats, with
/// arbitrary-region access over tiled pyramids.
#[derive(Parser, Debug, Clone)]
#[command(name = "rasterhub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List registered formats and their capabilities.
    Formats(FormatsConfig),

    /// Print the normalized metadata of an image file.
    Info(InfoConfig),

    /// Re-encode an image file into another format.
    Convert(ConvertConfig),

    /// Extract a rectangle from a pyramid level into an image file.
    Region(RegionConfig),
}

#[derive(Args, Debug, Clone)]
pub struct FormatsConfig {
    /// Emit machine-readable JSON instead of a table.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Input image file.
    pub input: String,

    /// Page to inspect.
    #[arg(short, long, default_value_t = 0)]
    pub page: usize,

    /// Force the input format instead of detecting by content.
    #[arg(long, env = "RASTERHUB_INPUT_FORMAT")]
    pub input_format: Option<String>,

    /// Codec options for the input (e.g. the raw layout string).
    #[arg(long, env = "RASTERHUB_INPUT_OPTIONS")]
    pub input_options: Option<String>,

    /// Emit machine-readable JSON instead of tag-per-line text.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertConfig {
    /// Input image file.
    pub input: String,

    /// Output image file.
    pub output: String,

    /// Target format short name (see `formats`).
    #[arg(short, long)]
    pub format: String,

    /// Quality for lossy encoders (1-100).
    #[arg(short, long, default_value_t = DEFAULT_QUALITY)]
    pub quality: u8,

    /// Force the input format instead of detecting by content.
    #[arg(long, env = "RASTERHUB_INPUT_FORMAT")]
    pub input_format: Option<String>,

    /// Codec options for the input (e.g. the raw layout string).
    #[arg(long, env = "RASTERHUB_INPUT_OPTIONS")]
    pub input_options: Option<String>,

    /// Codec options for the output encoder.
    #[arg(long)]
    pub output_options: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RegionConfig {
    /// Input image file.
    pub input: String,

    /// Output image file.
    pub output: String,

    /// Target format short name for the output.
    #[arg(short, long, default_value = "png")]
    pub format: String,

    /// Page to read from.
    #[arg(short, long, default_value_t = 0)]
    pub page: usize,

    /// Left edge of the region, in level coordinates.
    #[arg(short, long)]
    pub x: u64,

    /// Top edge of the region, in level coordinates.
    #[arg(short, long)]
    pub y: u64,

    /// Region width in pixels.
    #[arg(short = 'W', long)]
    pub width: u64,

    /// Region height in pixels.
    #[arg(short = 'H', long)]
    pub height: u64,

    /// Pyramid level as a downsample exponent (0 = full resolution).
    #[arg(short, long, default_value_t = DEFAULT_REGION_LEVEL)]
    pub level: usize,

    /// Quality for lossy encoders (1-100).
    #[arg(short, long, default_value_t = DEFAULT_QUALITY)]
    pub quality: u8,
}

impl ConvertConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.format.is_empty() {
            return Err("target format is required. Set --format".to_string());
        }
        if self.quality == 0 || self.quality > 100 {
            return Err("quality must be between 1 and 100".to_string());
        }
        Ok(())
    }
}

impl RegionConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("region width and height must be greater than 0".to_string());
        }
        if self.quality == 0 || self.quality > 100 {
            return Err("quality must be between 1 and 100".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
