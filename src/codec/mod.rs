//! The codec plugin contract.
//!
//! Every format family plugs into the registry through two traits:
//!
//! - [`Codec`] - the registered, stateless side: a static
//!   [`CapabilityDescriptor`], a pure `validate` probe for content sniffing,
//!   and `open`, which binds a [`Stream`] and produces a live instance.
//! - [`CodecInstance`] - the per-open, stateful side: page-indexed image
//!   info, pixel reads and writes, and the optional tile/level/metadata entry
//!   points.
//!
//! Optional entry points follow the probe-plus-default convention: a codec
//! that supports tile reads overrides both `supports_tiles` (to return true)
//! and `read_tile`; the defaults report `false` and fail with
//! [`Error::Unsupported`]. The session controller checks the probe before
//! forwarding, so an unsupported call never reaches the codec.
//!
//! Codec-private state lives inside the `CodecInstance` implementation and is
//! never inspected by the layers above. Lifetime is strictly
//! open -> close -> drop, paired 1:1 with `Codec::open`.
//!
//! [`Error::Unsupported`]: crate::error::Error::Unsupported

pub mod buffer;
pub mod descriptor;
pub mod info;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::Stream;
use crate::meta::MetadataMap;

pub use buffer::PixelBuffer;
pub use descriptor::{CapabilityDescriptor, FormatConstraints, SubFormat};
pub use info::{DataFormat, Dim, ImageInfo, ImageMode, ResolutionUnit};

// =============================================================================
// Open parameters
// =============================================================================

/// Whether a codec instance is opened for reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// Abort-check callback injected at session start.
///
/// Long-running codec calls poll this at scanline/tile granularity and bail
/// out early when it returns true. There is no other cancellation primitive.
pub type AbortCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Per-open parameters handed to [`Codec::open`].
#[derive(Default, Clone)]
pub struct OpenContext {
    /// Sub-format index within the codec family, as resolved by detection.
    /// An initial guess; the codec may refine it while parsing the header.
    pub sub_format: usize,

    /// Free-form options string (encoder quality, raw-layout geometry, ...).
    /// Codec-defined syntax; `None` means defaults.
    pub options: Option<String>,

    /// Quality hint for lossy encoders, 0-100.
    pub quality: u8,

    /// Abort-check callback, polled during long decodes/encodes.
    pub abort: Option<AbortCheck>,
}

impl OpenContext {
    /// Context with defaults and a resolved sub-format index.
    pub fn for_sub_format(sub_format: usize) -> Self {
        Self {
            sub_format,
            quality: 95,
            ..Default::default()
        }
    }

    /// True if the caller requested an abort.
    pub fn aborted(&self) -> bool {
        self.abort.as_ref().map(|cb| cb()).unwrap_or(false)
    }
}

// =============================================================================
// Codec Trait (registered side)
// =============================================================================

/// The registered, stateless side of a codec plugin.
///
/// Implementations are registered once with the
/// [`FormatRegistry`](crate::registry::FormatRegistry) and shared behind an
/// `Arc`. All mutable state belongs to the [`CodecInstance`] returned by
/// `open`.
pub trait Codec: Send + Sync {
    /// Static description of this format family: name, version, sniff
    /// length, and sub-formats with their capability flags and constraints.
    fn descriptor(&self) -> &CapabilityDescriptor;

    /// Content-sniff probe.
    ///
    /// Pure and side-effect free. `magic` holds at least
    /// `descriptor().sniff_len` bytes when that many were available from the
    /// source (zero-padded otherwise); `name` is the file name when known,
    /// for formats whose detection needs the extension.
    ///
    /// Returns the recognized sub-format index, or `None`.
    fn validate(&self, magic: &[u8], name: Option<&str>) -> Option<usize>;

    /// Bind a stream and produce a live instance.
    ///
    /// For [`OpenMode::Read`] the codec parses the header and populates
    /// image info; for [`OpenMode::Write`] it prepares the target for
    /// `write_image` calls. Any failure must release everything acquired
    /// before returning.
    fn open(
        &self,
        stream: Box<dyn Stream>,
        mode: OpenMode,
        ctx: OpenContext,
    ) -> Result<Box<dyn CodecInstance>>;
}

// =============================================================================
// CodecInstance Trait (per-open side)
// =============================================================================

/// The per-open, stateful side of a codec plugin.
///
/// Created by [`Codec::open`], driven by the session controller, closed and
/// dropped by `Session::end`. Implementations own their stream binding and
/// any decode state; nothing above this trait inspects either.
pub trait CodecInstance: Send {
    /// Image-info snapshot for one page. Pages within a file may differ.
    fn info(&mut self, page: usize) -> Result<ImageInfo>;

    /// Number of pages/frames in the open file.
    fn page_count(&mut self) -> Result<usize>;

    /// Decode one page into a freshly allocated pixel buffer.
    fn read_image(&mut self, page: usize) -> Result<PixelBuffer>;

    /// Encode one page from the supplied pixel buffer.
    fn write_image(&mut self, _image: &PixelBuffer, _page: usize) -> Result<()> {
        Err(Error::Unsupported {
            operation: "write_image",
        })
    }

    /// Whether `read_tile` is implemented.
    fn supports_tiles(&self) -> bool {
        false
    }

    /// Read one native tile `(xid, yid)` of `page` at pyramid level `level`.
    ///
    /// `level` is a codec-native level index, not a downsample exponent.
    fn read_tile(&mut self, _page: usize, _xid: u64, _yid: u64, _level: usize) -> Result<PixelBuffer> {
        Err(Error::Unsupported {
            operation: "read_tile",
        })
    }

    /// Whether `read_level` is implemented.
    fn supports_levels(&self) -> bool {
        false
    }

    /// Read the whole image of `page` at pyramid level `level`.
    fn read_level(&mut self, _page: usize, _level: usize) -> Result<PixelBuffer> {
        Err(Error::Unsupported {
            operation: "read_level",
        })
    }

    /// Whether `append_metadata` contributes anything.
    fn supports_metadata(&self) -> bool {
        false
    }

    /// Append format-native metadata for `page` into the canonical map.
    ///
    /// The map may be in any state; the codec must not assume other entries
    /// exist, and must return promptly (no I/O beyond its own embedded
    /// metadata block). Entries written here take precedence over the
    /// normalization layer's generic defaults.
    fn append_metadata(&mut self, _page: usize, _map: &mut MetadataMap) -> Result<()> {
        Ok(())
    }

    /// Release the stream binding. Idempotent; called before drop.
    fn close(&mut self) -> Result<()>;
}
