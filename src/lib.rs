//! # rasterhub
//!
//! A unifying access layer for reading and writing images across
//! incompatible binary formats.
//!
//! Applications work with one registry, one session, and one metadata
//! schema; per-format codecs plug in behind a uniform trait boundary and
//! are selected automatically by content sniffing.
//!
//! ## Features
//!
//! - **One detection rule**: codecs probe the leading bytes in registration
//!   order; install order is priority, nothing is scored
//! - **Single-active-session control**: starting a new read or write
//!   implicitly ends the previous one, so handles never leak
//! - **Canonical metadata**: every format's native tags normalize into one
//!   typed schema, resolutions in micrometers, memoized per page
//! - **Region composition**: arbitrary rectangles at arbitrary pyramid
//!   levels, stitched from native tiles with per-tile failure tolerance
//!
//! ## Architecture
//!
//! - [`io`] - the stream adapters codecs read and write through
//! - [`codec`] - the codec plugin contract and shared pixel types
//! - [`codecs`] - built-in JPEG, PNG and raw codecs
//! - [`registry`] - codec registration, detection and capability queries
//! - [`session`] - the single-active-session controller
//! - [`meta`] - canonical tags and the metadata normalization layer
//! - [`region`] - the tiled/pyramidal region composer
//! - [`config`] - CLI configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use rasterhub::RegionReader;
//!
//! fn main() -> rasterhub::Result<()> {
//!     let mut reader = RegionReader::open("slide.png")?;
//!     let region = reader.read_region(0, 0, 0, 512, 512, 0)?;
//!     println!(
//!         "{}x{} pixels, {} channel(s)",
//!         region.info().width,
//!         region.info().height,
//!         region.info().samples,
//!     );
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod codecs;
pub mod config;
pub mod error;
pub mod io;
pub mod meta;
pub mod region;
pub mod registry;
pub mod session;

// Re-export commonly used types
pub use codec::{
    AbortCheck, CapabilityDescriptor, Codec, CodecInstance, DataFormat, Dim, FormatConstraints,
    ImageInfo, ImageMode, OpenContext, OpenMode, PixelBuffer, ResolutionUnit, SubFormat,
};
pub use error::{Error, Result};
pub use io::{FileStream, MemoryStream, Stream};
pub use meta::{MetaSession, MetadataMap, TagValue};
pub use region::RegionReader;
pub use registry::{FormatMatch, FormatRegistry};
pub use session::{Session, SessionState};
