//! Canonical metadata: tag names, the typed map, and the normalization layer.
//!
//! Every codec reports metadata in its own native vocabulary. This module
//! defines the one schema clients see:
//!
//! - [`tags`] - the canonical, namespaced tag name families
//!   (`image_num_x`, `pixel_resolution_x`, `channel_N_name`, ...)
//! - [`MetadataMap`] - an ordered string-keyed map of typed values
//! - [`MetaSession`] - the normalization layer over a
//!   [`Session`](crate::session::Session): per-page memoized parsing, unit
//!   conversion to micrometers, default channel colors and display LUT, and
//!   the append-if-absent rule that lets codec-supplied values win over
//!   generic defaults

pub mod map;
pub mod normalize;
pub mod tags;

pub use map::{MetadataMap, TagValue};
pub use normalize::{default_channel_colors, DisplayColor, MetaSession, UNASSIGNED_DISPLAY};
