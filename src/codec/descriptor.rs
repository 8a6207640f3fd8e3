//! Static format-family descriptors: capabilities, sub-formats, constraints.

// =============================================================================
// FormatConstraints
// =============================================================================

/// Numeric constraints of one sub-format. Zero means unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatConstraints {
    pub max_width: u32,
    pub max_height: u32,
    pub max_pages: u32,
    pub min_samples_per_pixel: u32,
    pub max_samples_per_pixel: u32,
    pub min_bits_per_sample: u32,
    pub max_bits_per_sample: u32,
    /// True when the format cannot carry an indexed-color palette.
    pub lut_not_supported: bool,
}

impl FormatConstraints {
    /// Whether an image with `bits` bits per sample can be written.
    pub fn accepts_bits_per_sample(&self, bits: u32) -> bool {
        (self.min_bits_per_sample == 0 || bits >= self.min_bits_per_sample)
            && (self.max_bits_per_sample == 0 || bits <= self.max_bits_per_sample)
    }

    /// Whether an image with `samples` samples per pixel can be written.
    pub fn accepts_samples_per_pixel(&self, samples: u32) -> bool {
        (self.min_samples_per_pixel == 0 || samples >= self.min_samples_per_pixel)
            && (self.max_samples_per_pixel == 0 || samples <= self.max_samples_per_pixel)
    }
}

// =============================================================================
// SubFormat
// =============================================================================

/// One named variant within a format family.
///
/// The short name is the case-insensitive lookup key used by
/// `detect_by_name`; it must be unique across the whole registry. Capability
/// flags and constraints are read-only after registration.
#[derive(Debug, Clone)]
pub struct SubFormat {
    /// Short name, no spaces (e.g. "jpeg"). Unique, case-insensitive key.
    pub name: &'static str,

    /// Human-readable long name (e.g. "JPEG File Interchange Format").
    pub long_name: &'static str,

    /// Pipe-delimited extension list without dots (e.g. "jpg|jpeg|jpe").
    pub extensions: &'static str,

    pub can_read: bool,
    pub can_write: bool,
    pub can_read_meta: bool,
    pub can_write_meta: bool,
    pub can_write_multipage: bool,

    pub constraints: FormatConstraints,
}

impl SubFormat {
    /// Extensions as an iterator over the pipe-delimited list.
    pub fn extension_list(&self) -> impl Iterator<Item = &'static str> {
        self.extensions.split('|').filter(|e| !e.is_empty())
    }

    /// Case-insensitive short-name match.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

// =============================================================================
// CapabilityDescriptor
// =============================================================================

/// Static, immutable description of a format family.
///
/// Constructed once per codec at registration; owned by the registry for the
/// registry's lifetime and never mutated.
#[derive(Debug, Clone)]
pub struct CapabilityDescriptor {
    /// Codec family name (e.g. "JPEG codec").
    pub name: &'static str,

    /// Codec version string.
    pub version: &'static str,

    /// Number of leading bytes the `validate` probe needs to recognize the
    /// format. The registry sniffs `max` over all registered codecs.
    pub sniff_len: usize,

    /// Sub-formats in a fixed, meaningful order (indices are stable).
    pub sub_formats: Vec<SubFormat>,
}

impl CapabilityDescriptor {
    /// Look up a sub-format by case-insensitive short name.
    pub fn sub_format_by_name(&self, name: &str) -> Option<(usize, &SubFormat)> {
        self.sub_formats
            .iter()
            .enumerate()
            .find(|(_, sf)| sf.matches_name(name))
    }
}

// =============================================================================
// Tests
// =============================================================================
