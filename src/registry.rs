//! The format registry: codec registration, detection, capability queries.
//!
//! The registry owns an append-only, ordered list of codec plugins. Detection
//! walks that list in registration order and stops at the first match, so
//! earlier codecs take precedence over later ones; `install order = priority`
//! is the single precedence rule and there is no scoring.

use std::sync::Arc;

use tracing::debug;

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::io::Stream;

// =============================================================================
// FormatMatch
// =============================================================================

/// Outcome of a successful detection: which codec, which of its sub-formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMatch {
    /// Index into the registry's codec list.
    pub codec_index: usize,
    /// Sub-format index within that codec's descriptor.
    pub sub_format: usize,
}

// =============================================================================
// FormatRegistry
// =============================================================================

/// Ordered collection of registered codecs.
///
/// Cloning a registry copies the codec list only; sessions and their open
/// instances never travel with a clone. Codecs themselves are shared behind
/// `Arc`, so a clone is cheap.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    codecs: Vec<Arc<dyn Codec>>,
    max_sniff_len: usize,
}

impl FormatRegistry {
    /// Empty registry with no codecs installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in codecs installed in their standard
    /// precedence order.
    pub fn with_default_codecs() -> Self {
        let mut registry = Self::new();
        crate::codecs::install_defaults(&mut registry);
        registry
    }

    /// Append a codec to the end of the detection order.
    ///
    /// Registration is append-only; there is no removal or reordering.
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        let descriptor = codec.descriptor();
        debug!(
            codec = descriptor.name,
            version = descriptor.version,
            sub_formats = descriptor.sub_formats.len(),
            "registering codec"
        );
        self.max_sniff_len = self.max_sniff_len.max(descriptor.sniff_len);
        self.codecs.push(codec);
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Longest sniff prefix any registered codec asks for.
    pub fn max_sniff_len(&self) -> usize {
        self.max_sniff_len
    }

    /// The codec at `index`, as stored at registration.
    pub fn codec(&self, index: usize) -> Option<&Arc<dyn Codec>> {
        self.codecs.get(index)
    }

    /// Registered codecs in detection order.
    pub fn codecs(&self) -> impl Iterator<Item = &Arc<dyn Codec>> {
        self.codecs.iter()
    }

    // =========================================================================
    // Detection
    // =========================================================================

    /// Detect the format of `stream` by content sniffing.
    ///
    /// Seeks to the start, reads the longest prefix any codec asks for
    /// (zero-padded when the source is shorter), then offers it to each codec
    /// in registration order. The first codec whose `validate` recognizes the
    /// prefix wins. The stream is left positioned at the start.
    ///
    /// `name` is passed through to the probes for formats whose detection
    /// needs the file name.
    pub fn detect_by_content(
        &self,
        stream: &mut dyn Stream,
        name: Option<&str>,
    ) -> Result<FormatMatch> {
        let mut magic = vec![0u8; self.max_sniff_len];
        stream.seek(std::io::SeekFrom::Start(0))?;
        let mut filled = 0;
        while filled < magic.len() {
            let n = stream.read(&mut magic[filled..])?;
            if n == 0 {
                break; // short source, rest stays zero
            }
            filled += n;
        }
        stream.seek(std::io::SeekFrom::Start(0))?;

        for (codec_index, codec) in self.codecs.iter().enumerate() {
            if let Some(sub_format) = codec.validate(&magic, name) {
                debug!(
                    codec = codec.descriptor().name,
                    sub_format, "content detection matched"
                );
                return Ok(FormatMatch {
                    codec_index,
                    sub_format,
                });
            }
        }
        Err(Error::not_found("no registered codec recognizes the content"))
    }

    /// Resolve a sub-format by its case-insensitive short name.
    ///
    /// Walks codecs in registration order, so a duplicated name resolves to
    /// the earliest registration.
    pub fn detect_by_name(&self, format_name: &str) -> Result<FormatMatch> {
        for (codec_index, codec) in self.codecs.iter().enumerate() {
            if let Some((sub_format, _)) = codec.descriptor().sub_format_by_name(format_name) {
                return Ok(FormatMatch {
                    codec_index,
                    sub_format,
                });
            }
        }
        Err(Error::not_found(format!(
            "no registered format named '{format_name}'"
        )))
    }

    // =========================================================================
    // Capability queries
    // =========================================================================

    /// Whether the named sub-format can decode images.
    pub fn supports_reading(&self, format_name: &str) -> bool {
        self.sub_format_flag(format_name, |sf| sf.can_read)
    }

    /// Whether the named sub-format can encode images.
    pub fn supports_writing(&self, format_name: &str) -> bool {
        self.sub_format_flag(format_name, |sf| sf.can_write)
    }

    /// Whether the named sub-format can write more than one page per file.
    pub fn supports_multipage_writing(&self, format_name: &str) -> bool {
        self.sub_format_flag(format_name, |sf| sf.can_write_multipage)
    }

    /// Whether the named sub-format accepts `bits` bits per sample on write.
    pub fn accepts_bits_per_sample(&self, format_name: &str, bits: u32) -> bool {
        self.sub_format_flag(format_name, |sf| {
            sf.can_write && sf.constraints.accepts_bits_per_sample(bits)
        })
    }

    fn sub_format_flag(
        &self,
        format_name: &str,
        flag: impl Fn(&crate::codec::SubFormat) -> bool,
    ) -> bool {
        self.detect_by_name(format_name)
            .ok()
            .map(|m| flag(&self.codecs[m.codec_index].descriptor().sub_formats[m.sub_format]))
            .unwrap_or(false)
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Short names of every registered sub-format, in precedence order.
    pub fn format_names(&self) -> Vec<&'static str> {
        self.codecs
            .iter()
            .flat_map(|c| c.descriptor().sub_formats.iter().map(|sf| sf.name))
            .collect()
    }

    /// Every known extension, lowercase, without dots, in precedence order.
    pub fn all_extensions(&self) -> Vec<&'static str> {
        self.codecs
            .iter()
            .flat_map(|c| {
                c.descriptor()
                    .sub_formats
                    .iter()
                    .flat_map(|sf| sf.extension_list())
            })
            .collect()
    }

    /// File-dialog filter string over readable sub-formats,
    /// e.g. `"*.jpg;*.jpeg;*.png"`.
    pub fn read_filter_string(&self) -> String {
        self.filter_string(|sf| sf.can_read)
    }

    /// File-dialog filter string over writable sub-formats.
    pub fn write_filter_string(&self) -> String {
        self.filter_string(|sf| sf.can_write)
    }

    fn filter_string(&self, include: impl Fn(&crate::codec::SubFormat) -> bool) -> String {
        let patterns: Vec<String> = self
            .codecs
            .iter()
            .flat_map(|c| c.descriptor().sub_formats.iter())
            .filter(|sf| include(sf))
            .flat_map(|sf| sf.extension_list().map(|e| format!("*.{e}")))
            .collect();
        patterns.join(";")
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("codecs", &self.format_names())
            .field("max_sniff_len", &self.max_sniff_len)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
