//! The single-active-session controller.
//!
//! A [`Session`] owns a [`FormatRegistry`] and drives at most one open codec
//! instance at a time. Starting a new session implicitly ends the previous
//! one, so client code never juggles handles; `end` is idempotent and also
//! runs on drop. All codec calls cross the plugin boundary through a panic
//! guard, so a misbehaving codec surfaces as [`Error::Decode`] instead of
//! unwinding through the caller.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

use crate::codec::{AbortCheck, CodecInstance, ImageInfo, OpenContext, OpenMode, PixelBuffer};
use crate::error::{Error, Result};
use crate::io::{FileStream, Stream};
use crate::meta::MetadataMap;
use crate::registry::{FormatMatch, FormatRegistry};

// =============================================================================
// SessionState
// =============================================================================

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Inactive,
    Reading,
    Writing,
}

impl SessionState {
    pub const fn name(&self) -> &'static str {
        match self {
            SessionState::Inactive => "inactive",
            SessionState::Reading => "reading",
            SessionState::Writing => "writing",
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// Registry-backed controller over one open codec instance.
pub struct Session {
    registry: FormatRegistry,
    state: SessionState,
    instance: Option<Box<dyn CodecInstance>>,
    bound: Option<FormatMatch>,
    current_page: usize,
    info: ImageInfo,
    abort: Option<AbortCheck>,
}

impl Session {
    /// Session over the given registry, initially inactive.
    pub fn new(registry: FormatRegistry) -> Self {
        Self {
            registry,
            state: SessionState::Inactive,
            instance: None,
            bound: None,
            current_page: 0,
            info: ImageInfo::default(),
            abort: None,
        }
    }

    /// Session over a registry with the built-in codecs installed.
    pub fn with_default_codecs() -> Self {
        Self::new(FormatRegistry::with_default_codecs())
    }

    /// The backing registry.
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Install an abort-check callback applied to sessions started after
    /// this call.
    pub fn set_abort(&mut self, abort: AbortCheck) {
        self.abort = Some(abort);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != SessionState::Inactive
    }

    /// Page-0 info captured when the read session started, refreshed on each
    /// page read. Defaults when no session is active.
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Page last targeted by a read or write, 0 right after start.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Short name of the bound sub-format, `None` when inactive.
    pub fn format_name(&self) -> Option<&'static str> {
        let m = self.bound?;
        let codec = self.registry.codec(m.codec_index)?;
        Some(codec.descriptor().sub_formats[m.sub_format].name)
    }

    /// Family name of the bound codec, `None` when inactive.
    pub fn codec_name(&self) -> Option<&'static str> {
        let m = self.bound?;
        Some(self.registry.codec(m.codec_index)?.descriptor().name)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a read session, detecting the format by content.
    ///
    /// Any active session is ended first. `file_name` is a detection hint for
    /// formats that need the extension; the session binds to the first codec
    /// whose probe recognizes the stream's leading bytes. Page-0 info is
    /// captured eagerly, so a corrupt header fails here rather than on the
    /// first read.
    pub fn start_read(&mut self, stream: Box<dyn Stream>, file_name: Option<&str>) -> Result<()> {
        self.end();
        let mut stream = stream;
        let matched = self.registry.detect_by_content(stream.as_mut(), file_name)?;
        self.bind(stream, matched, OpenMode::Read, None, 0)
    }

    /// Start a read session with the format forced by name, bypassing
    /// content detection. `options` is a codec-defined layout/decoder
    /// options string (required by the headerless raw codec).
    pub fn start_read_as(
        &mut self,
        stream: Box<dyn Stream>,
        format_name: &str,
        options: Option<String>,
    ) -> Result<()> {
        self.end();
        let matched = self.registry.detect_by_name(format_name)?;
        if !self.registry.supports_reading(format_name) {
            return Err(Error::Unsupported {
                operation: "reading in this format",
            });
        }
        self.bind(stream, matched, OpenMode::Read, options, 0)
    }

    /// Start a write session in the named format.
    ///
    /// Any active session is ended first. `options` is a codec-defined
    /// encoder options string; `quality` is the lossy-encoder hint, 0-100.
    pub fn start_write(
        &mut self,
        stream: Box<dyn Stream>,
        format_name: &str,
        options: Option<String>,
        quality: u8,
    ) -> Result<()> {
        self.end();
        let matched = self.registry.detect_by_name(format_name)?;
        if !self.registry.supports_writing(format_name) {
            return Err(Error::Unsupported {
                operation: "writing in this format",
            });
        }
        self.bind(stream, matched, OpenMode::Write, options, quality)
    }

    fn bind(
        &mut self,
        stream: Box<dyn Stream>,
        matched: FormatMatch,
        mode: OpenMode,
        options: Option<String>,
        quality: u8,
    ) -> Result<()> {
        let codec = self
            .registry
            .codec(matched.codec_index)
            .ok_or_else(|| Error::not_found("codec index out of range"))?
            .clone();
        let ctx = OpenContext {
            sub_format: matched.sub_format,
            options,
            quality: if quality == 0 { 95 } else { quality },
            abort: self.abort.clone(),
        };

        let mut instance = guard(|| codec.open(stream, mode, ctx))?;
        let info = match mode {
            OpenMode::Read => match guard(|| instance.info(0)) {
                Ok(info) => info,
                Err(err) => {
                    // The instance never becomes part of a session, so it
                    // gets its close here.
                    if let Err(close_err) = guard(|| instance.close()) {
                        warn!(error = %close_err, "codec close failed after rejected open");
                    }
                    return Err(err);
                }
            },
            OpenMode::Write => ImageInfo::default(),
        };

        debug!(
            codec = codec.descriptor().name,
            format = codec.descriptor().sub_formats[matched.sub_format].name,
            mode = ?mode,
            "session started"
        );
        self.instance = Some(instance);
        self.bound = Some(matched);
        self.current_page = 0;
        self.info = info;
        self.state = match mode {
            OpenMode::Read => SessionState::Reading,
            OpenMode::Write => SessionState::Writing,
        };
        Ok(())
    }

    /// End the active session, if any. Idempotent.
    ///
    /// Close failures are logged and swallowed; teardown always completes
    /// and the session returns to inactive.
    pub fn end(&mut self) {
        if let Some(mut instance) = self.instance.take() {
            let closed = guard(|| instance.close());
            if let Err(err) = closed {
                warn!(error = %err, "codec close failed during session end");
            }
        }
        self.bound = None;
        self.current_page = 0;
        self.info = ImageInfo::default();
        self.state = SessionState::Inactive;
    }

    // =========================================================================
    // Convenience file entry points
    // =========================================================================

    /// Open `path` for reading, using the file name as a detection hint.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let stream = FileStream::open(path)?;
        let name = path.file_name().and_then(|n| n.to_str()).map(str::to_owned);
        self.start_read(Box::new(stream), name.as_deref())
    }

    /// Create `path` and start a write session in the named format.
    pub fn create_file(
        &mut self,
        path: impl AsRef<Path>,
        format_name: &str,
        options: Option<String>,
        quality: u8,
    ) -> Result<()> {
        let stream = FileStream::create(path)?;
        self.start_write(Box::new(stream), format_name, options, quality)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Number of pages in the open file.
    pub fn page_count(&mut self) -> Result<usize> {
        let instance = self.require(SessionState::Reading)?;
        guard(|| instance.page_count())
    }

    /// Info snapshot for one page; does not move the current page.
    pub fn page_info(&mut self, page: usize) -> Result<ImageInfo> {
        let instance = self.require(SessionState::Reading)?;
        guard(|| instance.info(page))
    }

    /// Decode one page. Refreshes the session's info snapshot to that page
    /// and makes it the current page.
    pub fn read_image(&mut self, page: usize) -> Result<PixelBuffer> {
        let instance = self.require(SessionState::Reading)?;
        let image = guard(|| instance.read_image(page))?;
        self.info = image.info().clone();
        self.current_page = page;
        Ok(image)
    }

    /// Whether the bound codec serves native tiles.
    pub fn supports_tiles(&self) -> bool {
        self.instance
            .as_ref()
            .map(|i| i.supports_tiles())
            .unwrap_or(false)
    }

    /// Read one native tile at a codec-native pyramid level.
    pub fn read_tile(&mut self, page: usize, xid: u64, yid: u64, level: usize) -> Result<PixelBuffer> {
        if !self.supports_tiles() {
            self.require(SessionState::Reading)?;
            return Err(Error::Unsupported {
                operation: "read_tile",
            });
        }
        let instance = self.require(SessionState::Reading)?;
        guard(|| instance.read_tile(page, xid, yid, level))
    }

    /// Whether the bound codec serves whole pyramid levels.
    pub fn supports_levels(&self) -> bool {
        self.instance
            .as_ref()
            .map(|i| i.supports_levels())
            .unwrap_or(false)
    }

    /// Read one page at a codec-native pyramid level.
    pub fn read_level(&mut self, page: usize, level: usize) -> Result<PixelBuffer> {
        if !self.supports_levels() {
            self.require(SessionState::Reading)?;
            return Err(Error::Unsupported {
                operation: "read_level",
            });
        }
        let instance = self.require(SessionState::Reading)?;
        guard(|| instance.read_level(page, level))
    }

    /// Whether the bound codec contributes format-native metadata.
    pub fn supports_metadata(&self) -> bool {
        self.instance
            .as_ref()
            .map(|i| i.supports_metadata())
            .unwrap_or(false)
    }

    /// Let the bound codec append its native metadata for `page`.
    pub fn append_metadata(&mut self, page: usize, map: &mut MetadataMap) -> Result<()> {
        if !self.supports_metadata() {
            self.require(SessionState::Reading)?;
            return Ok(());
        }
        let instance = self.require(SessionState::Reading)?;
        guard(|| instance.append_metadata(page, map))
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Encode one page into the open target.
    pub fn write_image(&mut self, image: &PixelBuffer, page: usize) -> Result<()> {
        let instance = self.require(SessionState::Writing)?;
        guard(|| instance.write_image(image, page))?;
        self.current_page = page;
        Ok(())
    }

    fn require(&mut self, expected: SessionState) -> Result<&mut Box<dyn CodecInstance>> {
        if self.state != expected {
            return Err(Error::InvalidState {
                expected: expected.name(),
                actual: self.state.name(),
            });
        }
        self.instance.as_mut().ok_or(Error::InvalidState {
            expected: expected.name(),
            actual: SessionState::Inactive.name(),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.end();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("format", &self.format_name())
            .field("current_page", &self.current_page)
            .finish()
    }
}

/// Run a codec call under a panic guard.
///
/// A panic inside a codec plugin becomes [`Error::Decode`] carrying the
/// panic message, leaving the session free to tear down normally.
fn guard<T>(call: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(Error::decode(format!("codec panicked: {message}")))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
