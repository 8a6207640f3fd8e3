//! The stream adapter contract and the file/memory adapters.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::Bytes;

use crate::error::{Error, Result};

// =============================================================================
// Stream Trait
// =============================================================================

/// Abstract bundle of I/O operations decoupling codecs from concrete
/// transports.
///
/// Semantics mirror C stdio: `read`/`write` move the cursor, `seek` is
/// absolute or relative, `tell` reports the cursor, `eof` is only meaningful
/// after a short read. The underlying transport is owned by the caller; a
/// session borrows the boxed stream for its duration and hands it to the
/// bound codec instance.
///
/// `write` and `flush` have default implementations that fail with
/// [`Error::Unsupported`]; a read-only adapter implements neither.
pub trait Stream: Send {
    /// Read up to `buf.len()` bytes at the cursor, advancing it.
    ///
    /// Returns the number of bytes read; 0 means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Move the cursor.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Current cursor position.
    fn tell(&mut self) -> Result<u64>;

    /// Total size of the stream in bytes.
    fn size(&self) -> u64;

    /// Whether the cursor is at or past the end of the stream.
    fn eof(&mut self) -> bool;

    /// Write `buf` at the cursor, advancing it.
    ///
    /// Defaults to [`Error::Unsupported`]; only writable adapters implement
    /// this.
    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::Unsupported { operation: "write" })
    }

    /// Flush buffered writes to the transport.
    fn flush(&mut self) -> Result<()> {
        Err(Error::Unsupported { operation: "flush" })
    }

    /// Whether this adapter supports writing.
    fn is_writable(&self) -> bool {
        false
    }

    /// Release the underlying transport. Idempotent; reads after close fail.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Provided helpers
    // -------------------------------------------------------------------------

    /// Read exactly `buf.len()` bytes or fail with an I/O error.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("needed {} bytes, got {}", buf.len(), filled),
                )));
            }
            filled += n;
        }
        Ok(())
    }

    /// Read the whole stream from offset 0 into a buffer.
    fn read_all(&mut self) -> Result<Vec<u8>> {
        self.seek(SeekFrom::Start(0))?;
        let mut out = Vec::with_capacity(self.size() as usize);
        let mut chunk = [0u8; 8192];
        loop {
            let n = self.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(out)
    }

    /// Write the whole buffer or fail.
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..])?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "stream refused further writes",
                )));
            }
            written += n;
        }
        Ok(())
    }
}

// =============================================================================
// FileStream
// =============================================================================

/// Stream adapter over a local file.
pub struct FileStream {
    file: Option<File>,
    writable: bool,
}

impl FileStream {
    /// Open an existing file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file: Some(file),
            writable: false,
        })
    }

    /// Create (or truncate) a file for read/write access.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file: Some(file),
            writable: true,
        })
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "stream is closed",
            ))
        })
    }
}

impl Stream for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file()?.read(buf)?)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.file()?.seek(pos)?)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.file()?.stream_position()?)
    }

    fn size(&self) -> u64 {
        self.file
            .as_ref()
            .and_then(|f| f.metadata().ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }

    fn eof(&mut self) -> bool {
        let size = self.size();
        match self.tell() {
            Ok(pos) => pos >= size,
            Err(_) => true,
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.writable {
            return Err(Error::Unsupported { operation: "write" });
        }
        Ok(self.file()?.write(buf)?)
    }

    fn flush(&mut self) -> Result<()> {
        if !self.writable {
            return Err(Error::Unsupported { operation: "flush" });
        }
        Ok(self.file()?.flush()?)
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the handle closes it; subsequent operations fail.
        self.file.take();
        Ok(())
    }
}

// =============================================================================
// MemoryStream
// =============================================================================

/// Stream adapter over an in-memory buffer.
///
/// Read-only when constructed from existing bytes, growable when constructed
/// with [`MemoryStream::writable`].
pub struct MemoryStream {
    data: Vec<u8>,
    pos: usize,
    writable: bool,
    closed: bool,
}

impl MemoryStream {
    /// Wrap existing bytes as a read-only stream.
    pub fn from_bytes(data: Bytes) -> Self {
        Self {
            data: data.to_vec(),
            pos: 0,
            writable: false,
            closed: false,
        }
    }

    /// Wrap an existing vector as a read-only stream.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            writable: false,
            closed: false,
        }
    }

    /// Create an empty, growable read/write stream.
    pub fn writable() -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
            writable: true,
            closed: false,
        }
    }

    /// Snapshot of the current contents.
    pub fn contents(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }

    /// Consume the stream, returning the underlying buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "stream is closed",
            )));
        }
        Ok(())
    }
}

impl Stream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        if self.pos >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.check_open()?;
        let new_pos = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::End(delta) => self.data.len() as i64 + delta,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
        };
        if new_pos < 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start of stream",
            )));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn eof(&mut self) -> bool {
        self.pos >= self.data.len()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        if !self.writable {
            return Err(Error::Unsupported { operation: "write" });
        }
        let end = self.pos + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.writable {
            return Err(Error::Unsupported { operation: "flush" });
        }
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
