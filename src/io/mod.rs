//! I/O layer: the stream adapter contract and concrete adapters.
//!
//! Codecs never touch a concrete transport. All of their I/O goes through the
//! [`Stream`] trait, a POSIX-stdio-shaped bundle of operations that decouples
//! header parsing and pixel decoding from where the bytes live. Two adapters
//! are provided:
//!
//! - [`FileStream`] - local files opened read-only or created for writing
//! - [`MemoryStream`] - in-memory buffers, useful for tests and for decoding
//!   already-downloaded content
//!
//! A read-only adapter simply leaves the default `write`/`flush`
//! implementations in place, which report [`Error::Unsupported`]. This is the
//! trait rendering of "absence of the write function pointer means read-only".
//!
//! [`Error::Unsupported`]: crate::error::Error::Unsupported

pub mod stream;

pub use stream::{FileStream, MemoryStream, Stream};
