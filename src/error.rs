use thiserror::Error;

/// Errors surfaced by the registry, session, metadata, and region layers.
///
/// Codec plugins report failures through this same taxonomy; the layers above
/// propagate codec errors unchanged rather than rewrapping them. The only
/// locally-recovered failures are individual tile reads during region
/// composition (the region is left blank) and close failures during
/// session teardown (logged, cleanup continues).
#[derive(Debug, Error)]
pub enum Error {
    /// No registered codec matches the given content or format name
    #[error("No format found: {reason}")]
    NotFound { reason: String },

    /// The bound codec does not implement the requested capability
    /// (e.g. tile reads on a non-tiled codec, writes on a read-only adapter)
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: &'static str },

    /// Stream read/write/seek failure surfaced by the adapter
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Codec-internal parse or decompress failure
    #[error("Decode error: {0}")]
    Decode(String),

    /// Operation attempted outside the required session state
    /// (e.g. `write_image` while the session is reading)
    #[error("Invalid session state: expected {expected}, session is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}

impl Error {
    /// Shorthand for a `NotFound` with a formatted reason.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Error::NotFound {
            reason: reason.into(),
        }
    }

    /// Shorthand for a `Decode` with a formatted message.
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode(message.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("no codec matched content");
        assert_eq!(err.to_string(), "No format found: no codec matched content");

        let err = Error::Unsupported {
            operation: "read_tile",
        };
        assert_eq!(err.to_string(), "Unsupported operation: read_tile");

        let err = Error::InvalidState {
            expected: "writing",
            actual: "reading",
        };
        assert_eq!(
            err.to_string(),
            "Invalid session state: expected writing, session is reading"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
