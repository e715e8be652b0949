//! Error types for interchange encoding and decoding.

use std::path::PathBuf;

/// Errors raised while framing, encoding or decoding an interchange message.
///
/// Each header check has its own variant so a reader can tell a foreign file
/// from an outdated one or a corrupted one.
#[derive(Debug, thiserror::Error)]
pub enum InterchangeError {
    /// An I/O error occurred while reading or writing a message file.
    #[error("interchange I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The input ends before the header does.
    #[error("truncated interchange message: {len} bytes")]
    Truncated {
        /// Length of the input.
        len: usize,
    },

    /// The input is not an interchange message.
    #[error("bad magic bytes {found:?}, expected \"VOLT\"")]
    BadMagic {
        /// The four bytes found.
        found: [u8; 4],
    },

    /// The message was written with a different format version.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The format version this build reads.
        expected: u32,
        /// The format version found in the header.
        actual: u32,
    },

    /// The payload does not match the header checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum recorded in the header.
        expected: String,
        /// Checksum of the payload as read.
        actual: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },

    /// A message of one kind arrived where another was expected.
    #[error("unexpected {found} message, expected {expected}")]
    UnexpectedMessage {
        /// The kind that was expected.
        expected: &'static str,
        /// The kind that arrived.
        found: &'static str,
    },
}
