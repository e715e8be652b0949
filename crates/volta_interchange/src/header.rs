//! Message framing.
//!
//! A framed message is a 4-byte little-endian header length, the
//! bincode-encoded [`Header`], then the payload bytes. The header carries the
//! magic bytes, the format version, the version of the producing tool, and an
//! XXH3-128 checksum of the payload.

use serde::{Deserialize, Serialize};
use volta_common::ContentHash;

use crate::error::InterchangeError;

/// Magic bytes identifying a volta interchange message.
pub const MAGIC: [u8; 4] = *b"VOLT";

/// Current format version. Increment on breaking changes to the header or
/// the payload types.
pub const FORMAT_VERSION: u32 = 1;

/// Header prepended to every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Magic bytes: must be `b"VOLT"`.
    pub magic: [u8; 4],
    /// Format version.
    pub format_version: u32,
    /// Version of the tool that produced the message.
    pub tool_version: String,
    /// Checksum of the payload.
    pub checksum: ContentHash,
}

impl Header {
    /// A current-version header for `payload`.
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            checksum: ContentHash::from_bytes(payload),
        }
    }
}

pub(crate) fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, InterchangeError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| {
        InterchangeError::Serialization {
            reason: e.to_string(),
        }
    })
}

pub(crate) fn from_bytes<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, InterchangeError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| InterchangeError::Serialization {
            reason: e.to_string(),
        })
}

/// Frames `payload` behind a fresh header.
pub fn frame(payload: &[u8]) -> Result<Vec<u8>, InterchangeError> {
    frame_with(&Header::for_payload(payload), payload)
}

/// Frames `payload` behind `header` as given.
pub fn frame_with(header: &Header, payload: &[u8]) -> Result<Vec<u8>, InterchangeError> {
    let header_bytes = to_bytes(header)?;
    let header_len = header_bytes.len() as u32;
    let mut out = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(payload);
    Ok(out)
}

/// Splits a framed message into its validated header and payload.
pub fn unframe(bytes: &[u8]) -> Result<(Header, &[u8]), InterchangeError> {
    let truncated = || InterchangeError::Truncated { len: bytes.len() };
    let len_bytes: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(truncated)?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header_bytes = bytes.get(4..4 + header_len).ok_or_else(truncated)?;
    let header: Header = from_bytes(header_bytes)?;

    if header.magic != MAGIC {
        return Err(InterchangeError::BadMagic {
            found: header.magic,
        });
    }
    if header.format_version != FORMAT_VERSION {
        return Err(InterchangeError::VersionMismatch {
            expected: FORMAT_VERSION,
            actual: header.format_version,
        });
    }
    let payload = &bytes[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(InterchangeError::ChecksumMismatch {
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_then_unframe() {
        let framed = frame(b"payload").unwrap();
        let (header, payload) = unframe(&framed).unwrap();
        assert_eq!(payload, b"payload");
        assert_eq!(header.magic, MAGIC);
        assert_eq!(header.format_version, FORMAT_VERSION);
        assert_eq!(header.tool_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn empty_payload_is_valid() {
        let framed = frame(&[]).unwrap();
        let (_, payload) = unframe(&framed).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn short_input_is_truncated() {
        assert!(matches!(
            unframe(&[1, 0]),
            Err(InterchangeError::Truncated { len: 2 })
        ));
        assert!(matches!(
            unframe(&[200, 0, 0, 0, 1]),
            Err(InterchangeError::Truncated { len: 5 })
        ));
    }

    #[test]
    fn foreign_magic_rejected() {
        let mut header = Header::for_payload(b"x");
        header.magic = *b"EDIF";
        let framed = frame_with(&header, b"x").unwrap();
        assert!(matches!(
            unframe(&framed),
            Err(InterchangeError::BadMagic { found }) if &found == b"EDIF"
        ));
    }

    #[test]
    fn other_version_rejected() {
        let mut header = Header::for_payload(b"x");
        header.format_version = FORMAT_VERSION + 1;
        let framed = frame_with(&header, b"x").unwrap();
        assert!(matches!(
            unframe(&framed),
            Err(InterchangeError::VersionMismatch { actual, .. }) if actual == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn corrupted_payload_rejected() {
        let mut framed = frame(b"payload").unwrap();
        let last = framed.len() - 1;
        framed[last] ^= 0xff;
        assert!(matches!(
            unframe(&framed),
            Err(InterchangeError::ChecksumMismatch { .. })
        ));
    }
}
