//! Self-describing metadata header.
//!
//! ```text
//! [ len (1 B) | version (1 B) | compressed (1 B) | encoding name (UTF-8) ] payload…
//! ```
//! `len` counts the metadata bytes only (version + flag + name), so the
//! payload starts at `1 + len`.  A header can therefore carry at most 253
//! bytes of encoding name.
//!
//! Decoders find the header by sniffing: a first byte in `1..30` is treated
//! as a plausible length prefix.  Sniffing can misfire on arbitrary bytes,
//! so a candidate header is validated field by field and any failure means
//! "no header here", never a hard error for the caller.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

/// Metadata layout version written by this build.
pub const CURRENT_VERSION: u8 = 1;
/// Largest value of the one-byte length prefix.
pub const MAX_METADATA_LEN: usize = u8::MAX as usize;
/// Sniffing accepts length prefixes strictly below this value.
pub const SNIFF_LIMIT: u8 = 30;
/// Longest frame header sniffing can accept: the prefix byte plus at most
/// `SNIFF_LIMIT - 1` metadata bytes.
pub const SNIFF_WINDOW: usize = SNIFF_LIMIT as usize;

const FLAG_UNCOMPRESSED: u8 = 0;
const FLAG_COMPRESSED:   u8 = 1;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("No metadata header present")]
    NotPresent,
    #[error("Metadata truncated: header declares {declared} bytes, {available} available")]
    Truncated { declared: usize, available: usize },
    #[error("Metadata too short: {0} bytes")]
    TooShort(usize),
    #[error("Metadata too long: {0} bytes (max {MAX_METADATA_LEN})")]
    TooLong(usize),
    #[error("Unsupported metadata version: {0}")]
    UnsupportedVersion(u8),
    #[error("Invalid compression flag: {0}")]
    InvalidFlag(u8),
    #[error("Invalid encoding name in metadata")]
    InvalidEncodingName,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// What the encoder recorded about a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingMetadata {
    pub version:    u8,
    pub compressed: bool,
    pub encoding:   String,
}

impl EncodingMetadata {
    pub fn new(encoding: impl Into<String>, compressed: bool) -> Self {
        Self {
            version: CURRENT_VERSION,
            compressed,
            encoding: encoding.into(),
        }
    }

    /// Serialized size, excluding the length prefix.
    pub fn encoded_len(&self) -> usize {
        2 + self.encoding.len()
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), MetadataError> {
        writer.write_u8(self.version)?;
        writer.write_u8(if self.compressed { FLAG_COMPRESSED } else { FLAG_UNCOMPRESSED })?;
        writer.write_all(self.encoding.as_bytes())?;
        Ok(())
    }

    /// Parse exactly one metadata body (no length prefix).
    pub fn read<R: Read>(mut reader: R) -> Result<Self, MetadataError> {
        let version = reader.read_u8()?;
        if version == 0 || version > CURRENT_VERSION {
            return Err(MetadataError::UnsupportedVersion(version));
        }
        let compressed = match reader.read_u8()? {
            FLAG_UNCOMPRESSED => false,
            FLAG_COMPRESSED   => true,
            other             => return Err(MetadataError::InvalidFlag(other)),
        };
        let mut name = Vec::new();
        reader.read_to_end(&mut name)?;
        let encoding = String::from_utf8(name).map_err(|_| MetadataError::InvalidEncodingName)?;
        if !is_label(&encoding) {
            return Err(MetadataError::InvalidEncodingName);
        }
        Ok(Self { version, compressed, encoding })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        // Writing to a Vec cannot fail.
        let _ = self.write(&mut out);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetadataError> {
        if bytes.len() < 3 {
            return Err(MetadataError::TooShort(bytes.len()));
        }
        Self::read(Cursor::new(bytes))
    }
}

/// Encoding labels are short ASCII tokens (`utf-8`, `shift_jis`, `iso-8859-1`…).
fn is_label(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
}

/// Prepend `[len, metadata…]` to `payload`.
pub fn frame(metadata: &EncodingMetadata, payload: &[u8]) -> Result<Vec<u8>, MetadataError> {
    let len = metadata.encoded_len();
    if len > MAX_METADATA_LEN {
        return Err(MetadataError::TooLong(len));
    }
    let mut out = Vec::with_capacity(1 + len + payload.len());
    out.write_u8(len as u8)?;
    metadata.write(&mut out)?;
    out.extend_from_slice(payload);
    Ok(out)
}

/// Whether `bytes` starts with something that could be a length prefix.
pub fn looks_framed(bytes: &[u8]) -> bool {
    bytes.len() > 2 && bytes[0] > 0 && bytes[0] < SNIFF_LIMIT
}

/// Split a framed payload into its metadata and the remaining bytes.
///
/// Returns [`MetadataError::NotPresent`] when the first byte is not a
/// plausible length prefix; every other error means a candidate header
/// failed validation.
pub fn unframe(bytes: &[u8]) -> Result<(EncodingMetadata, &[u8]), MetadataError> {
    if !looks_framed(bytes) {
        return Err(MetadataError::NotPresent);
    }
    let len = usize::from(bytes[0]);
    let end = 1 + len;
    if bytes.len() < end {
        return Err(MetadataError::Truncated { declared: len, available: bytes.len() - 1 });
    }
    let metadata = EncodingMetadata::from_bytes(&bytes[1..end])?;
    Ok((metadata, &bytes[end..]))
}
