//! Compression stage: the [`Codec`] trait and the built-in zlib codec.
//!
//! # Wire format
//! Compressed payloads are plain zlib streams (RFC 1950): a two-byte
//! CMF/FLG header, raw deflate data, and a big-endian Adler-32 trailer.
//! This is the format produced by Node's `zlib.deflateSync`, so payloads
//! interoperate with browser-side encoders of the same format.
//!
//! # Failure model
//! `compress` failures are recoverable: the pipeline keeps the uncompressed
//! payload.  `decompress` MUST fail loudly on malformed input; a truncated
//! stream or a bad Adler-32 trailer is an error, never a short read.

use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use thiserror::Error;

/// zlib's own default level (what `deflateSync` uses when none is given).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Highest level accepted by deflate.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

/// Lossless byte-stream compressor used by the pipeline.
///
/// Implementations must be pure: the same input always yields the same
/// output and no state is carried between calls.
pub trait Codec: Send + Sync {
    /// Human-readable name (diagnostics only).
    fn name(&self) -> &'static str;
    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>, CodecError>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
    /// Inflate at most `limit` bytes from the front of `data`.
    ///
    /// Lets the pipeline peek at an unflagged payload without inflating all
    /// of it.  The provided body is unbounded; streaming codecs override it.
    fn decompress_prefix(&self, data: &[u8], limit: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = self.decompress(data)?;
        out.truncate(limit);
        Ok(out)
    }
    /// Cheap structural check: does `data` start like this codec's output?
    ///
    /// A `true` answer is only a hint; `decompress` is still the authority.
    fn sniff(&self, data: &[u8]) -> bool;
}

// ── Built-in codec ───────────────────────────────────────────────────────────

pub struct ZlibCodec;

impl Codec for ZlibCodec {
    fn name(&self) -> &'static str { "zlib" }

    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>, CodecError> {
        let level = level.min(MAX_COMPRESSION_LEVEL);
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), Compression::new(level));
        encoder
            .write_all(data)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CodecError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        inflate(data, None)
    }

    fn decompress_prefix(&self, data: &[u8], limit: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = inflate(data, Some(limit))?;
        out.truncate(limit);
        Ok(out)
    }

    fn sniff(&self, data: &[u8]) -> bool {
        is_zlib_header(data)
    }
}

/// Inflate a zlib stream, stopping early once `limit` bytes are out.
///
/// Drives the inflater directly: the `read` adapters report a truncated
/// stream as a clean EOF.  `FlushDecompress::None` lets the output buffer
/// grow between calls; `Finish` would demand it all fit in one.
fn inflate(data: &[u8], limit: Option<usize>) -> Result<Vec<u8>, CodecError> {
    let mut inflater = Decompress::new(true);
    let initial = limit.unwrap_or_else(|| data.len().saturating_mul(2).max(64));
    let mut out = Vec::with_capacity(initial);
    loop {
        if out.len() == out.capacity() {
            if limit.is_some() {
                return Ok(out);
            }
            out.reserve(out.capacity());
        }
        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        let consumed = before_in as usize;
        let status = inflater
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                // Output space is available, so no progress means the input
                // ran out before the stream end marker.
                if inflater.total_in() == before_in && inflater.total_out() == before_out {
                    return Err(CodecError::Decompression(format!(
                        "truncated zlib stream ({} of {} bytes consumed)",
                        inflater.total_in(),
                        data.len(),
                    )));
                }
            }
        }
    }
}

/// Check the RFC 1950 stream header: deflate method, window ≤ 32 KiB,
/// no preset dictionary, and `(CMF * 256 + FLG) % 31 == 0`.
pub fn is_zlib_header(data: &[u8]) -> bool {
    let [cmf, flg, ..] = *data else {
        return false;
    };
    let method = cmf & 0x0F;
    let window = cmf >> 4;
    let preset_dict = flg & 0x20 != 0;
    method == 8 && window <= 7 && !preset_dict && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
}
