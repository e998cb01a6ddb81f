//! Text ⇄ bytes transcoding under a named character set.
//!
//! # Strategy chain
//! A [`TranscoderChain`] holds an ordered list of [`Transcoder`] strategies.
//! For a given encoding name, only strategies that recognise the name are
//! tried, in order, and the first success wins.  The standard chain is:
//!
//! 1. [`LabelTranscoder`]: WHATWG encoding labels via `encoding_rs`.
//! 2. [`NativeUtf8`]: the language's own UTF-8, always available.
//!
//! The last-resort fallback (use UTF-8 bytes even though another encoding
//! was asked for) is NOT part of the chain: it changes which
//! encoding the payload is in, so the pipeline performs it and records it.

use encoding_rs::Encoding;
use thiserror::Error;

/// Canonical name of the universal fallback encoding.
pub const UTF_8: &str = "utf-8";

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Encoding '{0}' is not recognised by any transcoder")]
    Unrecognised(String),
    #[error("Encoding '{0}' can only be decoded, not encoded")]
    DecodeOnly(String),
    #[error("Text contains characters not representable in '{0}'")]
    Unmappable(String),
    #[error("Bytes are not valid '{0}'")]
    Malformed(String),
}

/// One way of converting between text and bytes.
pub trait Transcoder: Send + Sync {
    /// Strategy name (diagnostics only).
    fn name(&self) -> &'static str;
    fn encoding_exists(&self, encoding: &str) -> bool;
    fn encode(&self, text: &str, encoding: &str) -> Result<Vec<u8>, TranscodeError>;
    fn decode(&self, bytes: &[u8], encoding: &str) -> Result<String, TranscodeError>;
}

/// `true` for the spellings of UTF-8 the native codec answers to.
pub fn is_utf8_label(encoding: &str) -> bool {
    matches!(encoding.to_ascii_lowercase().as_str(), "utf-8" | "utf8" | "unicode-1-1-utf-8")
}

// ── encoding_rs ──────────────────────────────────────────────────────────────

/// Label-based transcoder backed by `encoding_rs`.
///
/// Encodings that `encoding_rs` can only decode (UTF-16LE/BE, `replacement`)
/// fail on encode.  Unmappable characters and malformed input are failures
/// too, so a lossy result never masquerades as a successful conversion.
pub struct LabelTranscoder;

impl LabelTranscoder {
    fn lookup(encoding: &str) -> Result<&'static Encoding, TranscodeError> {
        Encoding::for_label(encoding.as_bytes()).ok_or_else(|| TranscodeError::Unrecognised(encoding.to_owned()))
    }
}

impl Transcoder for LabelTranscoder {
    fn name(&self) -> &'static str { "encoding_rs" }

    fn encoding_exists(&self, encoding: &str) -> bool {
        Encoding::for_label(encoding.as_bytes()).is_some()
    }

    fn encode(&self, text: &str, encoding: &str) -> Result<Vec<u8>, TranscodeError> {
        let enc = Self::lookup(encoding)?;
        if enc.output_encoding() != enc {
            return Err(TranscodeError::DecodeOnly(encoding.to_owned()));
        }
        let (bytes, _, had_unmappable) = enc.encode(text);
        if had_unmappable {
            return Err(TranscodeError::Unmappable(encoding.to_owned()));
        }
        Ok(bytes.into_owned())
    }

    fn decode(&self, bytes: &[u8], encoding: &str) -> Result<String, TranscodeError> {
        let enc = Self::lookup(encoding)?;
        enc.decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or_else(|| TranscodeError::Malformed(encoding.to_owned()))
    }
}

// ── Native UTF-8 ─────────────────────────────────────────────────────────────

/// The standard library's UTF-8, recognising only UTF-8 labels.
pub struct NativeUtf8;

impl NativeUtf8 {
    /// Lossy decode used as the pipeline's last resort: never fails,
    /// malformed sequences become U+FFFD.
    pub fn decode_lossy(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl Transcoder for NativeUtf8 {
    fn name(&self) -> &'static str { "native-utf8" }

    fn encoding_exists(&self, encoding: &str) -> bool {
        is_utf8_label(encoding)
    }

    fn encode(&self, text: &str, encoding: &str) -> Result<Vec<u8>, TranscodeError> {
        if !is_utf8_label(encoding) {
            return Err(TranscodeError::Unrecognised(encoding.to_owned()));
        }
        Ok(text.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8], encoding: &str) -> Result<String, TranscodeError> {
        if !is_utf8_label(encoding) {
            return Err(TranscodeError::Unrecognised(encoding.to_owned()));
        }
        String::from_utf8(bytes.to_vec()).map_err(|_| TranscodeError::Malformed(encoding.to_owned()))
    }
}

// ── Chain ────────────────────────────────────────────────────────────────────

/// Result of a successful chain run: the value plus which strategy made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoded<T> {
    pub value:    T,
    pub strategy: &'static str,
}

/// Ordered "first success wins" list of transcoders.
pub struct TranscoderChain {
    strategies: Vec<Box<dyn Transcoder>>,
}

impl Default for TranscoderChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl TranscoderChain {
    /// `encoding_rs` first, native UTF-8 second.
    pub fn standard() -> Self {
        let strategies: Vec<Box<dyn Transcoder>> = vec![Box::new(LabelTranscoder), Box::new(NativeUtf8)];
        Self::new(strategies)
    }

    pub fn new(strategies: Vec<Box<dyn Transcoder>>) -> Self {
        Self { strategies }
    }

    /// Any strategy recognises `encoding`.
    pub fn supports(&self, encoding: &str) -> bool {
        self.strategies.iter().any(|s| s.encoding_exists(encoding))
    }

    pub fn encode(&self, text: &str, encoding: &str) -> Result<Transcoded<Vec<u8>>, TranscodeError> {
        self.first_success(encoding, |s| s.encode(text, encoding))
    }

    pub fn decode(&self, bytes: &[u8], encoding: &str) -> Result<Transcoded<String>, TranscodeError> {
        self.first_success(encoding, |s| s.decode(bytes, encoding))
    }

    /// Run `op` on each recognising strategy; return the first `Ok`, or the
    /// last error if every one failed.
    fn first_success<T, F>(&self, encoding: &str, mut op: F) -> Result<Transcoded<T>, TranscodeError>
    where
        F: FnMut(&dyn Transcoder) -> Result<T, TranscodeError>,
    {
        let mut last_err = TranscodeError::Unrecognised(encoding.to_owned());
        for strategy in self.strategies.iter().filter(|s| s.encoding_exists(encoding)) {
            match op(strategy.as_ref()) {
                Ok(value) => return Ok(Transcoded { value, strategy: strategy.name() }),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }
}
