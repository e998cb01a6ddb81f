//! Encode / decode orchestration: the crate's embedding surface.
//!
//! # Stage order
//! ```text
//! encode: text ─▶ transcode ─▶ [metadata] ─▶ [compress] ─▶ [encrypt] ─▶ base64
//! decode: base64 ─▶ [decrypt] ─▶ [metadata] ⇄ [decompress] ─▶ transcode ─▶ text
//! ```
//! On decode the metadata header is looked for before decompression (it may
//! switch decompression on) and again inside the inflated bytes, because
//! the encoder frames before it compresses.
//!
//! # Failure model
//! Each stage either recovers locally (UTF-8 fallback, best-effort
//! compression, pass-through on empty password) or fails the whole call.
//! [`Base64Pipeline::try_encode`] / [`Base64Pipeline::try_decode`] return the
//! error; [`Base64Pipeline::encode`] / [`Base64Pipeline::decode`] log it and
//! return `None`.  There is never a partial result.
//!
//! # Logging
//! Informational and warning events are emitted only in debug mode.
//! Errors are always emitted.
//!
//! # Concurrency
//! A pipeline is `Send + Sync`.  The registry sits behind a read/write lock:
//! every call copies it once under a short read lock and works from that
//! copy, [`Base64Pipeline::configure`] builds the replacement registry
//! unlocked and swaps it in under the write lock.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::error;

use crate::alphabet;
use crate::codec::{Codec, CodecError, ZlibCodec, DEFAULT_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL};
use crate::config::PipelineConfig;
use crate::crypto::{self, CryptoError};
use crate::metadata::{self, EncodingMetadata, MetadataError};
use crate::options::EncodingOptions;
use crate::registry::{EncodingRegistry, Probe};
use crate::transcode::{NativeUtf8, TranscodeError, TranscoderChain, UTF_8};

/// Debug-gated diagnostics; `error!` is used directly and is never gated.
macro_rules! diag {
    ($pipeline:expr, warn, $($arg:tt)+) => {
        if $pipeline.debug_mode() {
            ::tracing::warn!($($arg)+);
        }
    };
    ($pipeline:expr, $($arg:tt)+) => {
        if $pipeline.debug_mode() {
            ::tracing::debug!($($arg)+);
        }
    };
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("The encoding '{0}' is not supported")]
    UnsupportedEncoding(String),
    #[error("No supported encoding is configured")]
    NoEncoding,
    #[error("Invalid Base64 input: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Transcoding error: {0}")]
    Transcode(#[from] TranscodeError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("{0}")]
    Crypto(#[from] CryptoError),
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

/// Bytes left after the decode-side metadata/decompression stages.
struct Unpacked {
    payload:  Vec<u8>,
    metadata: Option<EncodingMetadata>,
}

pub struct Base64Pipeline {
    registry:          RwLock<EncodingRegistry>,
    transcoders:       TranscoderChain,
    codec:             Box<dyn Codec>,
    compression_level: u32,
    debug:             AtomicBool,
}

impl Default for Base64Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Base64Pipeline {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn new() -> Self {
        Self::with_debug(false)
    }

    /// Standard transcoders, zlib, registry seeded with UTF-8.
    pub fn with_debug(debug: bool) -> Self {
        let transcoders = TranscoderChain::standard();
        let registry = EncodingRegistry::seeded(&transcoders);
        let pipeline = Self {
            registry:          RwLock::new(registry),
            transcoders,
            codec:             Box::new(ZlibCodec),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            debug:             AtomicBool::new(debug),
        };
        diag!(pipeline, codec = pipeline.codec.name(), "Base64 pipeline initialized");
        if pipeline.registry.read().default_encoding().is_none() {
            error!("UTF-8 is not supported by the configured transcoders");
        }
        pipeline
    }

    /// Build from a [`PipelineConfig`] and apply its encoding list.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let pipeline = Self::with_debug(config.debug).with_compression_level(config.compression_level);
        pipeline.configure(config.encodings.as_slice());
        pipeline
    }

    /// Swap the transcoder chain.  The registry is re-probed against it,
    /// keeping the previously requested names.
    pub fn with_transcoders(mut self, transcoders: TranscoderChain) -> Self {
        let requested = self.registry.read().requested().to_vec();
        self.transcoders = transcoders;
        *self.registry.get_mut() = EncodingRegistry::seeded(&self.transcoders);
        if !requested.is_empty() {
            self.configure(requested.as_slice());
        }
        self
    }

    pub fn with_codec(mut self, codec: Box<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(MAX_COMPRESSION_LEVEL);
        self
    }

    // ── Debug toggle ─────────────────────────────────────────────────────────

    pub fn set_debug_mode(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
        diag!(self, "Debug mode {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn debug_mode(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    // ── Registry management ──────────────────────────────────────────────────

    /// Replace the supported-encoding set with `requested` filtered by what
    /// the transcoders can handle.  Never fails; problems are logged.
    pub fn configure<S: AsRef<str>>(&self, requested: &[S]) {
        let mut fresh = EncodingRegistry::default();
        let report = fresh.configure(requested, &self.transcoders);

        for probe in &report {
            match probe {
                Probe::Supported(name)   => diag!(self, encoding = %name, "✓ encoding is supported"),
                Probe::Unsupported(name) => diag!(self, warn, encoding = %name, "✗ encoding is NOT supported"),
                Probe::Rejected(name)    => diag!(self, warn, encoding = %name, "'auto-detect' is not supported"),
            }
        }
        if fresh.default_encoding().is_none() {
            error!("No supported encodings found");
        }
        diag!(
            self,
            requested = ?fresh.requested(),
            supported = ?fresh.supported_encodings(),
            default = ?fresh.default_encoding(),
            "encoding support summary"
        );

        *self.registry.write() = fresh;
    }

    pub fn supported_encodings(&self) -> Vec<String> {
        self.registry.read().supported_encodings()
    }

    pub fn default_encoding(&self) -> Option<String> {
        self.registry.read().default_encoding().map(str::to_owned)
    }

    // ── Public entry points ──────────────────────────────────────────────────

    /// Encode `text`; `None` on failure (the reason is logged).
    pub fn encode(&self, text: &str, options: &EncodingOptions) -> Option<String> {
        self.try_encode(text, options)
            .map_err(|e| error!(error = %e, "Error during encode process"))
            .ok()
    }

    /// Decode `input`; `None` on failure (the reason is logged).
    pub fn decode(&self, input: &str, options: &EncodingOptions) -> Option<String> {
        self.try_decode(input, options)
            .map_err(|e| error!(error = %e, "Error during decode process"))
            .ok()
    }

    pub fn try_encode(&self, text: &str, options: &EncodingOptions) -> Result<String, PipelineError> {
        let registry = self.registry_snapshot();
        let target = resolve_encoding(&registry, options)?;
        let (bytes, used) = self.text_to_bytes(text, &target);
        let mut payload = self.pack(&bytes, &used, options)?;

        if let Some(password) = options.active_password() {
            let params = options.cipher_params();
            diag!(
                self,
                salt_length = params.salt_length,
                iv_length = params.iv_length,
                iterations = params.iterations,
                "encrypting payload"
            );
            payload = crypto::encrypt(&payload, password, &params)?;
            diag!(self, bytes = payload.len(), "encrypted payload");
        }

        let out = alphabet::encode(&payload, options.url_safe, options.no_padding);
        if options.url_safe || options.no_padding {
            diag!(self, no_padding = options.no_padding, "applied URL-safe alphabet");
        }
        diag!(self, chars = out.len(), "encoding complete");
        Ok(out)
    }

    pub fn try_decode(&self, input: &str, options: &EncodingOptions) -> Result<String, PipelineError> {
        // One registry generation per call, even if `configure` runs meanwhile.
        let registry = self.registry_snapshot();
        let mut target = resolve_encoding(&registry, options)?;
        let mut bytes = alphabet::decode(input)?;
        diag!(self, bytes = bytes.len(), "Base64 decoded");

        if let Some(password) = options.active_password() {
            if bytes.is_empty() {
                // Encryption passes empty payloads through; mirror that.
                diag!(self, "empty payload, nothing to decrypt");
            } else {
                self.log_envelope(&bytes);
                let iterations = crypto::resolve_iterations(options.iterations);
                bytes = crypto::decrypt(&bytes, password, iterations)?;
                diag!(self, bytes = bytes.len(), "decrypted payload");
            }
        }

        let unpacked = self.unpack(bytes, options)?;

        match &unpacked.metadata {
            Some(meta) if options.explicit_encoding().is_none() => {
                let named = meta.encoding.to_lowercase();
                if registry.is_supported(&named) {
                    diag!(self, encoding = %named, "using encoding from metadata");
                    target = named;
                } else {
                    diag!(self, warn, encoding = %named, "metadata names an unsupported encoding; keeping '{}'", target);
                }
            }
            Some(_) => {}
            None if options.include_metadata => {
                diag!(self, warn, "No metadata found but includeMetadata flag was set");
            }
            None => {}
        }

        let text = self.bytes_to_text(&unpacked.payload, &target);
        diag!(self, chars = text.chars().count(), "decoding complete");
        Ok(text)
    }

    // ── Stages ───────────────────────────────────────────────────────────────

    /// Copy of the current registry; the lock is released on return.
    fn registry_snapshot(&self) -> EncodingRegistry {
        self.registry.read().clone()
    }

    /// Returns the bytes and the name of the encoding they are actually in.
    fn text_to_bytes(&self, text: &str, target: &str) -> (Vec<u8>, String) {
        match self.transcoders.encode(text, target) {
            Ok(out) => {
                diag!(self, encoding = %target, strategy = out.strategy, "encoded text to bytes");
                (out.value, target.to_owned())
            }
            Err(e) => {
                diag!(
                    self,
                    warn,
                    encoding = %target,
                    error = %e,
                    "Non-UTF-8 encoding '{}' could not be used; falling back to UTF-8",
                    target
                );
                (text.as_bytes().to_vec(), UTF_8.to_owned())
            }
        }
    }

    fn bytes_to_text(&self, bytes: &[u8], target: &str) -> String {
        match self.transcoders.decode(bytes, target) {
            Ok(out) => {
                diag!(self, encoding = %target, strategy = out.strategy, "decoded bytes to text");
                out.value
            }
            Err(e) => {
                diag!(self, warn, encoding = %target, error = %e, "decoding as '{}' failed; falling back to UTF-8", target);
                NativeUtf8::decode_lossy(bytes)
            }
        }
    }

    /// Metadata framing and best-effort compression.
    fn pack(&self, bytes: &[u8], encoding: &str, options: &EncodingOptions) -> Result<Vec<u8>, PipelineError> {
        let frame = |compressed: bool| -> Result<Vec<u8>, MetadataError> {
            if options.include_metadata {
                metadata::frame(&EncodingMetadata::new(encoding, compressed), bytes)
            } else {
                Ok(bytes.to_vec())
            }
        };

        if !options.compress_requested() {
            let out = frame(false)?;
            if options.include_metadata {
                diag!(self, encoding, bytes = out.len() - bytes.len(), "added metadata");
            }
            return Ok(out);
        }

        let plain = frame(true)?;
        match self.codec.compress(&plain, self.compression_level) {
            Ok(packed) => {
                diag!(
                    self,
                    codec = self.codec.name(),
                    before = plain.len(),
                    after = packed.len(),
                    "compressed payload"
                );
                Ok(packed)
            }
            Err(e) => {
                // Keep the header truthful: the payload goes out uncompressed.
                error!(error = %e, "Compression failed, sending payload uncompressed");
                Ok(frame(false)?)
            }
        }
    }

    /// Metadata sniffing and decompression.
    fn unpack(&self, bytes: Vec<u8>, options: &EncodingOptions) -> Result<Unpacked, PipelineError> {
        let mut payload = bytes;
        let mut metadata = None;

        if let Some((meta, rest)) = self.extract_metadata(&payload) {
            payload = rest;
            metadata = Some(meta);
        }

        let decompress = match options.compress {
            Some(explicit) => explicit,
            None => metadata.as_ref().map_or(false, |m| m.compressed),
        };

        if decompress {
            match self.codec.decompress(&payload) {
                Ok(inflated) => {
                    diag!(self, before = payload.len(), after = inflated.len(), "decompressed payload");
                    payload = inflated;
                    if metadata.is_none() {
                        if let Some((meta, rest)) = self.extract_metadata(&payload) {
                            payload = rest;
                            metadata = Some(meta);
                        }
                    }
                }
                Err(e) if metadata.is_some() => return Err(e.into()),
                Err(e) => {
                    error!(error = %e, "Decompression failed. Was this data actually compressed?");
                }
            }
        } else if metadata.is_none() && options.compress.is_none() && self.codec.sniff(&payload) {
            // A compressed payload carries its header inside the stream.  Only
            // a header found in the first few inflated bytes licenses the
            // full inflate; after that a failure is fatal, as above.
            if self.peek_compressed_header(&payload) {
                let inflated = self.codec.decompress(&payload)?;
                diag!(self, before = payload.len(), after = inflated.len(), "self-described compressed payload");
                if let Some((meta, rest)) = self.extract_metadata(&inflated) {
                    payload = rest;
                    metadata = Some(meta);
                }
            } else {
                diag!(self, "no compressed metadata header; keeping original bytes");
            }
        }

        Ok(Unpacked { payload, metadata })
    }

    fn extract_metadata(&self, bytes: &[u8]) -> Option<(EncodingMetadata, Vec<u8>)> {
        match metadata::unframe(bytes) {
            Ok((meta, rest)) => {
                diag!(
                    self,
                    version = meta.version,
                    encoding = %meta.encoding,
                    compressed = meta.compressed,
                    "Found metadata"
                );
                Some((meta, rest.to_vec()))
            }
            Err(MetadataError::NotPresent) => None,
            Err(e) => {
                diag!(self, warn, error = %e, "Metadata extraction failed");
                None
            }
        }
    }

    /// Inflate just enough of an unflagged payload to see whether it carries
    /// a `compressed = true` header.
    fn peek_compressed_header(&self, payload: &[u8]) -> bool {
        match self.codec.decompress_prefix(payload, metadata::SNIFF_WINDOW) {
            Ok(head) => matches!(metadata::unframe(&head), Ok((meta, _)) if meta.compressed),
            Err(e) => {
                diag!(self, error = %e, "payload is not a compressed stream");
                false
            }
        }
    }

    fn log_envelope(&self, envelope: &[u8]) {
        if !self.debug_mode() {
            return;
        }
        let (salt_length, iv_length) = crypto::parse_config_byte(envelope[0]);
        let header_len = 1 + salt_length + iv_length;
        if envelope.len() >= header_len {
            diag!(
                self,
                salt = %hex::encode(&envelope[1..1 + salt_length]),
                iv = %hex::encode(&envelope[1 + salt_length..header_len]),
                "decrypting with Salt={}bytes, IV={}bytes",
                salt_length,
                iv_length
            );
        }
    }
}

/// Explicit encoding if given, else the registry default; must be supported.
fn resolve_encoding(registry: &EncodingRegistry, options: &EncodingOptions) -> Result<String, PipelineError> {
    let target = match options.explicit_encoding() {
        Some(name) => name,
        None => registry
            .default_encoding()
            .map(str::to_owned)
            .ok_or(PipelineError::NoEncoding)?,
    };
    if !registry.is_supported(&target) {
        return Err(PipelineError::UnsupportedEncoding(target));
    }
    Ok(target)
}
