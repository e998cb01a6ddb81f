//! Per-call options for [`encode`](crate::Base64Pipeline::encode) and
//! [`decode`](crate::Base64Pipeline::decode).
//!
//! Field names serialize in camelCase (`urlSafe`, `noPadding`, …) so option
//! blobs written for browser-side encoders deserialize unchanged.

use serde::{Deserialize, Serialize};

use crate::crypto::CipherParams;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodingOptions {
    /// Emit `-`/`_` instead of `+`/`/`.  Encoding only; decoding accepts both.
    pub url_safe: bool,
    /// Override the registry's default character set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Enables the cipher stage.  An empty password means "no encryption".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// `None` lets an embedded metadata header decide on decode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    /// Strip trailing `=`; implies the URL-safe alphabet.  Encoding only.
    pub no_padding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv_length: Option<usize>,
    pub include_metadata: bool,
}

impl EncodingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The password, if one that enables encryption was given.
    pub fn active_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn compress_requested(&self) -> bool {
        self.compress.unwrap_or(false)
    }

    /// Lower-cased explicit encoding, if any.
    pub fn explicit_encoding(&self) -> Option<String> {
        self.encoding
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
    }

    pub fn cipher_params(&self) -> CipherParams {
        CipherParams::resolve(self.salt_length, self.iv_length, self.iterations)
    }

    // ── Builder-style setters ────────────────────────────────────────────────

    pub fn with_url_safe(mut self, url_safe: bool) -> Self {
        self.url_safe = url_safe;
        self
    }

    pub fn with_no_padding(mut self, no_padding: bool) -> Self {
        self.no_padding = no_padding;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn with_salt_length(mut self, salt_length: usize) -> Self {
        self.salt_length = Some(salt_length);
        self
    }

    pub fn with_iv_length(mut self, iv_length: usize) -> Self {
        self.iv_length = Some(iv_length);
        self
    }
}
