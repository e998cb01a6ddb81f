//! RFC 4648 Base64 and Base64-URL text forms.
//!
//! Encoding picks one of three outputs: standard (`+/`, padded), URL-safe
//! (`-_`, padded) or URL-safe without padding.  Decoding accepts any of them:
//! the input is normalised back to the standard alphabet with padding
//! restored before it reaches the decoder.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::{DecodeError, Engine as _};

/// Standard alphabet, canonical padding, tolerant of non-zero trailing bits
/// (browsers' `atob` accepts those too).
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Encode `bytes`.  `no_padding` implies the URL-safe alphabet.
pub fn encode(bytes: &[u8], url_safe: bool, no_padding: bool) -> String {
    if no_padding {
        URL_SAFE_NO_PAD.encode(bytes)
    } else if url_safe {
        URL_SAFE.encode(bytes)
    } else {
        STANDARD.encode(bytes)
    }
}

/// Map a Base64 or Base64-URL string to standard, padded Base64.
///
/// ASCII whitespace is dropped.  Padding is restored to a multiple of four;
/// an input whose length is 1 mod 4 stays undecodable.
pub fn normalize(input: &str) -> String {
    let mut out: String = input
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padding = 4 - out.len() % 4;
    if padding < 4 {
        out.extend(std::iter::repeat('=').take(padding));
    }
    out
}

/// Decode any supported Base64 form.
pub fn decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    LENIENT_STANDARD.decode(normalize(input))
}
