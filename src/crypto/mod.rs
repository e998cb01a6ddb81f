//! Password cipher: PBKDF2-HMAC-SHA256 key derivation + AES-256-GCM.
//!
//! Key derivation: PBKDF2-HMAC-SHA256(password, salt, iterations) → 32-byte key
//! Encryption:     AES-256-GCM, random salt and IV per call, no associated data
//!
//! # Envelope layout
//! ```text
//! [ config (1 B) | salt (S B) | iv (N B) | ciphertext | GCM tag (16 B) ]
//!
//! config = ((S - 8) << 4) | (N - 12)
//! ```
//! The high nibble carries the salt length, the low nibble the IV length, so
//! an envelope can describe salts of 8..=23 bytes and IVs of 12..=27 bytes.
//! The iteration count is NOT stored: both sides must agree on it out of band
//! (the default unless the caller says otherwise).

use aes_gcm::aead::consts::{
    U12, U13, U14, U15, U16, U17, U18, U19, U20, U21, U22, U23, U24, U25, U26, U27,
};
use aes_gcm::aead::generic_array::{ArrayLength, GenericArray};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

pub const DEFAULT_SALT_LENGTH: usize = 8;
pub const MIN_SALT_LENGTH: usize = 8;
/// Upper bound accepted from options.
pub const MAX_SALT_LENGTH: usize = 32;
/// Largest salt the config byte's high nibble can describe.
pub const MAX_ENVELOPE_SALT_LENGTH: usize = MIN_SALT_LENGTH + 0x0F;

pub const DEFAULT_IV_LENGTH: usize = 12;
pub const MIN_IV_LENGTH: usize = 12;
pub const MAX_IV_LENGTH: usize = 16;
pub const MAX_ENVELOPE_IV_LENGTH: usize = MIN_IV_LENGTH + 0x0F;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;
pub const MIN_PBKDF2_ITERATIONS: u32 = 10_000;

/// Derived key size (AES-256).
pub const KEY_LEN: usize = 32;
/// GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Secure random source unavailable: {0}")]
    RandomUnavailable(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed: incorrect password or corrupted data")]
    DecryptionFailed,
    #[error("Encrypted payload too short: need at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("Unsupported IV length: {0} bytes")]
    UnsupportedIvLength(usize),
}

// ── Parameters ───────────────────────────────────────────────────────────────

/// Resolved cipher parameters for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherParams {
    pub salt_length: usize,
    pub iv_length:   usize,
    pub iterations:  u32,
}

impl Default for CipherParams {
    fn default() -> Self {
        Self {
            salt_length: DEFAULT_SALT_LENGTH,
            iv_length:   DEFAULT_IV_LENGTH,
            iterations:  DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl CipherParams {
    /// Resolve caller-supplied values, substituting the default for anything
    /// missing or out of range.
    ///
    /// Salt lengths 24..=32 are inside the nominal option range but cannot be
    /// written to the config byte, so they fall back to the default as well.
    pub fn resolve(salt_length: Option<usize>, iv_length: Option<usize>, iterations: Option<u32>) -> Self {
        Self {
            salt_length: salt_length
                .filter(|n| (MIN_SALT_LENGTH..=MAX_ENVELOPE_SALT_LENGTH.min(MAX_SALT_LENGTH)).contains(n))
                .unwrap_or(DEFAULT_SALT_LENGTH),
            iv_length: iv_length
                .filter(|n| (MIN_IV_LENGTH..=MAX_IV_LENGTH).contains(n))
                .unwrap_or(DEFAULT_IV_LENGTH),
            iterations: resolve_iterations(iterations),
        }
    }

    /// Bytes preceding the ciphertext in an envelope.
    pub fn header_len(&self) -> usize {
        1 + self.salt_length + self.iv_length
    }
}

/// Iteration count with the `MIN_PBKDF2_ITERATIONS` floor applied.
pub fn resolve_iterations(iterations: Option<u32>) -> u32 {
    iterations
        .filter(|&n| n >= MIN_PBKDF2_ITERATIONS)
        .unwrap_or(DEFAULT_PBKDF2_ITERATIONS)
}

/// Pack salt and IV lengths into the envelope config byte.
///
/// Callers must pass lengths inside the envelope's representable range.
pub fn config_byte(salt_length: usize, iv_length: usize) -> u8 {
    debug_assert!((MIN_SALT_LENGTH..=MAX_ENVELOPE_SALT_LENGTH).contains(&salt_length));
    debug_assert!((MIN_IV_LENGTH..=MAX_ENVELOPE_IV_LENGTH).contains(&iv_length));
    ((((salt_length - MIN_SALT_LENGTH) & 0x0F) << 4) | ((iv_length - MIN_IV_LENGTH) & 0x0F)) as u8
}

/// Unpack `(salt_length, iv_length)` from an envelope config byte.
pub fn parse_config_byte(config: u8) -> (usize, usize) {
    let salt_length = usize::from((config >> 4) & 0x0F) + MIN_SALT_LENGTH;
    let iv_length = usize::from(config & 0x0F) + MIN_IV_LENGTH;
    (salt_length, iv_length)
}

// ── Key derivation ───────────────────────────────────────────────────────────

/// Derive a 256-bit key from `password` and `salt` with PBKDF2-HMAC-SHA256.
pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::KeyDerivation("PBKDF2 iterations must be ≥1".into()));
    }
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, iterations, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivation(format!("PBKDF2 failed: {e}")))?;
    Ok(key)
}

/// Fill `buf` from the operating system's CSPRNG.
pub fn random_bytes(buf: &mut [u8]) -> Result<(), CryptoError> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptoError::RandomUnavailable(e.to_string()))
}

// ── Encrypt / decrypt ────────────────────────────────────────────────────────

/// Encrypt `plaintext` under `password` and wrap it in an envelope.
///
/// An empty password or an empty plaintext is passed through unchanged.
pub fn encrypt(plaintext: &[u8], password: &str, params: &CipherParams) -> Result<Vec<u8>, CryptoError> {
    if password.is_empty() || plaintext.is_empty() {
        return Ok(plaintext.to_vec());
    }

    let mut salt = vec![0u8; params.salt_length];
    random_bytes(&mut salt)?;
    let mut iv = vec![0u8; params.iv_length];
    random_bytes(&mut iv)?;

    let key = derive_key(password, &salt, params.iterations)?;
    let ciphertext = seal(&key, &iv, plaintext)?;

    let mut out = Vec::with_capacity(params.header_len() + ciphertext.len());
    out.push(config_byte(params.salt_length, params.iv_length));
    out.extend_from_slice(&salt);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open an envelope produced by [`encrypt`].
///
/// `iterations` must match the value used when encrypting.  An empty
/// password is treated as "not encrypted" and returns the input unchanged.
pub fn decrypt(envelope: &[u8], password: &str, iterations: u32) -> Result<Vec<u8>, CryptoError> {
    if password.is_empty() {
        return Ok(envelope.to_vec());
    }
    if envelope.len() < 2 {
        return Err(CryptoError::TooShort { expected: 2, actual: envelope.len() });
    }

    let (salt_length, iv_length) = parse_config_byte(envelope[0]);
    let header_len = 1 + salt_length + iv_length;
    if envelope.len() < header_len {
        return Err(CryptoError::TooShort { expected: header_len, actual: envelope.len() });
    }

    let salt = &envelope[1..1 + salt_length];
    let iv = &envelope[1 + salt_length..header_len];
    let ciphertext = &envelope[header_len..];

    if ciphertext.is_empty() {
        // A bare header is how an empty payload would look; header_len was
        // already checked, so this is the exact-minimum case.
        return Ok(Vec::new());
    }

    let key = derive_key(password, salt, iterations)?;
    open(&key, iv, ciphertext)
}

// ── AES-GCM with per-envelope nonce size ─────────────────────────────────────

type Aes256GcmN<N> = AesGcm<Aes256, N>;

fn seal_with<N: ArrayLength<u8>>(key: &[u8; KEY_LEN], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256GcmN::<N>::new_from_slice(key).map_err(|_| CryptoError::EncryptionFailed)?;
    cipher
        .encrypt(GenericArray::from_slice(iv), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

fn open_with<N: ArrayLength<u8>>(key: &[u8; KEY_LEN], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256GcmN::<N>::new_from_slice(key).map_err(|_| CryptoError::DecryptionFailed)?;
    cipher
        .decrypt(GenericArray::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Dispatch on the runtime IV length to the matching `AesGcm` nonce size.
macro_rules! with_nonce_size {
    ($len:expr, $f:ident($($arg:expr),*)) => {
        match $len {
            12 => $f::<U12>($($arg),*),
            13 => $f::<U13>($($arg),*),
            14 => $f::<U14>($($arg),*),
            15 => $f::<U15>($($arg),*),
            16 => $f::<U16>($($arg),*),
            17 => $f::<U17>($($arg),*),
            18 => $f::<U18>($($arg),*),
            19 => $f::<U19>($($arg),*),
            20 => $f::<U20>($($arg),*),
            21 => $f::<U21>($($arg),*),
            22 => $f::<U22>($($arg),*),
            23 => $f::<U23>($($arg),*),
            24 => $f::<U24>($($arg),*),
            25 => $f::<U25>($($arg),*),
            26 => $f::<U26>($($arg),*),
            27 => $f::<U27>($($arg),*),
            other => Err(CryptoError::UnsupportedIvLength(other)),
        }
    };
}

fn seal(key: &[u8; KEY_LEN], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    with_nonce_size!(iv.len(), seal_with(key, iv, plaintext))
}

fn open(key: &[u8; KEY_LEN], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    with_nonce_size!(iv.len(), open_with(key, iv, ciphertext))
}
