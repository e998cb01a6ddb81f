//! Multi-encoding Base64 codec.
//!
//! Converts text to Base64 and back, optionally passing through a named
//! character set, zlib compression, a self-describing metadata header and
//! password-based AES-256-GCM encryption.
//!
//! ```no_run
//! use polybase64::{Base64Pipeline, EncodingOptions};
//!
//! let pipeline = Base64Pipeline::new();
//! pipeline.configure(&["utf-8", "shift_jis"]);
//!
//! let options = EncodingOptions::new().with_compress(true).with_metadata(true);
//! let encoded = pipeline.encode("こんにちは", &options).unwrap();
//!
//! // The metadata header makes decoding self-configuring.
//! let decoded = pipeline.decode(&encoded, &EncodingOptions::new()).unwrap();
//! assert_eq!(decoded, "こんにちは");
//! ```

pub mod alphabet;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod metadata;
#[cfg(feature = "async")]
pub mod nonblocking;
pub mod options;
pub mod pipeline;
pub mod registry;
pub mod transcode;

pub use codec::{Codec, CodecError, ZlibCodec};
pub use config::{ConfigError, PipelineConfig};
pub use crypto::{CipherParams, CryptoError};
pub use metadata::{EncodingMetadata, MetadataError, CURRENT_VERSION};
pub use options::EncodingOptions;
pub use pipeline::{Base64Pipeline, PipelineError};
pub use registry::{EncodingRegistry, Probe};
pub use transcode::{Transcoder, TranscoderChain};
