use std::sync::{Arc, OnceLock, Weak};
use std::thread;

use polybase64::codec::{Codec, CodecError, ZlibCodec};
use polybase64::transcode::{NativeUtf8, TranscodeError};
use polybase64::{Base64Pipeline, EncodingOptions, EncodingRegistry, Probe, Transcoder, TranscoderChain};

/// Recognises a fixed list of names and converts them as Latin-1.
struct FixedSet(Vec<&'static str>);

impl Transcoder for FixedSet {
    fn name(&self) -> &'static str { "fixed-set" }

    fn encoding_exists(&self, encoding: &str) -> bool {
        self.0.iter().any(|n| n.eq_ignore_ascii_case(encoding))
    }

    fn encode(&self, text: &str, encoding: &str) -> Result<Vec<u8>, TranscodeError> {
        text.chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| TranscodeError::Unmappable(encoding.to_owned())))
            .collect()
    }

    fn decode(&self, bytes: &[u8], _encoding: &str) -> Result<String, TranscodeError> {
        Ok(bytes.iter().map(|&b| char::from(b)).collect())
    }
}

fn chain(known: Vec<&'static str>, with_utf8: bool) -> TranscoderChain {
    let mut strategies: Vec<Box<dyn Transcoder>> = vec![Box::new(FixedSet(known))];
    if with_utf8 {
        strategies.push(Box::new(NativeUtf8));
    }
    TranscoderChain::new(strategies)
}

#[test]
fn test_seeded_with_utf8() {
    let pipeline = Base64Pipeline::new();
    assert_eq!(pipeline.supported_encodings(), ["utf-8"]);
    assert_eq!(pipeline.default_encoding().as_deref(), Some("utf-8"));
}

#[test]
fn test_probe_report() {
    let transcoders = chain(vec![], true);
    let mut registry = EncodingRegistry::default();
    let report = registry.configure(&["utf-8", "ascii", "auto-detect"], &transcoders);

    assert_eq!(
        report,
        [
            Probe::Supported("utf-8".into()),
            Probe::Unsupported("ascii".into()),
            Probe::Rejected("auto-detect".into()),
        ]
    );
    assert_eq!(registry.supported_encodings(), ["utf-8"]);
    assert_eq!(registry.default_encoding(), Some("utf-8"));
    assert_eq!(registry.requested(), ["utf-8", "ascii", "auto-detect"]);
}

#[test]
fn test_pipeline_configure_filters_environment() {
    let pipeline = Base64Pipeline::new().with_transcoders(chain(vec![], true));
    pipeline.configure(&["utf-8", "ascii", "auto-detect"]);
    assert_eq!(pipeline.supported_encodings(), ["utf-8"]);
    assert_eq!(pipeline.default_encoding().as_deref(), Some("utf-8"));
}

#[test]
fn test_configure_is_idempotent() {
    let pipeline = Base64Pipeline::new();
    pipeline.configure(&["shift_jis", "utf-8"]);
    let first = pipeline.supported_encodings();
    let first_default = pipeline.default_encoding();
    pipeline.configure(&["shift_jis", "utf-8"]);
    assert_eq!(pipeline.supported_encodings(), first);
    assert_eq!(pipeline.default_encoding(), first_default);
    assert_eq!(first_default.as_deref(), Some("utf-8"));
}

#[test]
fn test_names_are_lowercased_and_deduplicated() {
    let pipeline = Base64Pipeline::new();
    pipeline.configure(&["SHIFT_JIS", "Utf-8", "shift_jis"]);
    assert_eq!(pipeline.supported_encodings(), ["shift_jis", "utf-8"]);
    assert_eq!(pipeline.default_encoding().as_deref(), Some("utf-8"));
}

#[test]
fn test_utf8_added_when_not_requested() {
    let pipeline = Base64Pipeline::new();
    pipeline.configure(&["euc-kr"]);
    assert_eq!(pipeline.supported_encodings(), ["euc-kr", "utf-8"]);
    assert_eq!(pipeline.default_encoding().as_deref(), Some("utf-8"));
}

#[test]
fn test_configure_replaces_previous_set() {
    let pipeline = Base64Pipeline::new();
    pipeline.configure(&["shift_jis"]);
    pipeline.configure(&["euc-kr"]);
    assert!(!pipeline.supported_encodings().contains(&"shift_jis".to_owned()));
    assert!(pipeline.encode("x", &EncodingOptions::new().with_encoding("shift_jis")).is_none());
}

#[test]
fn test_default_without_utf8() {
    let pipeline = Base64Pipeline::new().with_transcoders(chain(vec!["koi8-r", "latin1"], false));
    assert!(pipeline.supported_encodings().is_empty());
    assert_eq!(pipeline.default_encoding(), None);

    pipeline.configure(&["latin1", "koi8-r", "utf-8"]);
    assert_eq!(pipeline.supported_encodings(), ["latin1", "koi8-r"]);
    assert_eq!(pipeline.default_encoding().as_deref(), Some("latin1"));

    let encoded = pipeline.encode("café", &EncodingOptions::new()).unwrap();
    assert_eq!(encoded, "Y2Fm6Q==");
    assert_eq!(pipeline.decode(&encoded, &EncodingOptions::new()).unwrap(), "café");
}

#[test]
fn test_nothing_supported() {
    let pipeline = Base64Pipeline::new().with_transcoders(chain(vec![], false));
    pipeline.configure(&["ascii"]);
    assert_eq!(pipeline.default_encoding(), None);
    assert!(pipeline.encode("x", &EncodingOptions::new()).is_none());
    assert!(pipeline.decode("eA==", &EncodingOptions::new()).is_none());
}

#[test]
fn test_with_transcoders_keeps_requested_names() {
    let pipeline = Base64Pipeline::new();
    pipeline.configure(&["latin1", "utf-8"]);
    let pipeline = pipeline.with_transcoders(chain(vec!["latin1"], true));
    assert_eq!(pipeline.supported_encodings(), ["latin1", "utf-8"]);
}

#[test]
fn test_concurrent_configure_and_encode() {
    let pipeline = Arc::new(Base64Pipeline::new());
    let mut handles = Vec::new();

    for i in 0..4 {
        let pipeline = Arc::clone(&pipeline);
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                if i == 0 {
                    pipeline.configure(&["shift_jis", "utf-8"]);
                } else {
                    let encoded = pipeline.encode("concurrent", &EncodingOptions::new()).unwrap();
                    assert_eq!(pipeline.decode(&encoded, &EncodingOptions::new()).unwrap(), "concurrent");
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(pipeline.default_encoding().as_deref(), Some("utf-8"));
}

/// zlib that drops `shift_jis` from its own pipeline on every inflate.
struct ReconfiguringCodec {
    owner: Arc<OnceLock<Weak<Base64Pipeline>>>,
}

impl Codec for ReconfiguringCodec {
    fn name(&self) -> &'static str { "reconfiguring-zlib" }

    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>, CodecError> {
        ZlibCodec.compress(data, level)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if let Some(pipeline) = self.owner.get().and_then(Weak::upgrade) {
            pipeline.configure(&["euc-kr"]);
        }
        ZlibCodec.decompress(data)
    }

    fn sniff(&self, data: &[u8]) -> bool {
        ZlibCodec.sniff(data)
    }
}

#[test]
fn test_decode_sees_one_registry_generation() {
    let owner = Arc::new(OnceLock::new());
    let pipeline = Arc::new(
        Base64Pipeline::new().with_codec(Box::new(ReconfiguringCodec { owner: Arc::clone(&owner) })),
    );
    pipeline.configure(&["shift_jis"]);

    let options = EncodingOptions::new()
        .with_encoding("shift_jis")
        .with_compress(true)
        .with_metadata(true);
    let encoded = pipeline.encode("日本語", &options).unwrap();

    owner.set(Arc::downgrade(&pipeline)).unwrap();
    // The registry changes mid-call; the call keeps the one it started with.
    assert_eq!(pipeline.decode(&encoded, &EncodingOptions::new()).unwrap(), "日本語");
    assert!(!pipeline.supported_encodings().contains(&"shift_jis".to_owned()));
}
