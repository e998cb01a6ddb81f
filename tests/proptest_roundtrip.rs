use polybase64::{alphabet, Base64Pipeline, EncodingOptions};
use proptest::prelude::*;

fn options(url_safe: bool, no_padding: bool, compress: bool, metadata: bool) -> EncodingOptions {
    EncodingOptions::new()
        .with_url_safe(url_safe)
        .with_no_padding(no_padding)
        .with_compress(compress)
        .with_metadata(metadata)
}

proptest! {
    #[test]
    fn prop_roundtrip_any_text(
        text in "\\PC{0,200}",
        url_safe in any::<bool>(),
        no_padding in any::<bool>(),
        compress in any::<bool>(),
        metadata in any::<bool>(),
    ) {
        let pipeline = Base64Pipeline::new();
        let options = options(url_safe, no_padding, compress, metadata);
        let encoded = pipeline.encode(&text, &options).unwrap();
        prop_assert_eq!(pipeline.decode(&encoded, &options).unwrap(), text);
    }

    #[test]
    fn prop_self_describing_payloads_need_no_options(
        text in "\\PC{0,200}",
        compress in any::<bool>(),
    ) {
        let pipeline = Base64Pipeline::new();
        let encoded = pipeline.encode(&text, &options(false, false, compress, true)).unwrap();
        prop_assert_eq!(pipeline.decode(&encoded, &EncodingOptions::new()).unwrap(), text);
    }

    #[test]
    fn prop_url_safe_alphabet(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let encoded = alphabet::encode(&bytes, true, true);
        prop_assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        prop_assert_eq!(alphabet::decode(&encoded).unwrap(), bytes);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn prop_encrypted_roundtrip(
        text in "\\PC{0,64}",
        password in "[a-zA-Z0-9]{1,16}",
        salt_length in 8usize..=23,
        iv_length in 12usize..=16,
    ) {
        let pipeline = Base64Pipeline::new();
        let options = EncodingOptions::new()
            .with_password(password)
            .with_iterations(10_000)
            .with_salt_length(salt_length)
            .with_iv_length(iv_length);
        let encoded = pipeline.encode(&text, &options).unwrap();
        prop_assert_eq!(pipeline.decode(&encoded, &options).unwrap(), text);
    }
}
