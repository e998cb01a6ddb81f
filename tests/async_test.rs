#![cfg(feature = "async")]

use std::sync::Arc;

use polybase64::{Base64Pipeline, EncodingOptions};

#[tokio::test]
async fn test_async_roundtrip() {
    let pipeline = Arc::new(Base64Pipeline::new());
    let options = EncodingOptions::new().with_compress(true).with_metadata(true);

    let encoded = Arc::clone(&pipeline)
        .encode_async("non-blocking 非同期".to_owned(), options)
        .await
        .unwrap();
    let decoded = pipeline.decode_async(encoded, EncodingOptions::new()).await.unwrap();
    assert_eq!(decoded, "non-blocking 非同期");
}

#[tokio::test]
async fn test_async_encrypted_roundtrip() {
    let pipeline = Arc::new(Base64Pipeline::new());
    let options = EncodingOptions::new().with_password("pw").with_iterations(10_000);

    let encoded = Arc::clone(&pipeline)
        .encode_async("secret".to_owned(), options.clone())
        .await
        .unwrap();
    assert_eq!(
        Arc::clone(&pipeline).decode_async(encoded.clone(), options).await.as_deref(),
        Some("secret")
    );

    let wrong = EncodingOptions::new().with_password("nope").with_iterations(10_000);
    assert_eq!(pipeline.decode_async(encoded, wrong).await, None);
}

#[tokio::test]
async fn test_async_invalid_input() {
    let pipeline = Arc::new(Base64Pipeline::new());
    assert_eq!(pipeline.decode_async("not-valid-base64!!".to_owned(), EncodingOptions::new()).await, None);
}
