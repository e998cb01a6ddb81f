//! Asynchronous entry points.
//!
//! Key derivation is slow (100 000 PBKDF2 rounds by default),
//! so the async variants move the whole call onto tokio's blocking pool
//! instead of stalling the caller's executor thread.  The result is the
//! same as the synchronous call; a panicked or cancelled worker is logged
//! and reported as failure.

use std::sync::Arc;

use tracing::error;

use crate::options::EncodingOptions;
use crate::pipeline::Base64Pipeline;

impl Base64Pipeline {
    /// [`encode`](Base64Pipeline::encode) on the blocking pool.
    pub async fn encode_async(self: Arc<Self>, text: String, options: EncodingOptions) -> Option<String> {
        tokio::task::spawn_blocking(move || self.encode(&text, &options))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "encode task did not complete");
                None
            })
    }

    /// [`decode`](Base64Pipeline::decode) on the blocking pool.
    pub async fn decode_async(self: Arc<Self>, input: String, options: EncodingOptions) -> Option<String> {
        tokio::task::spawn_blocking(move || self.decode(&input, &options))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "decode task did not complete");
                None
            })
    }
}
