//! Pipeline-wide configuration, loadable from JSON.
//!
//! ```json
//! { "debug": true, "encodings": ["utf-8", "shift_jis"], "compressionLevel": 9 }
//! ```
//! Every field is optional; missing fields take the [`Default`] values.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::DEFAULT_COMPRESSION_LEVEL;
use crate::transcode::UTF_8;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Emit informational and warning diagnostics.
    pub debug:             bool,
    /// Requested encodings, filtered against the environment at build time.
    pub encodings:         Vec<String>,
    /// zlib level 0–9 for the compression stage.
    pub compression_level: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debug:             false,
            encodings:         vec![UTF_8.to_owned()],
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
