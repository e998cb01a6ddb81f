//! Encoding registry: which character sets this environment can use.
//!
//! The registry is rebuilt wholesale by [`EncodingRegistry::configure`];
//! nothing mutates it in place.  It performs no logging of its own; the
//! per-name [`Probe`] report it returns is what the caller logs.
//!
//! # Invariants
//! - `supported ⊆ requested ∪ {"utf-8"}`, all names lower-cased.
//! - `default ∈ supported` whenever `supported` is non-empty.
//! - `default == "utf-8"` whenever UTF-8 is supported.

use crate::transcode::{TranscoderChain, UTF_8};

/// Never accepted as an encoding name.
pub const AUTO_DETECT: &str = "auto-detect";

/// Outcome of checking one requested name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Supported(String),
    Unsupported(String),
    /// The `auto-detect` sentinel.
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodingRegistry {
    requested: Vec<String>,
    /// Insertion order matters: it decides the default when UTF-8 is absent.
    supported: Vec<String>,
    default:   Option<String>,
}

impl EncodingRegistry {
    /// A registry holding only UTF-8, if the transcoders can handle it.
    pub fn seeded(transcoders: &TranscoderChain) -> Self {
        let mut registry = Self::default();
        if transcoders.supports(UTF_8) {
            registry.supported.push(UTF_8.to_owned());
        }
        registry.default = registry.pick_default();
        registry
    }

    /// Replace the registry contents with `requested ∩ environment`, plus
    /// UTF-8 whenever the environment can handle it.
    pub fn configure<S: AsRef<str>>(&mut self, requested: &[S], transcoders: &TranscoderChain) -> Vec<Probe> {
        let mut supported: Vec<String> = Vec::with_capacity(requested.len() + 1);
        let mut report = Vec::with_capacity(requested.len());

        for name in requested {
            let name = name.as_ref().to_lowercase();
            if name == AUTO_DETECT {
                report.push(Probe::Rejected(name));
                continue;
            }
            if transcoders.supports(&name) {
                if !supported.contains(&name) {
                    supported.push(name.clone());
                }
                report.push(Probe::Supported(name));
            } else {
                report.push(Probe::Unsupported(name));
            }
        }

        if transcoders.supports(UTF_8) && !supported.iter().any(|n| n == UTF_8) {
            supported.push(UTF_8.to_owned());
        }

        self.requested = requested.iter().map(|s| s.as_ref().to_owned()).collect();
        self.supported = supported;
        self.default = self.pick_default();
        report
    }

    fn pick_default(&self) -> Option<String> {
        if self.supported.iter().any(|n| n == UTF_8) {
            Some(UTF_8.to_owned())
        } else {
            self.supported.first().cloned()
        }
    }

    /// Copy of the supported names, in insertion order.
    pub fn supported_encodings(&self) -> Vec<String> {
        self.supported.clone()
    }

    pub fn default_encoding(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    /// Case-insensitive membership test.
    pub fn is_supported(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.supported.iter().any(|n| *n == name)
    }
}
