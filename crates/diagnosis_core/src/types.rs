//! Core types for the diagnosis pipeline
//!
//! An image enters as an [`ImageInput`], each classifier answers with a
//! [`Prediction`], and the selector hands back a [`ClassificationResult`]
//! tagged with the [`Source`] that produced it.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// A photo submitted for one diagnosis request
///
/// Holds the raw bytes (for the local classifier) alongside their base64
/// text (for the hosted endpoint). Nothing is persisted.
#[derive(Debug, Clone)]
pub struct ImageInput {
    bytes: Vec<u8>,
    base64: String,
}

impl ImageInput {
    /// Create an input from bytes and an already encoded base64 string
    pub fn new(bytes: Vec<u8>, base64: String) -> Self {
        Self { bytes, base64 }
    }

    /// Create an input from raw bytes, encoding them with the standard alphabet
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let base64 = general_purpose::STANDARD.encode(&bytes);
        Self { bytes, base64 }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }
}

/// A single answer from a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Disease (or healthy) class name
    pub label: String,
    /// Confidence, nominally 0.0-1.0
    pub score: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Which classifier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Bundled in-process classifier
    Local,
    /// Hosted inference endpoint
    Cloud,
}

/// Normalized result returned to callers regardless of source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub source: Source,
    pub label: Option<String>,
    pub score: Option<f32>,
}

impl ClassificationResult {
    /// Tag a remote prediction as coming from the cloud
    pub fn cloud(prediction: Prediction) -> Self {
        Self {
            source: Source::Cloud,
            label: Some(prediction.label),
            score: Some(prediction.score),
        }
    }

    /// Tag whatever the local classifier produced, including nothing
    pub fn local(prediction: Option<Prediction>) -> Self {
        match prediction {
            Some(p) => Self {
                source: Source::Local,
                label: Some(p.label),
                score: Some(p.score),
            },
            None => Self {
                source: Source::Local,
                label: None,
                score: None,
            },
        }
    }

    /// True when no classifier produced a label
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
    }
}
