//! Bridge to the hosted plant disease classifier
//!
//! Provides the remote half of the diagnosis selector: an HTTP client for a
//! hosted inference endpoint that answers with a label and a score, or with
//! nothing when anything goes wrong.

pub mod analyzer;
pub mod huggingface;
pub mod response;

pub use analyzer::smart_analyzer;
pub use huggingface::{CloudClassifier, CloudConfig, DEFAULT_ENDPOINT, DEFAULT_TOKEN_ENV};
pub use response::top_prediction;
