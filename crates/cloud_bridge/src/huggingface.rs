//! Hosted plant disease classifier client
//!
//! Posts base64 image text to a Hugging Face style inference endpoint and
//! reads back the top label/score. Every failure is logged and turned into
//! "no result" so the caller can fall back to the local model.

use crate::response::top_prediction;
use anyhow::{Context, Result};
use async_trait::async_trait;
use diagnosis_core::{Prediction, RemoteClassifier};
use serde::Serialize;
use tracing::{debug, warn};

/// Default hosted model
pub const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/sayakpaul/Plant-Disease-Classification";

/// Default environment variable holding the API token
pub const DEFAULT_TOKEN_ENV: &str = "HF_TOKEN";

/// Configuration for the hosted classifier
#[derive(Debug, Clone, PartialEq)]
pub struct CloudConfig {
    /// Inference endpoint URL
    pub endpoint: String,
    /// Name of the environment variable read for the bearer token on each call
    pub token_env: String,
    /// Request timeout in seconds (default: transport default)
    pub timeout_secs: Option<u64>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            timeout_secs: None,
        }
    }
}

impl CloudConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            endpoint: non_empty("AGRISIGHT_ENDPOINT").unwrap_or(defaults.endpoint),
            token_env: non_empty("AGRISIGHT_TOKEN_ENV").unwrap_or(defaults.token_env),
            timeout_secs: non_empty("AGRISIGHT_TIMEOUT_SECS").and_then(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| warn!("Ignoring invalid AGRISIGHT_TIMEOUT_SECS={:?}: {}", raw, e))
                    .ok()
            }),
        }
    }
}

/// Hosted classifier client
pub struct CloudClassifier {
    config: CloudConfig,
    client: reqwest::Client,
}

impl CloudClassifier {
    /// Create a new client
    pub fn new(config: CloudConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(CloudConfig::from_env())
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// `host:port` of the endpoint, for reachability probing
    pub fn probe_addr(&self) -> Result<String> {
        let url = reqwest::Url::parse(&self.config.endpoint)
            .with_context(|| format!("Invalid endpoint URL: {}", self.config.endpoint))?;
        let host = url.host_str().context("Endpoint URL has no host")?;
        let port = url
            .port_or_known_default()
            .context("Endpoint URL has no port")?;
        Ok(format!("{}:{}", host, port))
    }

    /// Send one classification request
    ///
    /// Errors cover a missing token, transport failures, non-2xx statuses and
    /// unreadable bodies. An unusable but well-formed body is `Ok(None)`.
    pub async fn try_classify(&self, base64_image: &str) -> Result<Option<Prediction>> {
        let token = std::env::var(&self.config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .with_context(|| format!("{} environment variable not set", self.config.token_env))?;

        let request = InferenceRequest {
            inputs: base64_image,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to inference endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Inference endpoint error ({}): {}", status, error_text);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse inference response")?;

        let prediction = top_prediction(&body);
        if prediction.is_none() {
            debug!("Inference response had no usable prediction: {}", body);
        }
        Ok(prediction)
    }
}

#[async_trait]
impl RemoteClassifier for CloudClassifier {
    async fn classify(&self, base64_image: &str) -> Option<Prediction> {
        match self.try_classify(base64_image).await {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!("Cloud analysis failed: {:#}", e);
                None
            }
        }
    }
}

/// Inference request body
#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}
