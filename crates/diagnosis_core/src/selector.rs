//! Online/offline source selection
//!
//! Picks the hosted classifier when the host is online and falls back to the
//! bundled one otherwise, or when the hosted one has nothing to say.

use crate::connectivity::Connectivity;
use crate::types::{ClassificationResult, ImageInput, Prediction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Hosted classifier taking base64 image text
///
/// Implementations swallow their own failures and return `None`.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn classify(&self, base64_image: &str) -> Option<Prediction>;
}

/// In-process classifier taking the raw image
///
/// Implementations swallow their own failures and return `None`.
#[async_trait]
pub trait LocalPredictor: Send + Sync {
    async fn predict(&self, image: &ImageInput) -> Option<Prediction>;
}

/// Chooses between the remote and local classifiers per request
#[derive(Clone)]
pub struct SmartAnalyzer {
    remote: Arc<dyn RemoteClassifier>,
    local: Arc<dyn LocalPredictor>,
    connectivity: Arc<dyn Connectivity>,
}

impl SmartAnalyzer {
    pub fn new(
        remote: Arc<dyn RemoteClassifier>,
        local: Arc<dyn LocalPredictor>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            remote,
            local,
            connectivity,
        }
    }

    /// Classify an image, always producing a result
    pub async fn analyze(&self, image: &ImageInput) -> ClassificationResult {
        let online = self.connectivity.is_online().await;
        debug!("Internet status: {}", online);

        if online {
            if let Some(prediction) = self.remote.classify(image.base64()).await {
                info!(
                    "Cloud diagnosis: {} ({:.2})",
                    prediction.label, prediction.score
                );
                return ClassificationResult::cloud(prediction);
            }
            debug!("Cloud classifier returned nothing, falling back to local model");
        }

        let result = ClassificationResult::local(self.local.predict(image).await);
        match (&result.label, result.score) {
            (Some(label), Some(score)) => info!("Local diagnosis: {} ({:.2})", label, score),
            _ => info!("No diagnosis available from local model"),
        }
        result
    }
}
