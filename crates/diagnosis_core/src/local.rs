//! Local classifier adapter
//!
//! Owns the handle to the bundled model. Loading is explicit, asynchronous
//! and best-effort: failures are logged and recorded in the handle's state,
//! and prediction simply yields nothing until a model is available.

use crate::model::DiseaseModel;
use crate::selector::LocalPredictor;
use crate::types::{ImageInput, Prediction};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lifecycle of the model handle
#[derive(Debug, Clone)]
pub enum ModelState {
    NotLoaded,
    Loading,
    Loaded(Arc<DiseaseModel>),
    Failed(String),
}

/// Serializable view of [`ModelState`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelStatus {
    NotLoaded,
    Loading,
    Loaded {
        name: Option<String>,
        labels: Vec<String>,
        image_size: u32,
    },
    Failed {
        reason: String,
    },
}

impl ModelStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

impl From<&ModelState> for ModelStatus {
    fn from(state: &ModelState) -> Self {
        match state {
            ModelState::NotLoaded => Self::NotLoaded,
            ModelState::Loading => Self::Loading,
            ModelState::Loaded(model) => Self::Loaded {
                name: model.name().map(str::to_string),
                labels: model.labels().to_vec(),
                image_size: model.image_size(),
            },
            ModelState::Failed(reason) => Self::Failed {
                reason: reason.clone(),
            },
        }
    }
}

/// Handle to the in-process classifier
pub struct LocalClassifier {
    model_dir: PathBuf,
    state: RwLock<ModelState>,
    load_lock: Mutex<()>,
}

impl LocalClassifier {
    /// Create an unloaded handle for the given model directory
    pub fn new(model_dir: impl AsRef<Path>) -> Self {
        Self {
            model_dir: model_dir.as_ref().to_path_buf(),
            state: RwLock::new(ModelState::NotLoaded),
            load_lock: Mutex::new(()),
        }
    }

    /// Create a handle around an already built model
    pub fn with_model(model: DiseaseModel) -> Self {
        Self {
            model_dir: PathBuf::new(),
            state: RwLock::new(ModelState::Loaded(Arc::new(model))),
            load_lock: Mutex::new(()),
        }
    }

    /// Create a handle and load it before returning
    pub async fn open(model_dir: impl AsRef<Path>) -> Self {
        let classifier = Self::new(model_dir);
        classifier.load().await;
        classifier
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Load the model unless it is already loaded
    ///
    /// Never fails: a load error is logged and kept as [`ModelStatus::Failed`].
    /// Calling again after a failure retries; calling again after success is
    /// a no-op.
    pub async fn load(&self) -> ModelStatus {
        let _guard = self.load_lock.lock().await;

        {
            let state = self.state.read().await;
            if matches!(*state, ModelState::Loaded(_)) {
                return ModelStatus::from(&*state);
            }
        }

        *self.state.write().await = ModelState::Loading;

        let next = match DiseaseModel::load_dir(&self.model_dir).await {
            Ok(model) => ModelState::Loaded(Arc::new(model)),
            Err(e) => {
                warn!(
                    "Failed to load local model from {}: {}",
                    self.model_dir.display(),
                    e
                );
                ModelState::Failed(e.to_string())
            }
        };

        let status = ModelStatus::from(&next);
        *self.state.write().await = next;
        status
    }

    /// Start loading in the background
    pub fn spawn_load(self: &Arc<Self>) -> JoinHandle<ModelStatus> {
        let classifier = Arc::clone(self);
        tokio::spawn(async move { classifier.load().await })
    }

    pub async fn status(&self) -> ModelStatus {
        ModelStatus::from(&*self.state.read().await)
    }

    async fn model(&self) -> Option<Arc<DiseaseModel>> {
        match &*self.state.read().await {
            ModelState::Loaded(model) => Some(Arc::clone(model)),
            _ => None,
        }
    }
}

#[async_trait]
impl LocalPredictor for LocalClassifier {
    async fn predict(&self, image: &ImageInput) -> Option<Prediction> {
        let Some(model) = self.model().await else {
            debug!("Local model not ready, no local prediction");
            return None;
        };

        match model.predict(image.bytes()) {
            Ok(prediction) => Some(prediction),
            Err(e) => {
                warn!("Local inference failed: {}", e);
                None
            }
        }
    }
}
