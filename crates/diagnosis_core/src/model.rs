//! Local disease model
//!
//! The bundled model is a dense softmax head over a downscaled RGB image,
//! described by two files in the model directory:
//! - `metadata.json`: class labels and input image size
//! - `model.json`: kernel and bias of the dense layer
//!
//! Inputs are normalized the way the exporting tool trained them: each
//! channel mapped to `[-1, 1]`.

use crate::types::Prediction;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File name of the metadata descriptor
pub const METADATA_FILE: &str = "metadata.json";
/// File name of the weights descriptor
pub const WEIGHTS_FILE: &str = "model.json";

const CHANNELS: usize = 3;

/// Errors raised while loading or running the local model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model metadata lists no labels")]
    NoLabels,

    #[error("model image size must be positive")]
    ZeroImageSize,

    #[error("model image size {0} is too large")]
    ImageSizeTooLarge(u32),

    #[error("kernel has {actual} rows, expected {expected}")]
    KernelRows { expected: usize, actual: usize },

    #[error("kernel row {row} has {actual} columns, expected {expected}")]
    KernelColumns {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("bias has {actual} entries, expected {expected}")]
    BiasLength { expected: usize, actual: usize },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub labels: Vec<String>,
    pub image_size: u32,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Contents of `model.json`
#[derive(Debug, Clone, Deserialize)]
pub struct DenseWeights {
    /// `features x classes`
    pub kernel: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

/// A loaded, shape-checked classifier ready for inference
#[derive(Debug, Clone)]
pub struct DiseaseModel {
    metadata: ModelMetadata,
    kernel: Array2<f32>,
    bias: Array1<f32>,
}

impl DiseaseModel {
    /// Build a model from parsed descriptors, validating every dimension
    pub fn from_parts(metadata: ModelMetadata, weights: DenseWeights) -> Result<Self, ModelError> {
        if metadata.labels.is_empty() {
            return Err(ModelError::NoLabels);
        }
        if metadata.image_size == 0 {
            return Err(ModelError::ZeroImageSize);
        }

        let size = metadata.image_size as usize;
        let features = size
            .checked_mul(size)
            .and_then(|pixels| pixels.checked_mul(CHANNELS))
            .ok_or(ModelError::ImageSizeTooLarge(metadata.image_size))?;
        let classes = metadata.labels.len();

        if weights.kernel.len() != features {
            return Err(ModelError::KernelRows {
                expected: features,
                actual: weights.kernel.len(),
            });
        }
        if let Some((row, cols)) = weights
            .kernel
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != classes)
        {
            return Err(ModelError::KernelColumns {
                row,
                expected: classes,
                actual: cols.len(),
            });
        }
        if weights.bias.len() != classes {
            return Err(ModelError::BiasLength {
                expected: classes,
                actual: weights.bias.len(),
            });
        }

        let flat: Vec<f32> = weights.kernel.into_iter().flatten().collect();
        let kernel = Array2::from_shape_vec((features, classes), flat)
            .map_err(|_| ModelError::KernelRows {
                expected: features,
                actual: 0,
            })?;

        Ok(Self {
            metadata,
            kernel,
            bias: Array1::from(weights.bias),
        })
    }

    /// Read and validate both descriptors from a model directory
    pub async fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ModelError> {
        let dir = dir.as_ref();
        debug!("Loading local model from {}", dir.display());

        let metadata: ModelMetadata = read_json(&dir.join(METADATA_FILE)).await?;
        let weights: DenseWeights = read_json(&dir.join(WEIGHTS_FILE)).await?;
        let model = Self::from_parts(metadata, weights)?;

        info!(
            "Loaded local model {} ({} classes, {}px input)",
            model.metadata.model_name.as_deref().unwrap_or("unnamed"),
            model.labels().len(),
            model.image_size()
        );
        Ok(model)
    }

    pub fn labels(&self) -> &[String] {
        &self.metadata.labels
    }

    pub fn image_size(&self) -> u32 {
        self.metadata.image_size
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.model_name.as_deref()
    }

    /// Class probabilities for an encoded image, in label order
    pub fn probabilities(&self, image_bytes: &[u8]) -> Result<Vec<f32>, ModelError> {
        let image = image::load_from_memory(image_bytes)?;
        Ok(self.probabilities_for(&image))
    }

    /// Class probabilities for a decoded image, in label order
    pub fn probabilities_for(&self, image: &DynamicImage) -> Vec<f32> {
        let input = self.preprocess(image);
        let logits = input.dot(&self.kernel) + &self.bias;
        softmax(&logits.to_vec())
    }

    /// Highest probability class for an encoded image
    ///
    /// Among equal maxima the first label wins.
    pub fn predict(&self, image_bytes: &[u8]) -> Result<Prediction, ModelError> {
        let probs = self.probabilities(image_bytes)?;
        let (index, score) = top_class(&probs);
        Ok(Prediction::new(self.metadata.labels[index].clone(), score))
    }

    fn preprocess(&self, image: &DynamicImage) -> Array1<f32> {
        let size = self.metadata.image_size;
        let rgb = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();
        rgb.into_raw()
            .into_iter()
            .map(|v| f32::from(v) / 127.5 - 1.0)
            .collect()
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let data = tokio::fs::read(path).await.map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the first maximum
fn top_class(probs: &[f32]) -> (usize, f32) {
    probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, p)| {
            if p > best.1 {
                (i, p)
            } else {
                best
            }
        })
}
