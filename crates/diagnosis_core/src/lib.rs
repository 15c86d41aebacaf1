//! Core of the AgriSight crop diagnosis pipeline
//!
//! This crate provides the data types, the bundled local disease model,
//! the connectivity flag and the selector that decides, per request,
//! whether a photo is classified by the hosted model or the local one.

pub mod config;
pub mod connectivity;
pub mod local;
pub mod model;
pub mod selector;
pub mod types;

pub use config::DiagnosisConfig;
pub use connectivity::{Connectivity, ConnectivityMode, FixedConnectivity, TcpProbe};
pub use local::{LocalClassifier, ModelStatus};
pub use model::{DiseaseModel, ModelError};
pub use selector::{LocalPredictor, RemoteClassifier, SmartAnalyzer};
pub use types::*;
