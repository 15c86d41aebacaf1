//! Wiring of the hosted client into the source selector

use crate::huggingface::{CloudClassifier, CloudConfig};
use anyhow::Result;
use diagnosis_core::{ConnectivityMode, DiagnosisConfig, LocalClassifier, SmartAnalyzer};
use std::sync::Arc;
use tracing::warn;

/// Build a selector over the hosted client and the given local classifier
///
/// In `auto` mode the connectivity flag probes the endpoint's host. An
/// endpoint URL without a usable host makes the probe report offline.
pub fn smart_analyzer(
    local: Arc<LocalClassifier>,
    config: &DiagnosisConfig,
    cloud: CloudConfig,
) -> Result<SmartAnalyzer> {
    let remote = CloudClassifier::new(cloud)?;

    let probe_addr = match config.connectivity {
        ConnectivityMode::Auto => remote.probe_addr().unwrap_or_else(|e| {
            warn!("Cannot probe endpoint, treating host as offline: {:#}", e);
            String::new()
        }),
        _ => String::new(),
    };
    let connectivity = config
        .connectivity
        .into_connectivity(probe_addr, config.probe_timeout());

    Ok(SmartAnalyzer::new(Arc::new(remote), local, connectivity))
}
