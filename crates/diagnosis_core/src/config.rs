//! Local diagnosis settings

use crate::connectivity::ConnectivityMode;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Configuration for the local side of a diagnosis
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisConfig {
    /// Directory holding `metadata.json` and `model.json` (default: model)
    pub model_dir: PathBuf,
    /// How the online flag is read (default: auto)
    pub connectivity: ConnectivityMode,
    /// Timeout for the reachability probe in milliseconds (default: 2000)
    pub probe_timeout_ms: u64,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("model"),
            connectivity: ConnectivityMode::Auto,
            probe_timeout_ms: 2000,
        }
    }
}

impl DiagnosisConfig {
    /// Create config from `AGRISIGHT_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            model_dir: lookup("AGRISIGHT_MODEL_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            connectivity: parse_or("AGRISIGHT_CONNECTIVITY", &lookup, defaults.connectivity),
            probe_timeout_ms: parse_or(
                "AGRISIGHT_PROBE_TIMEOUT_MS",
                &lookup,
                defaults.probe_timeout_ms,
            ),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Parse an optional variable, falling back to `default` with a warning
pub fn parse_or<T>(key: &str, lookup: impl Fn(&str) -> Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring invalid {}={:?}: {}", key, raw, e);
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_diagnosis_config_default() {
        let config = DiagnosisConfig::default();
        assert_eq!(config.model_dir, PathBuf::from("model"));
        assert_eq!(config.connectivity, ConnectivityMode::Auto);
        assert_eq!(config.probe_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = DiagnosisConfig::from_lookup(lookup(&[
            ("AGRISIGHT_MODEL_DIR", "/opt/agrisight/model"),
            ("AGRISIGHT_CONNECTIVITY", "offline"),
            ("AGRISIGHT_PROBE_TIMEOUT_MS", "750"),
        ]));
        assert_eq!(config.model_dir, PathBuf::from("/opt/agrisight/model"));
        assert_eq!(config.connectivity, ConnectivityMode::Offline);
        assert_eq!(config.probe_timeout_ms, 750);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = DiagnosisConfig::from_lookup(lookup(&[
            ("AGRISIGHT_MODEL_DIR", "  "),
            ("AGRISIGHT_CONNECTIVITY", "maybe"),
            ("AGRISIGHT_PROBE_TIMEOUT_MS", "soon"),
        ]));
        assert_eq!(config, DiagnosisConfig::default());
    }
}
