//! Network reachability signal
//!
//! The flag is read once per diagnosis request and never cached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Source of the online/offline flag
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// A connectivity flag forced to a fixed value
#[derive(Debug, Clone, Copy)]
pub struct FixedConnectivity(pub bool);

#[async_trait]
impl Connectivity for FixedConnectivity {
    async fn is_online(&self) -> bool {
        self.0
    }
}

/// Reports online when a TCP connection to `addr` opens within `timeout`
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn is_online(&self) -> bool {
        let online = matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str())).await,
            Ok(Ok(_))
        );
        debug!("Connectivity probe {} -> {}", self.addr, online);
        online
    }
}

/// How the connectivity flag is obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityMode {
    /// Probe the remote endpoint on every request
    #[default]
    Auto,
    Online,
    Offline,
}

impl ConnectivityMode {
    /// Build the flag source for this mode; `probe_addr` is only used by `Auto`
    pub fn into_connectivity(
        self,
        probe_addr: impl Into<String>,
        timeout: Duration,
    ) -> Arc<dyn Connectivity> {
        match self {
            Self::Auto => Arc::new(TcpProbe::new(probe_addr, timeout)),
            Self::Online => Arc::new(FixedConnectivity(true)),
            Self::Offline => Arc::new(FixedConnectivity(false)),
        }
    }
}

impl FromStr for ConnectivityMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            other => anyhow::bail!("unknown connectivity mode: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_fixed_connectivity() {
        assert!(FixedConnectivity(true).is_online().await);
        assert!(!FixedConnectivity(false).is_online().await);
    }

    #[tokio::test]
    async fn test_probe_reachable_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let probe = TcpProbe::new(addr, Duration::from_secs(2));
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let probe = TcpProbe::new(addr, Duration::from_millis(500));
        assert!(!probe.is_online().await);
    }

    #[tokio::test]
    async fn test_probe_unresolvable_host() {
        let probe = TcpProbe::new("not a host", Duration::from_millis(200));
        assert!(!probe.is_online().await);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "OFFLINE".parse::<ConnectivityMode>().unwrap(),
            ConnectivityMode::Offline
        );
        assert_eq!(
            " auto ".parse::<ConnectivityMode>().unwrap(),
            ConnectivityMode::Auto
        );
        assert!("sometimes".parse::<ConnectivityMode>().is_err());
    }

    #[tokio::test]
    async fn test_forced_modes() {
        let online = ConnectivityMode::Online.into_connectivity("", Duration::ZERO);
        let offline = ConnectivityMode::Offline.into_connectivity("", Duration::ZERO);
        assert!(online.is_online().await);
        assert!(!offline.is_online().await);
    }
}
