//! Preconditions checked before anything is changed: an elevated process
//! and a working network connection.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::NetworkConfig;

pub trait PrivilegeChecker: Send + Sync {
    fn is_elevated(&self) -> Result<bool>;
}

#[async_trait]
pub trait ConnectivityChecker: Send + Sync {
    async fn is_online(&self) -> bool;
}

// --- Privileges ---

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPrivileges;

#[cfg(windows)]
impl PrivilegeChecker for SystemPrivileges {
    fn is_elevated(&self) -> Result<bool> {
        const SCRIPT: &str = "([Security.Principal.WindowsPrincipal][Security.Principal.WindowsIdentity]::GetCurrent())\
            .IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)";
        let stdout = crate::powershell::output(SCRIPT)?;
        Ok(stdout.trim().eq_ignore_ascii_case("true"))
    }
}

#[cfg(not(windows))]
impl PrivilegeChecker for SystemPrivileges {
    fn is_elevated(&self) -> Result<bool> {
        use anyhow::Context;

        let output = std::process::Command::new("id")
            .arg("-u")
            .output()
            .context("Failed to run 'id -u'")?;
        anyhow::ensure!(output.status.success(), "'id -u' exited with {}", output.status);
        Ok(String::from_utf8_lossy(&output.stdout).trim() == "0")
    }
}

// --- Connectivity ---

/// Opens (and drops) a TCP connection to a well-known host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout,
        }
    }
}

impl From<&NetworkConfig> for TcpProbe {
    fn from(config: &NetworkConfig) -> Self {
        Self::new(&config.probe_host, config.probe_port, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl ConnectivityChecker for TcpProbe {
    async fn is_online(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => {
                debug!(host = %self.host, port = self.port, "connectivity probe succeeded");
                true
            }
            Ok(Err(e)) => {
                warn!(host = %self.host, port = self.port, error = %e, "connectivity probe failed");
                false
            }
            Err(_) => {
                warn!(
                    host = %self.host,
                    port = self.port,
                    timeout = ?self.timeout,
                    "connectivity probe timed out"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn probe_succeeds_against_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(2));
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn probe_fails_against_closed_port() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(2));
        assert!(!probe.is_online().await);
    }

    #[tokio::test]
    async fn unresolvable_host_is_offline() {
        let probe = TcpProbe::new("host.invalid", 443, Duration::from_secs(2));
        assert!(!probe.is_online().await);
    }

    #[test]
    fn probe_from_config() {
        let probe = TcpProbe::from(&NetworkConfig::default());
        assert_eq!(probe.host, "www.google.com");
        assert_eq!(probe.port, 443);
        assert_eq!(probe.timeout, Duration::from_secs(5));
    }
}
