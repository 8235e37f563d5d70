//! Server BMC adapter, tunnelling queries through a management console.
//!
//! BMCs on the out-of-band network are not reachable directly; the
//! management console proxies one HTTPS request per server, with the BMC's
//! own address and credentials carried as request headers rather than used
//! for the console session itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Credentials, DeviceDescriptor, DeviceKind, FactBundle, ProbeError};
use crate::probe::ssh::SshSession;
use crate::probe::traits::ProbeAdapter;

/// Default console API port.
const DEFAULT_API_PORT: u16 = 8444;

/// Compute inventory path on the console API.
const SERVER_QUERY_PATH: &str = "/v9/compute/servers/1";

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

/// Connection settings for the management console the BMC queries tunnel
/// through. One console serves the whole fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Console address.
    pub address: String,
    /// Console SSH username.
    pub username: String,
    /// Console SSH secret.
    pub secret: String,
    /// Console HTTPS API port (default: 8444).
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

impl ConsoleConfig {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            secret: secret.into(),
            api_port: DEFAULT_API_PORT,
        }
    }

    /// Set the console API port.
    pub fn with_api_port(mut self, port: u16) -> Self {
        self.api_port = port;
        self
    }
}

/// Probes server BMCs through the management console.
#[derive(Debug, Clone)]
pub struct BmcProbe {
    console: ConsoleConfig,
}

impl BmcProbe {
    pub fn new(console: ConsoleConfig) -> Self {
        Self { console }
    }

    /// The single tunnelled request for one BMC. The console API
    /// authenticates to the subsystem with the header-borne credentials.
    fn query_command(&self, bmc_address: &str, bmc_credentials: &Credentials) -> String {
        format!(
            "curl -s -k \
             -H \"X-Management-IPs: {}\" \
             -H \"X-Subsystem-User: {}\" \
             -H \"X-Subsystem-Password: {}\" \
             https://{}:{}{}",
            bmc_address,
            bmc_credentials.username,
            bmc_credentials.secret,
            self.console.address,
            self.console.api_port,
            SERVER_QUERY_PATH,
        )
    }

    async fn query(&self, descriptor: &DeviceDescriptor) -> Result<FactBundle, ProbeError> {
        let session = SshSession::connect(
            &self.console.address,
            &self.console.username,
            &self.console.secret,
            descriptor.timeout,
        )
        .await?;

        let command = self.query_command(&descriptor.address, &descriptor.credentials);
        let output = session.exec(&command).await;
        session.close().await;

        parse_server_payload(&output?)
    }
}

#[async_trait]
impl ProbeAdapter for BmcProbe {
    fn kind(&self) -> DeviceKind {
        DeviceKind::ServerBmc
    }

    async fn probe(&self, descriptor: &DeviceDescriptor) -> Result<Vec<FactBundle>, ProbeError> {
        tracing::debug!(
            bmc = %descriptor.address,
            console = %self.console.address,
            "Querying BMC through management console"
        );

        let result = self.query(descriptor).await;
        match &result {
            Ok(_) => tracing::debug!(bmc = %descriptor.address, "BMC probe successful"),
            Err(e) => tracing::warn!(bmc = %descriptor.address, error = %e, "BMC probe failed"),
        }

        result.map(|bundle| vec![bundle])
    }
}

/// Decode the console's server payload into a fact bundle.
///
/// # Errors
/// [`ProbeError::Protocol`] when the body is not JSON or lacks the `server`
/// object; [`ProbeError::Parse`] when an expected version key is absent.
fn parse_server_payload(body: &str) -> Result<FactBundle, ProbeError> {
    let payload: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ProbeError::Protocol(format!("console response is not JSON: {e}")))?;

    let server = payload
        .get("server")
        .and_then(|v| v.as_object())
        .ok_or_else(|| ProbeError::Protocol("response has no 'server' object".to_string()))?;

    let firmware_version = server
        .get("firmwareVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProbeError::Parse("server payload missing 'firmwareVersion'".to_string()))?
        .to_string();

    let bios_version = server
        .get("BIOSversion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProbeError::Parse("server payload missing 'BIOSversion'".to_string()))?
        .to_string();

    Ok(FactBundle::Bmc {
        firmware_version,
        bios_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorKind;

    #[test]
    fn test_console_config_defaults() {
        let console = ConsoleConfig::new("172.25.93.250", "ucpadmin", "secret");
        assert_eq!(console.api_port, DEFAULT_API_PORT);

        let console = console.with_api_port(9444);
        assert_eq!(console.api_port, 9444);
    }

    #[test]
    fn test_query_command_carries_bmc_identity_as_headers() {
        let probe = BmcProbe::new(ConsoleConfig::new("172.25.93.250", "ucpadmin", "console-pw"));
        let command = probe.query_command("10.4.2.17", &Credentials::new("bmcuser", "bmc-pw"));

        assert!(command.contains("X-Management-IPs: 10.4.2.17"));
        assert!(command.contains("X-Subsystem-User: bmcuser"));
        assert!(command.contains("X-Subsystem-Password: bmc-pw"));
        assert!(command.contains("https://172.25.93.250:8444/v9/compute/servers/1"));
        // The console credentials authenticate the outer session, never the request.
        assert!(!command.contains("console-pw"));
    }

    #[test]
    fn test_parse_server_payload() {
        let body = r#"{"server": {"firmwareVersion": "4.10.06", "BIOSversion": "A2E120", "model": "HA810"}}"#;
        let bundle = parse_server_payload(body).unwrap();
        assert_eq!(
            bundle,
            FactBundle::Bmc {
                firmware_version: "4.10.06".to_string(),
                bios_version: "A2E120".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_server_payload_not_json_is_protocol_error() {
        let err = parse_server_payload("<html>502 Bad Gateway</html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_parse_server_payload_missing_key_is_parse_error() {
        let body = r#"{"server": {"firmwareVersion": "4.10.06"}}"#;
        let err = parse_server_payload(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let body = r#"{"status": "ok"}"#;
        let err = parse_server_payload(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
