//! Hypervisor management-endpoint adapter.
//!
//! Authenticates directly against a virtualization management API and walks
//! its inventory hierarchy, datacenter to compute cluster to host. One
//! descriptor therefore yields zero or more fact bundles, one per host.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::model::{DeviceDescriptor, DeviceKind, FactBundle, ProbeError};
use crate::probe::traits::ProbeAdapter;

const SESSION_HEADER: &str = "x-inventory-session-id";

const MIB: u64 = 1024 * 1024;

/// TLS and endpoint settings for the management API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HypervisorSettings {
    /// Skip TLS certificate verification. Management endpoints on lab
    /// networks commonly run self-signed certificates.
    pub insecure_tls: bool,
}

/// Probes virtualization hosts through their management endpoint.
#[derive(Debug, Clone, Default)]
pub struct HypervisorProbe {
    settings: HypervisorSettings,
}

#[derive(Debug, Deserialize)]
struct DatacenterSummary {
    id: String,
    #[allow(dead_code)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ClusterSummary {
    id: String,
    #[allow(dead_code)]
    name: String,
}

impl HypervisorProbe {
    pub fn new(settings: HypervisorSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, descriptor: &DeviceDescriptor) -> Result<Client, ProbeError> {
        Client::builder()
            .timeout(descriptor.timeout)
            .danger_accept_invalid_certs(self.settings.insecure_tls)
            .build()
            .map_err(|e| ProbeError::Connect(format!("failed to build HTTP client: {e}")))
    }

    /// Open a session, returning its token.
    async fn login(
        &self,
        client: &Client,
        descriptor: &DeviceDescriptor,
    ) -> Result<String, ProbeError> {
        let url = format!("https://{}/api/session", descriptor.address);
        let response = client
            .post(&url)
            .basic_auth(
                &descriptor.credentials.username,
                Some(&descriptor.credentials.secret),
            )
            .send()
            .await
            .map_err(|e| ProbeError::Connect(format!("{}: {e}", descriptor.address)))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => response
                .json::<String>()
                .await
                .map_err(|e| ProbeError::Protocol(format!("session token undecodable: {e}"))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProbeError::Connect(format!(
                "{}: authentication rejected",
                descriptor.address
            ))),
            status => Err(ProbeError::Protocol(format!(
                "session endpoint returned {status}"
            ))),
        }
    }

    async fn logout(&self, client: &Client, address: &str, token: &str) {
        let url = format!("https://{address}/api/session");
        if let Err(e) = client
            .delete(&url)
            .header(SESSION_HEADER, token)
            .send()
            .await
        {
            tracing::debug!(address = %address, error = %e, "Session delete failed");
        }
    }

    async fn get_json(
        &self,
        client: &Client,
        token: &str,
        url: &str,
    ) -> Result<serde_json::Value, ProbeError> {
        let response = client
            .get(url)
            .header(SESSION_HEADER, token)
            .send()
            .await
            .map_err(|e| ProbeError::Connect(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(ProbeError::Protocol(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProbeError::Protocol(format!("{url}: undecodable body: {e}")))
    }

    /// Walk datacenter → cluster → host, collecting one bundle per host in
    /// traversal order.
    async fn traverse(
        &self,
        client: &Client,
        descriptor: &DeviceDescriptor,
        token: &str,
    ) -> Result<Vec<FactBundle>, ProbeError> {
        let base = format!("https://{}/api", descriptor.address);
        let mut bundles = Vec::new();

        let datacenters: Vec<DatacenterSummary> = serde_json::from_value(
            self.get_json(client, token, &format!("{base}/datacenters")).await?,
        )
        .map_err(|e| ProbeError::Protocol(format!("datacenter list undecodable: {e}")))?;

        for datacenter in &datacenters {
            let clusters: Vec<ClusterSummary> = serde_json::from_value(
                self.get_json(
                    client,
                    token,
                    &format!("{base}/datacenters/{}/clusters", datacenter.id),
                )
                .await?,
            )
            .map_err(|e| ProbeError::Protocol(format!("cluster list undecodable: {e}")))?;

            for cluster in &clusters {
                let hosts = self
                    .get_json(client, token, &format!("{base}/clusters/{}/hosts", cluster.id))
                    .await?;
                let hosts = hosts.as_array().ok_or_else(|| {
                    ProbeError::Protocol("host list is not an array".to_string())
                })?;

                for host in hosts {
                    bundles.push(parse_host_summary(host)?);
                }
            }
        }

        Ok(bundles)
    }
}

#[async_trait]
impl ProbeAdapter for HypervisorProbe {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Hypervisor
    }

    async fn probe(&self, descriptor: &DeviceDescriptor) -> Result<Vec<FactBundle>, ProbeError> {
        tracing::debug!(address = %descriptor.address, "Opening management API session");

        let client = self.build_client(descriptor)?;
        let token = self.login(&client, descriptor).await?;

        // The session is deleted on every exit path, including traversal failure.
        let result = self.traverse(&client, descriptor, &token).await;
        self.logout(&client, &descriptor.address, &token).await;

        match &result {
            Ok(bundles) => tracing::debug!(
                address = %descriptor.address,
                hosts = bundles.len(),
                "Hypervisor inventory traversal complete"
            ),
            Err(e) => tracing::warn!(
                address = %descriptor.address,
                error = %e,
                "Hypervisor probe failed"
            ),
        }

        result
    }
}

/// Decode one host summary into a fact bundle.
///
/// The management vNIC address is optional; memory and product identity are
/// required and their absence is a parse failure.
fn parse_host_summary(host: &serde_json::Value) -> Result<FactBundle, ProbeError> {
    let required_u64 = |key: &str| {
        host.get(key)
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ProbeError::Parse(format!("host summary missing '{key}'")))
    };
    let required_str = |key: &str| {
        host.get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ProbeError::Parse(format!("host summary missing '{key}'")))
    };

    let ip_address = host
        .get("ip_address")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(FactBundle::HypervisorHost {
        ip_address,
        total_memory_bytes: required_u64("memory_size_bytes")?,
        // The endpoint reports usage in MiB; the bundle is byte-denominated.
        used_memory_bytes: required_u64("memory_usage_mib")? * MIB,
        version: required_str("product_version")?,
        build: required_str("product_build")?,
    })
}
