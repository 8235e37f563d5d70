//! Core data model for fleet inventory collection.
//!
//! - [`DeviceDescriptor`]: one polling target (address, kind, credentials)
//! - [`FactBundle`]: kind-specific facts extracted from a successful probe
//! - [`NormalizedRecord`]: flattened, placeholder-filled, report-ready row
//! - [`ResultSet`]: ordered collection of records for one collection run

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical placeholder for any absent or failed field.
///
/// Report sinks rely on this exact string; it is never substituted with an
/// empty string or a missing key.
pub const PLACEHOLDER: &str = "Not Accessible";

/// Default per-device probe timeout (5 seconds).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

fn default_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}

/// Device kind, selecting the probe adapter and report column set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    /// Network switch polled over an SSH shell session.
    SwitchCli,
    /// Server baseboard management controller, queried through a management
    /// console tunnel.
    ServerBmc,
    /// Virtualization host reached via its management API; one descriptor
    /// may yield facts for several hosts.
    Hypervisor,
}

impl DeviceKind {
    /// Report column labels for this kind, in render order.
    ///
    /// Every [`NormalizedRecord`] of a kind carries exactly this field set.
    pub fn field_labels(&self) -> &'static [&'static str] {
        match self {
            Self::SwitchCli => &["Model", "OS Version", "Switch Name", "Hardware Type"],
            Self::ServerBmc => &["Firmware Version", "BIOS Version"],
            Self::Hypervisor => &[
                "IP Address",
                "Total Memory (GiB)",
                "Used Memory (GiB)",
                "Free Memory (GiB)",
                "Version",
                "Build",
            ],
        }
    }

    /// Human-readable kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SwitchCli => "switch-cli",
            Self::ServerBmc => "server-bmc",
            Self::Hypervisor => "hypervisor",
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "switch" | "switch-cli" | "switchcli" => Ok(Self::SwitchCli),
            "bmc" | "server-bmc" | "serverbmc" => Ok(Self::ServerBmc),
            "hypervisor" | "esxi" | "host" => Ok(Self::Hypervisor),
            other => Err(format!("unknown device kind: '{other}'")),
        }
    }
}

/// Transport credentials, passed through verbatim to the adapter.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Immutable record of one polling target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Target address (IP or hostname).
    pub address: String,
    /// Declared device kind.
    pub kind: DeviceKind,
    /// Credentials for the device's native transport.
    pub credentials: Credentials,
    /// Per-probe timeout (default: 5s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl DeviceDescriptor {
    /// Create a descriptor with the default probe timeout.
    pub fn new(address: impl Into<String>, kind: DeviceKind, credentials: Credentials) -> Self {
        Self {
            address: address.into(),
            kind,
            credentials,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Set the probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Kind-specific facts extracted from a successful probe.
///
/// Each variant declares a fixed field set; optional fields are those some
/// dialects or targets legitimately omit. A dialect's documented required
/// tokens missing from output is a parse failure, never a partial success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FactBundle {
    Switch {
        /// Model identification line; some CLI dialects do not report one.
        model: Option<String>,
        os_version: String,
        /// Configured switch name, where the dialect exposes it.
        name: Option<String>,
        hardware_type: Option<String>,
    },
    Bmc {
        firmware_version: String,
        bios_version: String,
    },
    HypervisorHost {
        /// Management vNIC address; absent on some vNIC configurations.
        ip_address: Option<String>,
        total_memory_bytes: u64,
        used_memory_bytes: u64,
        version: String,
        build: String,
    },
}

impl FactBundle {
    /// The device kind this bundle belongs to.
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Switch { .. } => DeviceKind::SwitchCli,
            Self::Bmc { .. } => DeviceKind::ServerBmc,
            Self::HypervisorHost { .. } => DeviceKind::Hypervisor,
        }
    }

    /// Project the bundle into the flat report field set for its kind.
    ///
    /// Absent optional fields render as [`PLACEHOLDER`]. Memory values use
    /// the binary (1024-based) convention, GiB with two decimals.
    fn project(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        match self {
            Self::Switch {
                model,
                os_version,
                name,
                hardware_type,
            } => {
                fields.insert("Model".into(), or_placeholder(model.as_deref()));
                fields.insert("OS Version".into(), os_version.clone());
                fields.insert("Switch Name".into(), or_placeholder(name.as_deref()));
                fields.insert(
                    "Hardware Type".into(),
                    or_placeholder(hardware_type.as_deref()),
                );
            }
            Self::Bmc {
                firmware_version,
                bios_version,
            } => {
                fields.insert("Firmware Version".into(), firmware_version.clone());
                fields.insert("BIOS Version".into(), bios_version.clone());
            }
            Self::HypervisorHost {
                ip_address,
                total_memory_bytes,
                used_memory_bytes,
                version,
                build,
            } => {
                let free = total_memory_bytes.saturating_sub(*used_memory_bytes);
                fields.insert("IP Address".into(), or_placeholder(ip_address.as_deref()));
                fields.insert("Total Memory (GiB)".into(), format_gib(*total_memory_bytes));
                fields.insert("Used Memory (GiB)".into(), format_gib(*used_memory_bytes));
                fields.insert("Free Memory (GiB)".into(), format_gib(free));
                fields.insert("Version".into(), version.clone());
                fields.insert("Build".into(), build.clone());
            }
        }
        fields
    }
}

fn or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

fn format_gib(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_GIB)
}

/// Errors a probe can fail with. All are per-device and recoverable at the
/// batch level: they downgrade one record, never abort collection.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "detail", rename_all = "kebab-case")]
pub enum ProbeError {
    /// Transport or authentication failure.
    #[error("connect error: {0}")]
    Connect(String),

    /// The descriptor's probe timeout elapsed.
    #[error("probe timed out: {0}")]
    Timeout(String),

    /// Expected structure absent from otherwise readable output.
    #[error("parse error: {0}")]
    Parse(String),

    /// Malformed response payload.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No adapter registered for the descriptor's kind.
    #[error("unsupported device kind: {0}")]
    Unsupported(String),

    /// The batch was cancelled before this probe completed.
    #[error("probe cancelled")]
    Cancelled,
}

/// Error taxonomy, detached from messages, for matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Connect,
    Timeout,
    Parse,
    Protocol,
    Unsupported,
    Cancelled,
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect(_) => ErrorKind::Connect,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Flattened, report-ready projection of one probe result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Address of the source descriptor.
    pub address: String,
    /// Kind of the source descriptor.
    pub kind: DeviceKind,
    /// Flat field mapping; keys are exactly `kind.field_labels()`.
    pub fields: BTreeMap<String, String>,
    /// Whether the probe succeeded.
    pub ok: bool,
    /// Failure detail when `ok` is false.
    pub error: Option<ProbeError>,
}

impl NormalizedRecord {
    /// Build a success record from a fact bundle.
    pub fn from_facts(address: impl Into<String>, bundle: &FactBundle) -> Self {
        Self {
            address: address.into(),
            kind: bundle.kind(),
            fields: bundle.project(),
            ok: true,
            error: None,
        }
    }

    /// Synthesize a failure record: every field of the kind's label set is
    /// the placeholder string.
    pub fn failed(address: impl Into<String>, kind: DeviceKind, error: ProbeError) -> Self {
        let fields = kind
            .field_labels()
            .iter()
            .map(|label| (label.to_string(), PLACEHOLDER.to_string()))
            .collect();
        Self {
            address: address.into(),
            kind,
            fields,
            ok: false,
            error: Some(error),
        }
    }
}

/// Ordered collection of normalized records, one collection run's output.
///
/// Order matches input descriptor order; a hypervisor descriptor contributes
/// its hosts contiguously at its input position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    records: Vec<NormalizedRecord>,
}

impl ResultSet {
    pub fn new(records: Vec<NormalizedRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedRecord> {
        self.records.iter()
    }

    /// Number of failed records.
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| !r.ok).count()
    }
}

impl IntoIterator for ResultSet {
    type Item = NormalizedRecord;
    type IntoIter = std::vec::IntoIter<NormalizedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("switch".parse::<DeviceKind>().ok(), Some(DeviceKind::SwitchCli));
        assert_eq!("Switch-CLI".parse::<DeviceKind>().ok(), Some(DeviceKind::SwitchCli));
        assert_eq!("bmc".parse::<DeviceKind>().ok(), Some(DeviceKind::ServerBmc));
        assert_eq!("esxi".parse::<DeviceKind>().ok(), Some(DeviceKind::Hypervisor));
        assert!("toaster".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("admin", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_switch_projection_fills_optional_fields() {
        let bundle = FactBundle::Switch {
            model: None,
            os_version: "v9.1.1c".to_string(),
            name: Some("edge-sw-01".to_string()),
            hardware_type: None,
        };
        let record = NormalizedRecord::from_facts("10.0.0.1", &bundle);

        assert!(record.ok);
        assert_eq!(record.fields["OS Version"], "v9.1.1c");
        assert_eq!(record.fields["Switch Name"], "edge-sw-01");
        assert_eq!(record.fields["Model"], PLACEHOLDER);
        assert_eq!(record.fields["Hardware Type"], PLACEHOLDER);
        // Exactly the kind's label set, nothing extra
        assert_eq!(record.fields.len(), DeviceKind::SwitchCli.field_labels().len());
    }

    #[test]
    fn test_failed_record_is_all_placeholders() {
        let record = NormalizedRecord::failed(
            "10.0.0.9",
            DeviceKind::Hypervisor,
            ProbeError::Connect("connection refused".to_string()),
        );

        assert!(!record.ok);
        assert_eq!(record.error.as_ref().map(ProbeError::kind), Some(ErrorKind::Connect));
        for label in DeviceKind::Hypervisor.field_labels() {
            assert_eq!(record.fields[*label], PLACEHOLDER, "field {label}");
        }
    }

    #[test]
    fn test_hypervisor_memory_binary_gib() {
        let bundle = FactBundle::HypervisorHost {
            ip_address: Some("172.16.4.10".to_string()),
            total_memory_bytes: 64 * 1024 * 1024 * 1024,
            used_memory_bytes: 16 * 1024 * 1024 * 1024,
            version: "8.0.2".to_string(),
            build: "22380479".to_string(),
        };
        let record = NormalizedRecord::from_facts("vc.lab", &bundle);

        assert_eq!(record.fields["Total Memory (GiB)"], "64.00");
        assert_eq!(record.fields["Used Memory (GiB)"], "16.00");
        assert_eq!(record.fields["Free Memory (GiB)"], "48.00");
    }

    #[test]
    fn test_hypervisor_missing_ip_is_placeholder() {
        let bundle = FactBundle::HypervisorHost {
            ip_address: None,
            total_memory_bytes: 1024,
            used_memory_bytes: 0,
            version: "7.0.3".to_string(),
            build: "20036589".to_string(),
        };
        let record = NormalizedRecord::from_facts("vc.lab", &bundle);
        assert!(record.ok);
        assert_eq!(record.fields["IP Address"], PLACEHOLDER);
    }

    #[test]
    fn test_probe_error_kinds() {
        assert_eq!(ProbeError::Timeout("5s".into()).kind(), ErrorKind::Timeout);
        assert_eq!(ProbeError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            ProbeError::Parse("missing token".into()).kind(),
            ErrorKind::Parse
        );
    }
}
