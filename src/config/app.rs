//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{DEFAULT_CONCURRENCY, EngineBuilder, InventoryEngine};
use crate::model::DEFAULT_PROBE_TIMEOUT;
use crate::probe::bmc::{BmcProbe, ConsoleConfig};
use crate::probe::hypervisor::{HypervisorProbe, HypervisorSettings};
use crate::probe::switch::{SwitchCliProbe, SwitchDialect};

use super::validation::{ConfigError, expand_env_vars};

fn default_output_path() -> PathBuf {
    PathBuf::from("fleet_report.html")
}

fn default_report_title() -> String {
    "Fleet Inventory Report".to_string()
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Collection engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum concurrent probes (default: 16).
    pub concurrency: usize,

    /// Probe timeout applied to descriptors without their own (default: 5s).
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            default_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

// =============================================================================
// Switch Configuration
// =============================================================================

/// Switch CLI adapter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// CLI dialect for the fleet's switches (default: brocade).
    pub dialect: SwitchDialect,
}

// =============================================================================
// Report Configuration
// =============================================================================

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output file path (default: "fleet_report.html").
    pub output_path: PathBuf,

    /// Report page title.
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            title: default_report_title(),
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
///
/// Every section is optional with working defaults, except the console:
/// BMC descriptors cannot be routed without one, so a fleet containing them
/// requires the `console` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Collection engine configuration.
    pub engine: EngineConfig,

    /// Switch CLI adapter configuration.
    pub switch: SwitchConfig,

    /// Management console the BMC queries tunnel through.
    pub console: Option<ConsoleConfig>,

    /// Hypervisor management API configuration.
    pub hypervisor: HypervisorSettings,

    /// Report output configuration.
    pub report: ReportConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded from the
    /// environment before parsing, so credentials can stay out of the file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&expand_env_vars(&content))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "engine concurrency must be positive".to_string(),
            ));
        }

        if self.engine.default_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "engine default_timeout must be positive".to_string(),
            ));
        }

        if let Some(console) = &self.console {
            if console.address.is_empty() {
                return Err(ConfigError::ValidationError(
                    "console address must not be empty".to_string(),
                ));
            }
            if console.api_port == 0 {
                return Err(ConfigError::ValidationError(
                    "console api_port must be non-zero".to_string(),
                ));
            }
        }

        if self.report.output_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "report output_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the inventory engine with one adapter per configured kind.
    ///
    /// The BMC adapter is registered only when a console is configured; the
    /// switch and hypervisor adapters are always available.
    pub fn build_engine(&self) -> Result<InventoryEngine, crate::engine::EngineError> {
        let mut builder = EngineBuilder::new()
            .concurrency(self.engine.concurrency)
            .register(Arc::new(SwitchCliProbe::new(self.switch.dialect)))
            .register(Arc::new(HypervisorProbe::new(self.hypervisor.clone())));

        if let Some(console) = &self.console {
            builder = builder.register(Arc::new(BmcProbe::new(console.clone())));
        }

        builder.build()
    }
}
