//! Configuration module for the fleet snapshot application.
//!
//! Provides YAML-based application configuration and CSV-based fleet
//! loading:
//! - Engine settings (concurrency, default probe timeout)
//! - Adapter settings (switch dialect, console tunnel, hypervisor TLS)
//! - Report output settings
//! - Fleet files (one device per row, forgiving header aliases)

mod app;
mod fleet;
mod validation;

pub use app::{AppConfig, EngineConfig, ReportConfig, SwitchConfig};
pub use fleet::{FleetDefaults, load_fleet};
pub use validation::{ConfigError, expand_env_vars, parse_duration};
