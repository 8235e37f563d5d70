//! Fleetsnap - Fleet Inventory Snapshot Library
//!
//! This crate collects point-in-time inventory snapshots from heterogeneous
//! infrastructure devices and renders them as a static HTML report. It can
//! be used as a library by other Rust projects, or run as a standalone
//! binary with the `fleetsnap` executable.
//!
//! # Architecture
//!
//! - **Model**: Device descriptors, fact bundles, and normalized records
//! - **Probes**: Per-kind adapters (switch CLI over SSH, BMC via console
//!   tunnel, hypervisor management API)
//! - **Engine**: Bounded-concurrency collection with deterministic ordering,
//!   per-device fault isolation, and cooperative cancellation
//! - **Config**: YAML application settings and CSV fleet files
//! - **Report**: Askama-templated HTML output
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetsnap::config::{AppConfig, FleetDefaults, load_fleet};
//! use fleetsnap::report::{HtmlReport, ReportSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("configs/config.yaml")?;
//!     let fleet = load_fleet("fleet.csv", &FleetDefaults {
//!         kind: None,
//!         timeout: config.engine.default_timeout,
//!     })?;
//!
//!     let engine = config.build_engine()?;
//!     let results = engine.collect(&fleet).await?;
//!
//!     let report = HtmlReport::new(&config.report.output_path, &config.report.title);
//!     report.write(&results)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod model;
pub mod probe;
pub mod report;

pub use engine::{CancelSource, CancelToken, EngineBuilder, EngineError, InventoryEngine};
pub use model::{
    Credentials, DeviceDescriptor, DeviceKind, FactBundle, NormalizedRecord, ProbeError, ResultSet,
};
pub use probe::ProbeAdapter;
