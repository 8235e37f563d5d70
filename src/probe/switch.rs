//! CLI switch adapter, probing shell-only switches over SSH.
//!
//! - [`SwitchCliProbe`]: the adapter
//! - [`SwitchDialect`]: per-vendor command set and output scraping rules

mod adapter;
mod dialect;

pub use adapter::SwitchCliProbe;
pub use dialect::SwitchDialect;
