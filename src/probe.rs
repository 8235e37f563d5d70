//! Probe Adapter Layer
//!
//! One adapter per device kind hides that kind's transport and command
//! dialect behind a single contract: open a scoped session, run the
//! kind-specific queries, and return fact bundles or a typed failure.
//!
//! # Architecture
//!
//! - [`ProbeAdapter`]: core trait the engine routes descriptors through
//! - [`switch::SwitchCliProbe`]: CLI switches over an SSH shell session
//! - [`bmc::BmcProbe`]: server BMCs via a management-console tunnel
//! - [`hypervisor::HypervisorProbe`]: virtualization hosts via a
//!   management API, yielding zero or more bundles per session
//!
//! Vendor output scraping is deliberately confined to this layer: each
//! dialect owns one pure parsing function, unit-tested against captured
//! sample output, so brittleness never leaks into the engine or report sink.

pub mod bmc;
pub mod hypervisor;
mod ssh;
pub mod switch;
mod traits;

pub use ssh::SshSession;
pub use traits::ProbeAdapter;
