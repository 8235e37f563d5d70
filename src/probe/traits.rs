//! Core probe adapter trait.

use async_trait::async_trait;

use crate::model::{DeviceDescriptor, DeviceKind, FactBundle, ProbeError};

/// Contract for polling one device kind.
///
/// An adapter owns the full probe lifecycle for its kind: open a session
/// over the device's native transport, issue the kind-specific queries,
/// parse the output, and release the session on every exit path.
///
/// # Routing
///
/// The engine only hands an adapter descriptors whose `kind` matches
/// [`ProbeAdapter::kind`]; a mismatched kind is an engine routing bug, not a
/// runtime condition adapters defend against.
///
/// # Cardinality
///
/// Most kinds map one descriptor to exactly one [`FactBundle`]. The
/// hypervisor adapter traverses a hierarchical inventory and may return zero
/// or more bundles per descriptor, which is why the contract returns a `Vec`.
#[async_trait]
pub trait ProbeAdapter: Send + Sync + 'static {
    /// The device kind this adapter handles.
    fn kind(&self) -> DeviceKind;

    /// Run one probe round-trip against the descriptor's target.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] on transport, parse, or protocol failure.
    /// All failures are per-device; the engine downgrades them to
    /// placeholder records without aborting the batch.
    async fn probe(&self, descriptor: &DeviceDescriptor) -> Result<Vec<FactBundle>, ProbeError>;
}
