//! Inventory collection engine.
//!
//! Drives a batch of device descriptors to completion through the matching
//! probe adapters with strict fault isolation: no single device's failure
//! aborts or corrupts the batch.
//!
//! # Ordering
//!
//! Probes run concurrently (bounded by the configured limit) and complete in
//! arbitrary order, but results are assembled by descriptor index, so the
//! returned [`ResultSet`] always follows input order.
//!
//! # Cancellation
//!
//! A [`CancelSource`] cancels a whole batch cooperatively: completed records
//! are preserved, in-flight probes are dropped (closing their sessions) and
//! recorded as `Cancelled` failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{Semaphore, watch};
use tokio::time::timeout;

use crate::model::{DeviceDescriptor, DeviceKind, NormalizedRecord, ProbeError, ResultSet};
use crate::probe::ProbeAdapter;

/// Default concurrency bound for in-flight probes.
///
/// The source tooling polled sequentially or unbounded; a bound keeps a
/// large fleet from exhausting outbound connections.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Construction-time engine errors.
///
/// These are the only fatal errors in the collection path; everything that
/// happens after network activity begins is per-device and recoverable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Concurrency bound of zero would deadlock the batch.
    #[error("concurrency bound must be non-zero")]
    ZeroConcurrency,

    /// An engine without adapters cannot route anything.
    #[error("no probe adapter registered")]
    NoAdapters,

    /// No descriptor kind in the submitted fleet has a registered adapter.
    #[error("no adapter registered for any device kind in the fleet")]
    UnroutableFleet,
}

/// Cancels a collection batch. Create one per run and keep it on the
/// caller's side (e.g. wired to a process interrupt handler).
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Hand out a token observing this source.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Request cancellation of the batch.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation token held by in-flight probes.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested. Never resolves if the source
    /// is dropped without cancelling.
    pub async fn cancelled(mut self) {
        if *self.rx.borrow() {
            return;
        }
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

/// Builder for [`InventoryEngine`].
pub struct EngineBuilder {
    concurrency: usize,
    adapters: HashMap<DeviceKind, Arc<dyn ProbeAdapter>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            adapters: HashMap::new(),
        }
    }

    /// Set the concurrency bound (default: 16, must be non-zero).
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Register an adapter for its kind. A later registration for the same
    /// kind replaces the earlier one.
    pub fn register(mut self, adapter: Arc<dyn ProbeAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    /// Validate the configuration and build the engine.
    ///
    /// # Errors
    /// Returns [`EngineError`] on a zero concurrency bound or an empty
    /// adapter set.
    pub fn build(self) -> Result<InventoryEngine, EngineError> {
        if self.concurrency == 0 {
            return Err(EngineError::ZeroConcurrency);
        }
        if self.adapters.is_empty() {
            return Err(EngineError::NoAdapters);
        }
        Ok(InventoryEngine {
            concurrency: self.concurrency,
            adapters: self.adapters,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls a batch of descriptors through the registered adapters and
/// assembles a deterministic, fault-isolated [`ResultSet`].
pub struct InventoryEngine {
    concurrency: usize,
    adapters: HashMap<DeviceKind, Arc<dyn ProbeAdapter>>,
}

impl std::fmt::Debug for InventoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryEngine")
            .field("concurrency", &self.concurrency)
            .field("kinds", &self.adapters.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl InventoryEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Collect the fleet without external cancellation.
    pub async fn collect(&self, descriptors: &[DeviceDescriptor]) -> Result<ResultSet, EngineError> {
        self.collect_with_cancel(descriptors, CancelSource::new().token())
            .await
    }

    /// Collect the fleet, observing a cancellation token.
    ///
    /// One record per descriptor in input order (a hypervisor descriptor
    /// contributes its N hosts contiguously at its position). Per-device
    /// failures become placeholder records; they never propagate.
    ///
    /// # Errors
    /// Returns [`EngineError::UnroutableFleet`], before any network
    /// activity, when no descriptor kind has a registered adapter.
    pub async fn collect_with_cancel(
        &self,
        descriptors: &[DeviceDescriptor],
        cancel: CancelToken,
    ) -> Result<ResultSet, EngineError> {
        if descriptors.is_empty() {
            return Ok(ResultSet::default());
        }

        if !descriptors
            .iter()
            .any(|d| self.adapters.contains_key(&d.kind))
        {
            return Err(EngineError::UnroutableFleet);
        }

        let started = Instant::now();
        tracing::info!(
            fleet_size = descriptors.len(),
            concurrency = self.concurrency,
            "Starting collection run"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors.iter().cloned() {
            let adapter = self.adapters.get(&descriptor.kind).cloned();
            let semaphore = Arc::clone(&semaphore);
            let token = cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    // Semaphore lives for the whole batch; closure is unreachable.
                    Err(_) => return cancelled_records(&descriptor),
                };
                run_probe(adapter, &descriptor, token).await
            }));
        }

        // Joining in submission order is the synchronized append-by-index:
        // completion timing never affects output order.
        let mut records = Vec::with_capacity(descriptors.len());
        for (handle, descriptor) in handles.into_iter().zip(descriptors) {
            match handle.await {
                Ok(probe_records) => records.extend(probe_records),
                Err(e) => {
                    tracing::error!(
                        address = %descriptor.address,
                        error = %e,
                        "Probe task aborted"
                    );
                    records.push(NormalizedRecord::failed(
                        &descriptor.address,
                        descriptor.kind,
                        ProbeError::Protocol(format!("probe task aborted: {e}")),
                    ));
                }
            }
        }

        let set = ResultSet::new(records);
        tracing::info!(
            records = set.len(),
            failures = set.failure_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Collection run complete"
        );
        Ok(set)
    }
}

fn cancelled_records(descriptor: &DeviceDescriptor) -> Vec<NormalizedRecord> {
    vec![NormalizedRecord::failed(
        &descriptor.address,
        descriptor.kind,
        ProbeError::Cancelled,
    )]
}

/// Run one probe with timeout and cancellation, normalizing the outcome.
async fn run_probe(
    adapter: Option<Arc<dyn ProbeAdapter>>,
    descriptor: &DeviceDescriptor,
    cancel: CancelToken,
) -> Vec<NormalizedRecord> {
    let Some(adapter) = adapter else {
        tracing::warn!(
            address = %descriptor.address,
            kind = %descriptor.kind,
            "No adapter registered for descriptor kind"
        );
        return vec![NormalizedRecord::failed(
            &descriptor.address,
            descriptor.kind,
            ProbeError::Unsupported(descriptor.kind.to_string()),
        )];
    };

    if cancel.is_cancelled() {
        return cancelled_records(descriptor);
    }

    let outcome = tokio::select! {
        _ = cancel.clone().cancelled() => Err(ProbeError::Cancelled),
        result = timeout(descriptor.timeout, adapter.probe(descriptor)) => match result {
            Ok(Ok(bundles)) => Ok(bundles),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProbeError::Timeout(format!(
                "{} elapsed",
                humantime::format_duration(descriptor.timeout)
            ))),
        },
    };

    match outcome {
        Ok(bundles) => {
            tracing::debug!(
                address = %descriptor.address,
                bundles = bundles.len(),
                "Probe successful"
            );
            bundles
                .iter()
                .map(|bundle| NormalizedRecord::from_facts(&descriptor.address, bundle))
                .collect()
        }
        Err(e) => {
            tracing::warn!(address = %descriptor.address, error = %e, "Probe failed");
            vec![NormalizedRecord::failed(
                &descriptor.address,
                descriptor.kind,
                e,
            )]
        }
    }
}
