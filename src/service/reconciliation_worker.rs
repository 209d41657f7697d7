//! Background reconciliation worker for orphaned blobs
//!
//! Runs periodically, drains a batch from the orphan ledger and retries the
//! blob delete for each entry. A blob is only deleted once the metadata store
//! confirms no record points at it. Entries that keep failing go back on the
//! ledger until they run out of attempts, then stay there as abandoned.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::blob::BlobStore;
use crate::error::StoreError;
use crate::metadata::MetadataStore;
use crate::service::catalog_service::CatalogService;
use crate::service::orphan_ledger::{OrphanBlob, OrphanLedger};

/// Reconciliation settings, the `reconciliation` section of the app config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub enabled: bool,
    /// Seconds between sweeps
    pub interval_secs: u64,
    pub batch_size: usize,
    /// Attempts per orphan before it is marked abandoned
    pub retry_attempts: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            batch_size: 100,
            retry_attempts: 5,
        }
    }
}

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub reclaimed: usize,
    /// Blobs a metadata record still points at; dropped from the ledger
    pub referenced: usize,
    pub requeued: usize,
    pub abandoned: usize,
}

pub struct ReconciliationWorker {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    ledger: Arc<OrphanLedger>,
    batch_size: usize,
    retry_attempts: u32,
    interval: Duration,
}

impl ReconciliationWorker {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        ledger: Arc<OrphanLedger>,
        config: &ReconciliationConfig,
    ) -> Self {
        Self {
            blobs,
            metadata,
            ledger,
            batch_size: config.batch_size.max(1),
            retry_attempts: config.retry_attempts.max(1),
            interval: Duration::from_secs(config.interval_secs.max(1)),
        }
    }

    /// Worker over the stores and ledger of a catalog service
    pub fn for_service(service: &CatalogService, config: &ReconciliationConfig) -> Self {
        Self::new(
            service.blob_store().clone(),
            service.metadata_store().clone(),
            service.orphans().clone(),
            config,
        )
    }

    /// Start the worker as a background task (non-blocking)
    pub fn start_background(self) -> tokio::task::JoinHandle<()> {
        info!("Starting reconciliation worker with {}s interval", self.interval.as_secs());

        tokio::spawn(async move {
            let mut interval = time::interval(self.interval);

            loop {
                interval.tick().await;
                let report = self.process_orphans().await;
                if report != SweepReport::default() {
                    info!(
                        "Reconciliation sweep: reclaimed={}, referenced={}, requeued={}, abandoned={}",
                        report.reclaimed, report.referenced, report.requeued, report.abandoned
                    );
                }
            }
        })
    }

    // A metadata write can land even though the store reported a failure
    async fn still_referenced(&self, orphan: &OrphanBlob) -> Result<bool, StoreError> {
        match self.metadata.get_record(&orphan.asset_id).await {
            Ok(record) => Ok(record.blob_ref == orphan.blob_ref),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run a single sweep over at most one batch of orphans
    pub async fn process_orphans(&self) -> SweepReport {
        let batch = self.ledger.drain_batch(self.batch_size);
        let mut report = SweepReport::default();
        if batch.is_empty() {
            return report;
        }

        debug!("Reconciling {} orphaned blobs", batch.len());
        for orphan in batch {
            match self.still_referenced(&orphan).await {
                Ok(true) => {
                    info!(
                        "Blob {} is referenced by asset {}, dropping it from the ledger",
                        orphan.blob_ref, orphan.asset_id
                    );
                    self.ledger.resolve(&orphan);
                    report.referenced += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    self.retry_later(orphan, e, &mut report);
                    continue;
                }
            }

            match self.blobs.delete_blob(&orphan.blob_ref).await {
                Ok(()) => {
                    info!("Reclaimed orphaned blob {} (asset {})", orphan.blob_ref, orphan.asset_id);
                    self.ledger.resolve(&orphan);
                    report.reclaimed += 1;
                }
                Err(e) if e.is_not_found() => {
                    debug!("Orphaned blob {} already gone", orphan.blob_ref);
                    self.ledger.resolve(&orphan);
                    report.reclaimed += 1;
                }
                Err(e) => self.retry_later(orphan, e, &mut report),
            }
        }

        report
    }

    fn retry_later(&self, orphan: OrphanBlob, e: StoreError, report: &mut SweepReport) {
        let orphan = OrphanBlob {
            attempts: orphan.attempts + 1,
            ..orphan
        };
        if orphan.attempts >= self.retry_attempts {
            error!(
                "Giving up on orphaned blob {} after {} attempts: {}",
                orphan.blob_ref, orphan.attempts, e
            );
            self.ledger.abandon(orphan);
            report.abandoned += 1;
        } else {
            warn!(
                "Failed to reclaim orphaned blob {} (attempt {}): {}",
                orphan.blob_ref, orphan.attempts, e
            );
            self.ledger.record(orphan);
            report.requeued += 1;
        }
    }
}
