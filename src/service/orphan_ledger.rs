//! Orphan ledger
//!
//! Partial saga failures leave blobs that no metadata record references.
//! Instead of swallowing those, the catalog service records each one here so
//! the reconciliation worker (or an operator) can sweep them later.
//!
//! Entries the worker gives up on stay in the ledger as `Abandoned` so they
//! remain visible. With a journal attached, every change is written through
//! and the ledger is restored from it on startup.

use chrono::{DateTime, SubsecRound, Utc};
use log::{info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::model::{AssetId, BlobRef};

/// Why a blob became unreferenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrphanCause {
    /// Blob written, metadata write failed
    IngestMetadataFailed,
    /// Metadata deleted, blob delete failed
    DeleteBlobFailed,
}

impl OrphanCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrphanCause::IngestMetadataFailed => "IngestMetadataFailed",
            OrphanCause::DeleteBlobFailed => "DeleteBlobFailed",
        }
    }
}

impl FromStr for OrphanCause {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IngestMetadataFailed" => Ok(OrphanCause::IngestMetadataFailed),
            "DeleteBlobFailed" => Ok(OrphanCause::DeleteBlobFailed),
            _ => Err(format!("Unknown orphan cause: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrphanStatus {
    /// Waiting for the next sweep
    Pending,
    /// Out of retries, left for an operator
    Abandoned,
}

impl OrphanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrphanStatus::Pending => "Pending",
            OrphanStatus::Abandoned => "Abandoned",
        }
    }
}

impl FromStr for OrphanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrphanStatus::Pending),
            "Abandoned" => Ok(OrphanStatus::Abandoned),
            _ => Err(format!("Unknown orphan status: {}", s)),
        }
    }
}

/// A blob that no metadata record references
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanBlob {
    pub blob_ref: BlobRef,
    /// The asset the blob was written for (ingest) or belonged to (delete)
    pub asset_id: AssetId,
    pub cause: OrphanCause,
    pub status: OrphanStatus,
    pub detected_at: DateTime<Utc>,
    /// Reclamation attempts made so far
    pub attempts: u32,
}

impl OrphanBlob {
    pub fn new(blob_ref: BlobRef, asset_id: AssetId, cause: OrphanCause) -> Self {
        Self {
            blob_ref,
            asset_id,
            cause,
            status: OrphanStatus::Pending,
            detected_at: Utc::now().trunc_subsecs(6),
            attempts: 0,
        }
    }
}

/// Durable copy of the ledger, keyed by blob reference
pub trait OrphanJournal: Send + Sync {
    /// Insert or update the entry for `orphan.blob_ref`
    fn save_orphan(&self, orphan: &OrphanBlob) -> Result<(), StoreError>;

    /// Forget the entry for `blob_ref`; absent entries are not an error
    fn remove_orphan(&self, blob_ref: &str) -> Result<(), StoreError>;

    /// Every entry in detection order
    fn load_orphans(&self) -> Result<Vec<OrphanBlob>, StoreError>;
}

#[derive(Default)]
struct LedgerEntries {
    pending: VecDeque<OrphanBlob>,
    abandoned: Vec<OrphanBlob>,
}

/// FIFO of orphaned blobs awaiting reconciliation
#[derive(Default)]
pub struct OrphanLedger {
    entries: Mutex<LedgerEntries>,
    journal: Option<Arc<dyn OrphanJournal>>,
}

impl OrphanLedger {
    /// Memory-only ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger backed by `journal`, restored from what it already holds
    pub fn with_journal(journal: Arc<dyn OrphanJournal>) -> Result<Self, StoreError> {
        let mut entries = LedgerEntries::default();
        for orphan in journal.load_orphans()? {
            match orphan.status {
                OrphanStatus::Pending => entries.pending.push_back(orphan),
                OrphanStatus::Abandoned => entries.abandoned.push(orphan),
            }
        }
        if !entries.pending.is_empty() || !entries.abandoned.is_empty() {
            info!(
                "Restored orphan ledger: {} pending, {} abandoned",
                entries.pending.len(),
                entries.abandoned.len()
            );
        }
        Ok(Self {
            entries: Mutex::new(entries),
            journal: Some(journal),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LedgerEntries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // The in-memory ledger stays authoritative if the journal is down
    fn persist(&self, orphan: &OrphanBlob) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.save_orphan(orphan) {
                warn!("Failed to journal orphaned blob {}: {}", orphan.blob_ref, e);
            }
        }
    }

    /// Queue an orphan for the next sweep
    pub fn record(&self, orphan: OrphanBlob) {
        let orphan = OrphanBlob {
            status: OrphanStatus::Pending,
            ..orphan
        };
        self.persist(&orphan);
        self.lock().pending.push_back(orphan);
    }

    /// Take up to `limit` pending entries from the front of the ledger.
    /// Journal entries stay until the orphan is resolved or requeued.
    pub fn drain_batch(&self, limit: usize) -> Vec<OrphanBlob> {
        let mut entries = self.lock();
        let take = limit.min(entries.pending.len());
        entries.pending.drain(..take).collect()
    }

    /// Drop a drained orphan for good: its blob is gone or referenced again
    pub fn resolve(&self, orphan: &OrphanBlob) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.remove_orphan(&orphan.blob_ref) {
                warn!("Failed to clear journaled orphan {}: {}", orphan.blob_ref, e);
            }
        }
    }

    /// Park a drained orphan that ran out of retries
    pub fn abandon(&self, orphan: OrphanBlob) {
        let orphan = OrphanBlob {
            status: OrphanStatus::Abandoned,
            ..orphan
        };
        self.persist(&orphan);
        self.lock().abandoned.push(orphan);
    }

    /// Pending entries in queue order, then abandoned ones
    pub fn snapshot(&self) -> Vec<OrphanBlob> {
        let entries = self.lock();
        entries.pending.iter().chain(entries.abandoned.iter()).cloned().collect()
    }

    pub fn abandoned(&self) -> Vec<OrphanBlob> {
        self.lock().abandoned.clone()
    }

    /// Number of entries awaiting a sweep
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
