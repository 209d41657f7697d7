//! Catalog write path: the two-store sagas and the orphan bookkeeping
//! around them.

pub mod catalog_service;
pub mod orphan_ledger;
pub mod reconciliation_worker;


pub use catalog_service::CatalogService;
pub use orphan_ledger::{OrphanBlob, OrphanCause, OrphanJournal, OrphanLedger, OrphanStatus};
pub use reconciliation_worker::{ReconciliationConfig, ReconciliationWorker, SweepReport};
