//! Error types for the store adapters and the catalog service

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;
use thiserror::Error;

use crate::model::AssetId;
use crate::service::orphan_ledger::OrphanBlob;

/// Errors raised by the blob and metadata store adapters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transient: the store could not be reached
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// The write was refused (size, type, collision, duplicate id)
    #[error("write rejected: {0}")]
    WriteRejected(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The target of a read or delete is absent
    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Short kind name reported to surfaces
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::StoreUnavailable(_) => "StoreUnavailable",
            StoreError::WriteRejected(_) => "WriteRejected",
            StoreError::PermissionDenied(_) => "PermissionDenied",
            StoreError::NotFound(_) => "NotFound",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::WriteRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "errorKind": self.kind(),
            "message": self.to_string(),
        }))
    }
}

/// Saga step at which a transaction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Blob,
    Metadata,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Blob => f.write_str("blob"),
            Stage::Metadata => f.write_str("metadata"),
        }
    }
}

/// Errors reported by the catalog service and its controllers
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Ingestion failed. A metadata-stage failure leaves the written blob
    /// orphaned; it is carried here and recorded in the orphan ledger.
    #[error("ingest failed at {stage} stage: {source}")]
    IngestFailed {
        stage: Stage,
        #[source]
        source: StoreError,
        orphan: Option<OrphanBlob>,
    },

    /// Deletion failed. `partial` is set when the metadata record is already
    /// gone and only the blob reclamation failed.
    #[error("delete failed at {stage} stage (partial={partial}): {source}")]
    DeleteFailed {
        stage: Stage,
        partial: bool,
        #[source]
        source: StoreError,
        orphan: Option<OrphanBlob>,
    },

    #[error("asset not found: {0}")]
    NotFound(AssetId),

    #[error("unknown gallery session: {0}")]
    UnknownSession(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("no image data was uploaded")]
    EmptyPayload,

    /// Listing the catalog snapshot failed
    #[error("catalog snapshot unavailable: {0}")]
    Snapshot(#[source] StoreError),

    #[error("seed data error: {0}")]
    Seed(String),
}

impl CatalogError {
    /// Kind label used in upload/delete outcomes
    pub fn error_kind(&self) -> String {
        match self {
            CatalogError::IngestFailed { stage, .. } => format!("IngestFailed(stage={})", stage),
            CatalogError::DeleteFailed { stage, partial, .. } => {
                format!("DeleteFailed(stage={}, partial={})", stage, partial)
            }
            CatalogError::NotFound(_) => "NotFound".to_string(),
            CatalogError::UnknownSession(_) => "UnknownSession".to_string(),
            CatalogError::UnknownCategory(_) => "UnknownCategory".to_string(),
            CatalogError::EmptyPayload => "EmptyPayload".to_string(),
            CatalogError::Snapshot(source) => source.kind().to_string(),
            CatalogError::Seed(_) => "Seed".to_string(),
        }
    }

    /// The adapter error underneath a stage failure, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            CatalogError::IngestFailed { source, .. }
            | CatalogError::DeleteFailed { source, .. }
            | CatalogError::Snapshot(source) => Some(source),
            _ => None,
        }
    }

    /// Whether the metadata record is gone even though the call failed
    pub fn is_partial(&self) -> bool {
        matches!(self, CatalogError::DeleteFailed { partial: true, .. })
    }
}

impl ResponseError for CatalogError {
    fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::NotFound(_) | CatalogError::UnknownSession(_) => StatusCode::NOT_FOUND,
            CatalogError::UnknownCategory(_) | CatalogError::EmptyPayload => StatusCode::BAD_REQUEST,
            CatalogError::Seed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            other => other
                .store_error()
                .map(|source| source.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "errorKind": self.error_kind(),
            "message": self.to_string(),
        }))
    }
}
