//! SQLite implementation of MetadataStore

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::metadata::MetadataStore;
use crate::model::MediaAsset;
use crate::service::orphan_ledger::{OrphanBlob, OrphanCause, OrphanJournal, OrphanStatus};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS media_assets (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    category TEXT NOT NULL,
    blob_ref TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

const CREATE_ORPHAN_TABLE: &str = "CREATE TABLE IF NOT EXISTS orphan_blobs (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    blob_ref TEXT NOT NULL UNIQUE,
    asset_id TEXT NOT NULL,
    cause TEXT NOT NULL,
    status TEXT NOT NULL,
    detected_at TEXT NOT NULL,
    attempts INTEGER NOT NULL
)";

fn map_sqlite_error(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => StoreError::WriteRejected(e.to_string()),
            ErrorCode::ReadOnly | ErrorCode::PermissionDenied | ErrorCode::AuthorizationForStatementDenied => {
                StoreError::PermissionDenied(e.to_string())
            }
            _ => StoreError::StoreUnavailable(e.to_string()),
        },
        _ => StoreError::StoreUnavailable(e.to_string()),
    }
}

// Fixed-width timestamps so that text order is chronological order
fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_row(id: String, category: String, blob_ref: String, created_at: String) -> Result<MediaAsset, StoreError> {
    let category = category
        .parse()
        .map_err(|_| StoreError::StoreUnavailable(format!("corrupt record {}: category {}", id, category)))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StoreError::StoreUnavailable(format!("corrupt record {}: {}", id, e)))?
        .with_timezone(&Utc);
    Ok(MediaAsset {
        id,
        category,
        blob_ref,
        created_at,
    })
}

type OrphanRow = (String, String, String, String, String, u32);

fn decode_orphan((blob_ref, asset_id, cause, status, detected_at, attempts): OrphanRow) -> Result<OrphanBlob, StoreError> {
    let corrupt = |detail: String| StoreError::StoreUnavailable(format!("corrupt orphan entry {}: {}", blob_ref, detail));
    let cause = cause.parse::<OrphanCause>().map_err(corrupt)?;
    let status = status.parse::<OrphanStatus>().map_err(corrupt)?;
    let detected_at = DateTime::parse_from_rfc3339(&detected_at)
        .map_err(|e| corrupt(e.to_string()))?
        .with_timezone(&Utc);
    Ok(OrphanBlob {
        blob_ref,
        asset_id,
        cause,
        status,
        detected_at,
        attempts,
    })
}

/// SQLite implementation of MetadataStore
pub struct SQLiteMetadataStore {
    conn: Mutex<Connection>,
}

impl SQLiteMetadataStore {
    /// Open (or create) the database file at `db_path`
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::StoreUnavailable(format!("{}: {}", db_path, e)))?;
            }
        }
        let conn = Connection::open(db_path).map_err(map_sqlite_error)?;
        info!("Opened SQLite metadata store at {}", db_path);
        Self::with_connection(conn)
    }

    /// Private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE, []).map_err(map_sqlite_error)?;
        conn.execute(CREATE_ORPHAN_TABLE, []).map_err(map_sqlite_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::StoreUnavailable("metadata connection poisoned".to_string()))
    }
}

#[async_trait]
impl MetadataStore for SQLiteMetadataStore {
    async fn put_record(&self, record: &MediaAsset) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO media_assets (id, category, blob_ref, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.category.label(),
                record.blob_ref,
                encode_timestamp(&record.created_at)
            ],
        )
        .map_err(map_sqlite_error)?;
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<MediaAsset, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, category, blob_ref, created_at FROM media_assets WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(map_sqlite_error)?;

        match row {
            Some((id, category, blob_ref, created_at)) => decode_row(id, category, blob_ref, created_at),
            None => {
                warn!("Record does not exist: {}", id);
                Err(StoreError::NotFound(format!("no record with id {}", id)))
            }
        }
    }

    async fn delete_record(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM media_assets WHERE id = ?1", params![id])
            .map_err(map_sqlite_error)?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("no record with id {}", id)));
        }
        Ok(())
    }

    async fn list_all_records(&self) -> Result<Vec<MediaAsset>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, category, blob_ref, created_at FROM media_assets ORDER BY created_at, seq")
            .map_err(map_sqlite_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(map_sqlite_error)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, category, blob_ref, created_at) = row.map_err(map_sqlite_error)?;
            records.push(decode_row(id, category, blob_ref, created_at)?);
        }
        Ok(records)
    }
}

/// Orphan journal kept in the same database as the records
impl OrphanJournal for SQLiteMetadataStore {
    fn save_orphan(&self, orphan: &OrphanBlob) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO orphan_blobs (blob_ref, asset_id, cause, status, detected_at, attempts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(blob_ref) DO UPDATE SET status = excluded.status, attempts = excluded.attempts",
            params![
                orphan.blob_ref,
                orphan.asset_id,
                orphan.cause.as_str(),
                orphan.status.as_str(),
                encode_timestamp(&orphan.detected_at),
                orphan.attempts
            ],
        )
        .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn remove_orphan(&self, blob_ref: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM orphan_blobs WHERE blob_ref = ?1", params![blob_ref])
            .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn load_orphans(&self) -> Result<Vec<OrphanBlob>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT blob_ref, asset_id, cause, status, detected_at, attempts
                 FROM orphan_blobs ORDER BY detected_at, seq",
            )
            .map_err(map_sqlite_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, u32>(5)?,
                ))
            })
            .map_err(map_sqlite_error)?;

        let mut orphans = Vec::new();
        for row in rows {
            orphans.push(decode_orphan(row.map_err(map_sqlite_error)?)?);
        }
        Ok(orphans)
    }
}
