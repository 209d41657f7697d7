//! Admin routes: upload, delete, listing and the orphan ledger

use actix_web::{web, HttpResponse, ResponseError};
use bytes::BytesMut;
use futures::StreamExt;
use log::{debug, error, info, warn};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::controller::{DeleteOutcome, UploadOutcome};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub category: Option<String>,
    pub name: Option<String>,
}

pub async fn list_assets(app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(app_state.admin.list())
}

pub async fn list_orphans(app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(app_state.catalog_service.orphans().snapshot())
}

/// Raw image bytes in the body, category and file name in the query.
/// Always answers with an `UploadOutcome`.
pub async fn upload_asset(
    query: web::Query<UploadQuery>,
    mut payload: web::Payload,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let UploadQuery { category, name } = query.into_inner();
    let category = category.unwrap_or_default();
    let limit = app_state.config.server.max_payload_size;

    info!("Starting upload for category: {}", category);
    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Error reading payload chunk: {}", e);
                return HttpResponse::BadRequest().json(UploadOutcome::rejected("PayloadError", e.to_string()));
            }
        };
        if bytes.len() + chunk.len() > limit {
            warn!("Upload exceeds the {} byte payload limit", limit);
            return HttpResponse::PayloadTooLarge().json(UploadOutcome::rejected(
                "PayloadTooLarge",
                format!("upload exceeds {} bytes", limit),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    debug!("Total received data size: {} bytes", bytes.len());

    let result = app_state
        .admin
        .ingest_requested(&bytes, &category, name.as_deref())
        .await;
    let outcome = UploadOutcome::from_result(&result);
    match &result {
        Ok(asset) => {
            info!("Upload stored as asset {}", asset.id);
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => {
            error!("Upload failed: {}", e);
            HttpResponse::build(e.status_code()).json(outcome)
        }
    }
}

/// Always answers with a `DeleteOutcome`
pub async fn delete_asset(path: web::Path<String>, app_state: web::Data<AppState>) -> HttpResponse {
    let id = path.into_inner();
    log_mdc::insert("asset", &id);

    let result = app_state.admin.delete_requested(&id).await;
    let outcome = DeleteOutcome::from_result(&result);
    let response = match &result {
        Ok(()) => HttpResponse::Ok().json(outcome),
        Err(e) => {
            warn!("Delete of {} failed: {}", id, e);
            HttpResponse::build(e.status_code()).json(outcome)
        }
    };
    log_mdc::remove("asset");
    response
}
