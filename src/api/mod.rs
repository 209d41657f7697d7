//! HTTP surface
//!
//! Thin actix-web handlers over the controllers. Every route is registered
//! through [`configure`] so the binary and the integration tests mount the
//! same tree.

pub mod admin;
pub mod gallery;

use actix_web::{web, HttpResponse};
use log::debug;

use crate::app_state::AppState;
use crate::error::StoreError;
use crate::model::CategoryFilter;

/// Register every route on an app or scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/categories", web::get().to(list_categories))
        .service(
            web::scope("/gallery/sessions")
                .route("", web::post().to(gallery::create_session))
                .route("/{sid}", web::get().to(gallery::get_session))
                .route("/{sid}", web::delete().to(gallery::drop_session))
                .route("/{sid}/category/{label}", web::post().to(gallery::select_category))
                .route("/{sid}/more", web::post().to(gallery::load_more))
                .route("/{sid}/refresh", web::post().to(gallery::refresh)),
        )
        .service(
            web::scope("/admin")
                .route("/assets", web::get().to(admin::list_assets))
                .route("/assets", web::post().to(admin::upload_asset))
                .route("/assets/{id}", web::delete().to(admin::delete_asset))
                .route("/orphans", web::get().to(admin::list_orphans)),
        )
        .route("/blobs/{path:.*}", web::get().to(get_blob));
}

/// Ordered category labels, wildcard first
pub async fn list_categories() -> HttpResponse {
    HttpResponse::Ok().json(CategoryFilter::labels())
}

/// Serve a blob issued by the configured blob store
pub async fn get_blob(path: web::Path<String>, app_state: web::Data<AppState>) -> Result<HttpResponse, StoreError> {
    let path = path.into_inner();
    let blobs = app_state.catalog_service.blob_store();
    let blob_ref = blobs.url_for(&path);
    debug!("Serving blob {}", blob_ref);

    let data = blobs.read_blob(&blob_ref).await.map_err(|e| match e {
        // A path that does not resolve inside the store is simply absent
        StoreError::WriteRejected(message) => StoreError::NotFound(message),
        other => other,
    })?;
    Ok(HttpResponse::Ok().content_type(content_type_for(&path)).body(data))
}

fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
