//! Public gallery routes

use actix_web::{web, HttpResponse};
use log::info;
use serde::Serialize;

use crate::app_state::AppState;
use crate::controller::GalleryView;
use crate::error::CatalogError;
use crate::model::CategoryFilter;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionCreated {
    session_id: String,
    view: GalleryView,
}

// Tags log lines emitted by `f` with the session id
fn in_session<R>(session_id: &str, f: impl FnOnce() -> R) -> R {
    log_mdc::insert("session", session_id);
    let result = f();
    log_mdc::remove("session");
    result
}

pub async fn create_session(app_state: web::Data<AppState>) -> Result<HttpResponse, CatalogError> {
    let (session_id, view) = app_state.sessions.create().await?;
    log_mdc::insert("session", &session_id);
    info!("Gallery session created");
    log_mdc::remove("session");
    Ok(HttpResponse::Ok().json(SessionCreated { session_id, view }))
}

pub async fn get_session(path: web::Path<String>, app_state: web::Data<AppState>) -> Result<HttpResponse, CatalogError> {
    let sid = path.into_inner();
    let view = in_session(&sid, || app_state.sessions.view(&sid));
    Ok(HttpResponse::Ok().json(view?))
}

pub async fn select_category(
    path: web::Path<(String, String)>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, CatalogError> {
    let (sid, label) = path.into_inner();
    let filter: CategoryFilter = label.parse()?;
    let view = in_session(&sid, || app_state.sessions.select_category(&sid, filter));
    Ok(HttpResponse::Ok().json(view?))
}

pub async fn load_more(path: web::Path<String>, app_state: web::Data<AppState>) -> Result<HttpResponse, CatalogError> {
    let sid = path.into_inner();
    let view = in_session(&sid, || app_state.sessions.load_more(&sid));
    Ok(HttpResponse::Ok().json(view?))
}

pub async fn refresh(path: web::Path<String>, app_state: web::Data<AppState>) -> Result<HttpResponse, CatalogError> {
    let sid = path.into_inner();
    log_mdc::insert("session", &sid);
    let view = app_state.sessions.refresh(&sid).await;
    log_mdc::remove("session");
    Ok(HttpResponse::Ok().json(view?))
}

pub async fn drop_session(path: web::Path<String>, app_state: web::Data<AppState>) -> Result<HttpResponse, CatalogError> {
    let sid = path.into_inner();
    if app_state.sessions.remove(&sid) {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(CatalogError::UnknownSession(sid))
    }
}
