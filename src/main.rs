use actix_web::{middleware, web, App, HttpServer};
use log::{info, warn};
use std::io;
use std::path::Path;

use photo_catalog::api;
use photo_catalog::app_state::AppState;
use photo_catalog::config::AppConfig;
use photo_catalog::service::ReconciliationWorker;

fn init_logging(config_file: &str) {
    if Path::new(config_file).exists() {
        if let Err(e) = log4rs::init_file(config_file, Default::default()) {
            eprintln!("Failed to load log config {}: {}", config_file, e);
        } else {
            return;
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    warn!("Log config {} not usable, logging to stderr", config_file);
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::load().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    init_logging(&config.logging.config_file);

    let app_state = AppState::from_config(config.clone())
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    if config.reconciliation.enabled {
        ReconciliationWorker::for_service(&app_state.catalog_service, &config.reconciliation).start_background();
    }

    let data = web::Data::new(app_state);
    info!("Starting server on {}:{}", config.server.host, config.server.port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(api::configure)
    })
    .workers(config.server.workers.max(1))
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
