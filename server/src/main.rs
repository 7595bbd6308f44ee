mod config;
mod handlers;
mod state;
mod types;

use std::io;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use log::{info, warn};
use model::{ArtifactStore, Predictor, artifacts::ArtifactPaths, audit::AuditSink};

use crate::{config::ServerConfig, state::AppState};

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config = ServerConfig::from_env();
    let store = ArtifactStore::new(ArtifactPaths::from_env());

    // Eager load so the first request doesn't pay for deserialization.
    store.load_schema();
    if !store.load_model() {
        warn!("starting without a model; /api/predict will fail until one is uploaded");
    }
    store.load_scaler();

    let state = web::Data::new(AppState {
        predictor: Predictor::new(store),
        audit: AuditSink::from_env(),
        admin_api_key: config.admin_api_key.clone(),
    });

    info!("listening at {}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .route("/api/metadata", web::get().to(handlers::metadata))
            .route("/api/predict", web::post().to(handlers::predict))
            .route("/healthz", web::get().to(handlers::healthz))
            .route("/admin/upload", web::post().to(handlers::admin_upload))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
