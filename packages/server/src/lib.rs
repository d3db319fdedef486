#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the OSM proximity service.
//!
//! Serves `/relative/{lat},{lon}/{radius}` (the full report) and
//! `/relative/{lat},{lon}/{radius}/{category}` (a single category) from a
//! `PostGIS` database of OpenStreetMap features, and describes both in an
//! `OpenAPI` document at `/openapi.json`.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use osm_service_database::db::DatabaseConfig;
use osm_service_database::postgis::PostgisStore;
use osm_service_database::store::FeatureStore;
use osm_service_feature_models::{
    Feature, FeatureCategory, LandUse, LanduseSummary, Location, TagCollection, Unit,
};
use osm_service_server_models::{ApiHealth, FullReport, ReportInput, ReportResult};
use utoipa::OpenApi;

/// Shared application state.
pub struct AppState {
    /// Feature store every request queries.
    pub store: Arc<dyn FeatureStore>,
}

/// The `OpenAPI` document served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OSM Service API",
        description = "OpenStreetMap features around a coordinate, queried from PostGIS"
    ),
    paths(handlers::health, handlers::full_report, handlers::category_report),
    components(schemas(
        ApiHealth,
        FullReport,
        ReportInput,
        ReportResult,
        Feature,
        Location,
        Unit,
        TagCollection,
        LanduseSummary,
        LandUse,
        FeatureCategory,
    ))
)]
pub struct ApiDoc;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
}

impl ServerConfig {
    /// Reads `BIND_ADDR` and `PORT` from the environment, defaulting to
    /// `127.0.0.1:8080`.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Self { bind_addr, port }
    }
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/openapi.json", web::get().to(handlers::openapi))
        .service(
            web::scope("/relative")
                .route(
                    "/{lat:[^,/]+},{lon:[^/]+}/{radius}",
                    web::get().to(handlers::full_report),
                )
                .route(
                    "/{lat:[^,/]+},{lon:[^/]+}/{radius}/{category}",
                    web::get().to(handlers::category_report),
                ),
        );
}

/// Starts the OSM service API server.
///
/// Connects to the `PostGIS` database and starts the Actix-Web HTTP
/// server. If the database is unreachable at startup the server still
/// starts, and the store connects on the first request. This is a regular
/// async function; the caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let db_config = DatabaseConfig::from_env();
    let store = match PostgisStore::connect(db_config.clone()).await {
        Ok(store) => store,
        Err(e) => {
            log::warn!("Database unavailable at startup ({e}), will connect on first request");
            PostgisStore::new(db_config)
        }
    };

    let state = web::Data::new(AppState {
        store: Arc::new(store),
    });

    let ServerConfig { bind_addr, port } = ServerConfig::from_env();

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
