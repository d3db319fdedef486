//! HTTP handler functions for the OSM service API.

use actix_web::{HttpResponse, web};
use osm_service_database::QueryError;
use osm_service_database::engine::QueryErrorKind;
use osm_service_feature_models::{Feature, FeatureCategory, QueryPoint};
use osm_service_server_models::{ApiHealth, FullReport};
use utoipa::OpenApi as _;

use crate::{ApiDoc, AppState};

/// `GET /openapi.json`
///
/// Returns the `OpenAPI` document describing this API.
pub async fn openapi() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = ApiHealth))
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /relative/{lat},{lon}/{radius}`
///
/// Returns every category around the point, wrapped with an echo of the
/// request.
#[utoipa::path(
    get,
    path = "/relative/{lat},{lon}/{radius}",
    params(
        ("lat" = f64, Path, description = "Latitude of the search centre in degrees"),
        ("lon" = f64, Path, description = "Longitude of the search centre in degrees"),
        ("radius" = u32, Path, description = "Search radius in meters"),
    ),
    responses(
        (status = 200, description = "Every category around the point", body = FullReport),
        (status = 500, description = "The feature database could not be queried"),
    )
)]
pub async fn full_report(
    state: web::Data<AppState>,
    path: web::Path<(f64, f64, u32)>,
) -> HttpResponse {
    let (lat, lon, radius) = path.into_inner();
    let Some(point) = query_point(lat, lon) else {
        return HttpResponse::NotFound().finish();
    };

    match osm_service_report::full_report(state.store.as_ref(), point, radius).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => internal_error("full report", &e),
    }
}

/// `GET /relative/{lat},{lon}/{radius}/{category}`
///
/// Returns one category's result unwrapped.
#[utoipa::path(
    get,
    path = "/relative/{lat},{lon}/{radius}/{category}",
    params(
        ("lat" = f64, Path, description = "Latitude of the search centre in degrees"),
        ("lon" = f64, Path, description = "Longitude of the search centre in degrees"),
        ("radius" = u32, Path, description = "Search radius in meters"),
        ("category" = FeatureCategory, Path, description = "Category to query"),
    ),
    responses(
        (
            status = 200,
            description = "Matching features nearest-first; `landuse` returns a map of label to `LanduseSummary` instead",
            body = Vec<Feature>,
        ),
        (status = 500, description = "The feature database could not be queried"),
    )
)]
pub async fn category_report(
    state: web::Data<AppState>,
    path: web::Path<(f64, f64, u32, FeatureCategory)>,
) -> HttpResponse {
    let (lat, lon, radius, category) = path.into_inner();
    let Some(point) = query_point(lat, lon) else {
        return HttpResponse::NotFound().finish();
    };

    match osm_service_report::category_report(state.store.as_ref(), category, point, radius).await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => internal_error(&format!("{category} query"), &e),
    }
}

/// Rejects coordinates that parsed as floats but are not usable numbers
/// (`NaN`, `inf`).
fn query_point(lat: f64, lon: f64) -> Option<QueryPoint> {
    (lat.is_finite() && lon.is_finite()).then(|| QueryPoint::new(lat, lon))
}

/// Logs `error` and returns an empty 500 response. Failure details never
/// reach the client.
fn internal_error(context: &str, error: &QueryError) -> HttpResponse {
    match error.kind() {
        QueryErrorKind::Connection => {
            log::error!("{context} failed, database unavailable: {error}");
        }
        QueryErrorKind::Query => log::error!("{context} failed: {error}"),
        QueryErrorKind::MalformedData => {
            log::error!("{context} failed on malformed feature data: {error}");
        }
    }

    HttpResponse::InternalServerError().finish()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use async_trait::async_trait;
    use osm_service_database::DbError;
    use osm_service_database::memory::{MemoryFeature, MemoryFeatureStore};
    use osm_service_database::store::{
        Column, FeatureRow, FeatureStore, FeatureTable, LabelTotalRow, SourceQuery,
    };

    use crate::{AppState, configure};

    /// A store whose database is gone.
    struct UnreachableStore;

    #[async_trait]
    impl FeatureStore for UnreachableStore {
        async fn features(
            &self,
            _query: &SourceQuery<'_>,
            _with_area: bool,
        ) -> Result<Vec<FeatureRow>, DbError> {
            Err(DbError::Connection {
                message: "connection refused".to_string(),
            })
        }

        async fn label_totals(
            &self,
            _query: &SourceQuery<'_>,
            _group_by: Column,
        ) -> Result<Vec<LabelTotalRow>, DbError> {
            Err(DbError::Connection {
                message: "connection refused".to_string(),
            })
        }
    }

    fn state(store: impl FeatureStore + 'static) -> actix_web::web::Data<AppState> {
        actix_web::web::Data::new(AppState {
            store: Arc::new(store),
        })
    }

    fn city_block() -> MemoryFeatureStore {
        MemoryFeatureStore::new()
            .with(
                MemoryFeature::point(FeatureTable::Points, 48.2001, 16.3700)
                    .named("Billa")
                    .tagged(&[("shop", "supermarket")]),
            )
            .with(
                MemoryFeature::point(FeatureTable::Points, 48.2010, 16.3700)
                    .named("Spar")
                    .tagged(&[("shop", "supermarket")]),
            )
            .with(
                MemoryFeature::square(FeatureTable::Multipolygons, 48.2000, 16.3700, 0.0004)
                    .with_column(Column::Landuse, "retail"),
            )
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(configure)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["healthy"], serde_json::json!(true));
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn openapi_document_lists_relative_routes() {
        let app = test::init_service(App::new().configure(configure)).await;

        let req = test::TestRequest::get().uri("/openapi.json").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["info"]["title"], "OSM Service API");
        let paths = body["paths"].as_object().unwrap();
        assert!(paths.contains_key("/health"));

        for path in [
            "/relative/{lat},{lon}/{radius}",
            "/relative/{lat},{lon}/{radius}/{category}",
        ] {
            let get = &paths[path]["get"];
            let responses = get["responses"].as_object().unwrap();
            assert!(responses.contains_key("200"), "{path}");
            assert!(responses.contains_key("500"), "{path}");

            let params: Vec<&str> = get["parameters"]
                .as_array()
                .unwrap()
                .iter()
                .filter_map(|p| p["name"].as_str())
                .collect();
            assert!(params.starts_with(&["lat", "lon", "radius"]), "{path}");
        }

        let schemas = body["components"]["schemas"].as_object().unwrap();
        for schema in ["FullReport", "Feature", "LanduseSummary", "ApiHealth"] {
            assert!(schemas.contains_key(schema), "{schema}");
        }
    }

    #[actix_web::test]
    async fn full_report_returns_every_category() {
        let app = test::init_service(
            App::new()
                .app_data(state(city_block()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/relative/48.2,16.37/500")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(
            body["input"],
            serde_json::json!({"center": {"lat": 48.2, "lon": 16.37}, "radius": 500})
        );
        let result = body["result"].as_object().unwrap();
        assert_eq!(result.len(), 14);
        assert_eq!(result["supermarkets"].as_array().unwrap().len(), 2);
        assert_eq!(result["relative_type_of_area"]["retail"]["count"], 1);
        assert_eq!(result["doctors"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn category_route_returns_bare_list_nearest_first() {
        let app = test::init_service(
            App::new()
                .app_data(state(city_block()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/relative/48.2,16.37/500/supermarkets")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let features = body.as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["name"], "Billa");
        assert_eq!(features[1]["name"], "Spar");
        assert_eq!(features[0]["unit"], "m");
        assert_eq!(features[0]["other_tags"]["shop"], "supermarket");
    }

    #[actix_web::test]
    async fn landuse_route_returns_aggregate() {
        let app = test::init_service(
            App::new()
                .app_data(state(city_block()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/relative/48.2,16.37/500/landuse")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["retail"]["count"], 1);
        assert_eq!(body["retail"]["unit"], "m^2");
        assert!(body["retail"]["total_area"].as_f64().unwrap() > 0.0);
    }

    #[actix_web::test]
    async fn malformed_paths_are_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(state(city_block()))
                .configure(configure),
        )
        .await;

        for uri in [
            "/relative/48.2,16.37/500/restaurants",
            "/relative/48.2,16.37/-5",
            "/relative/48.2,16.37/wide",
            "/relative/north,16.37/500",
            "/relative/NaN,16.37/500",
            "/relative/48.2/500",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_web::test]
    async fn store_failure_is_an_empty_500() {
        let app = test::init_service(
            App::new()
                .app_data(state(UnreachableStore))
                .configure(configure),
        )
        .await;

        for uri in ["/relative/48.2,16.37/500", "/relative/48.2,16.37/500/parks"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");

            let body = test::read_body(resp).await;
            assert!(body.is_empty(), "{uri}");
        }
    }
}
