#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report composition.
//!
//! A full report queries every [`FeatureCategory`] around one point and
//! assembles the results under fixed keys, next to an echo of the request.
//! Categories are queried one after another; the first failure aborts the
//! whole report, so callers never see a partial result.

use std::time::Instant;

use osm_service_database::QueryError;
use osm_service_database::engine;
use osm_service_database::store::FeatureStore;
use osm_service_feature_models::{CategoryResult, FeatureCategory, QueryPoint};
use osm_service_server_models::{FullReport, ReportInput, ReportResult};

/// Builds the full report for `point` and `radius`.
///
/// # Errors
///
/// Returns the first [`QueryError`] raised by any category query.
pub async fn full_report(
    store: &dyn FeatureStore,
    point: QueryPoint,
    radius: u32,
) -> Result<FullReport, QueryError> {
    let started = Instant::now();

    let result = ReportResult {
        relative_type_of_area: engine::landuse(store, point, radius).await?,
        malls: engine::malls(store, point, radius).await?,
        chemists: engine::chemists(store, point, radius).await?,
        convenience: engine::convenience(store, point, radius).await?,
        supermarkets: engine::supermarkets(store, point, radius).await?,
        parks: engine::parks(store, point, radius).await?,
        parking: engine::parking(store, point, radius).await?,
        schools: engine::schools(store, point, radius).await?,
        kindergartens: engine::kindergartens(store, point, radius).await?,
        hospitals: engine::hospitals(store, point, radius).await?,
        doctors: engine::doctors(store, point, radius).await?,
        railway_stations: engine::railway_stations(store, point, radius).await?,
        tram_stations: engine::tram_stops(store, point, radius).await?,
        bus_stations: engine::bus_stops(store, point, radius).await?,
    };

    log::debug!(
        "Composed full report for ({}, {}) r={radius}m in {:?}",
        point.latitude,
        point.longitude,
        started.elapsed()
    );

    Ok(FullReport {
        input: ReportInput::new(point, radius),
        result,
    })
}

/// Queries a single category, passing its result through unmodified.
///
/// # Errors
///
/// Returns [`QueryError`] if the category query fails.
pub async fn category_report(
    store: &dyn FeatureStore,
    category: FeatureCategory,
    point: QueryPoint,
    radius: u32,
) -> Result<CategoryResult, QueryError> {
    engine::query(store, category, point, radius).await
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use osm_service_database::DbError;
    use osm_service_database::memory::{MemoryFeature, MemoryFeatureStore};
    use osm_service_database::store::{
        Column, FeatureRow, FeatureTable, LabelTotalRow, SourceQuery,
    };
    use osm_service_feature_models::LandUse;

    use super::*;

    const CENTER: QueryPoint = QueryPoint::new(50.0755, 14.4378);

    /// Fails every lookup against one table, delegating the rest.
    struct DisconnectingStore {
        inner: MemoryFeatureStore,
        failing_table: FeatureTable,
    }

    #[async_trait]
    impl FeatureStore for DisconnectingStore {
        async fn features(
            &self,
            query: &SourceQuery<'_>,
            with_area: bool,
        ) -> Result<Vec<FeatureRow>, DbError> {
            if query.table == self.failing_table {
                return Err(DbError::Connection {
                    message: "server closed the connection unexpectedly".to_string(),
                });
            }
            self.inner.features(query, with_area).await
        }

        async fn label_totals(
            &self,
            query: &SourceQuery<'_>,
            group_by: Column,
        ) -> Result<Vec<LabelTotalRow>, DbError> {
            self.inner.label_totals(query, group_by).await
        }
    }

    fn neighbourhood() -> MemoryFeatureStore {
        MemoryFeatureStore::new()
            .with(
                MemoryFeature::point(FeatureTable::Points, 50.0757, 14.4378)
                    .named("Lékárna")
                    .tagged(&[("shop", "chemist")]),
            )
            .with(
                MemoryFeature::point(FeatureTable::Points, 50.0760, 14.4380)
                    .tagged(&[("amenity", "hospital")]),
            )
            .with(
                MemoryFeature::square(FeatureTable::Multipolygons, 50.0755, 14.4378, 0.0005)
                    .with_column(Column::Landuse, "residential"),
            )
    }

    #[tokio::test]
    async fn full_report_has_every_key_and_echoes_input() {
        let store = neighbourhood();

        let report = full_report(&store, CENTER, 250).await.unwrap();

        assert_eq!(report.input, ReportInput::new(CENTER, 250));
        assert_eq!(report.result.chemists.len(), 1);
        assert_eq!(report.result.hospitals.len(), 1);
        assert!(report.result.malls.is_empty());
        assert_eq!(
            report.result.relative_type_of_area[&LandUse::Residential].count,
            1
        );

        let json = serde_json::to_value(&report).unwrap();
        let result = json["result"].as_object().unwrap();
        for key in [
            "relative_type_of_area",
            "malls",
            "chemists",
            "convenience",
            "supermarkets",
            "parks",
            "parking",
            "schools",
            "kindergartens",
            "hospitals",
            "doctors",
            "railway_stations",
            "tram_stations",
            "bus_stations",
        ] {
            assert!(result.contains_key(key), "{key}");
        }
        assert_eq!(result.len(), FeatureCategory::all().len());
    }

    #[tokio::test]
    async fn empty_store_still_reports_every_category() {
        let store = MemoryFeatureStore::new();

        let report = full_report(&store, CENTER, 0).await.unwrap();

        assert_eq!(report.result, ReportResult::default());
    }

    #[tokio::test]
    async fn one_failing_category_aborts_the_report() {
        let store = DisconnectingStore {
            inner: neighbourhood(),
            failing_table: FeatureTable::OtherRelations,
        };

        let err = full_report(&store, CENTER, 250).await.unwrap_err();

        assert_eq!(
            err.kind(),
            osm_service_database::engine::QueryErrorKind::Connection
        );
    }

    #[tokio::test]
    async fn category_report_passes_result_through() {
        let store = neighbourhood();

        let direct = engine::query(&store, FeatureCategory::Chemist, CENTER, 250)
            .await
            .unwrap();
        let reported = category_report(&store, FeatureCategory::Chemist, CENTER, 250)
            .await
            .unwrap();

        assert_eq!(direct, reported);
        assert!(matches!(reported, CategoryResult::Features(ref features) if features.len() == 1));
    }
}
