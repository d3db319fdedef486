#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the OSM service.
//!
//! These types are serialized to JSON for the REST API. They wrap the
//! normalized feature types from `osm_service_feature_models` in the report
//! envelope returned by the full-report endpoint.

use osm_service_feature_models::{Feature, LanduseAggregate, LanduseSummary, Location, QueryPoint};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Echo of the request parameters in a full report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportInput {
    /// The query point.
    pub center: Location,
    /// Search radius in meters.
    pub radius: u32,
}

impl ReportInput {
    /// Echoes a query point and radius verbatim.
    #[must_use]
    pub const fn new(point: QueryPoint, radius: u32) -> Self {
        Self {
            center: Location {
                lat: point.latitude,
                lon: point.longitude,
            },
            radius,
        }
    }
}

/// Every category result of a full report. All keys are always present;
/// categories without matches hold an empty list or aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportResult {
    /// Land-use aggregate keyed by label.
    #[schema(value_type = std::collections::BTreeMap<String, LanduseSummary>)]
    pub relative_type_of_area: LanduseAggregate,
    /// Shopping malls.
    pub malls: Vec<Feature>,
    /// Chemists.
    pub chemists: Vec<Feature>,
    /// Convenience stores.
    pub convenience: Vec<Feature>,
    /// Supermarkets.
    pub supermarkets: Vec<Feature>,
    /// Parks, each with its area.
    pub parks: Vec<Feature>,
    /// Public parking.
    pub parking: Vec<Feature>,
    /// Schools.
    pub schools: Vec<Feature>,
    /// Kindergartens.
    pub kindergartens: Vec<Feature>,
    /// Hospitals.
    pub hospitals: Vec<Feature>,
    /// Doctors.
    pub doctors: Vec<Feature>,
    /// Railway stations.
    pub railway_stations: Vec<Feature>,
    /// Tram stops.
    pub tram_stations: Vec<Feature>,
    /// Bus stops.
    pub bus_stations: Vec<Feature>,
}

/// Response of the full-report endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FullReport {
    /// Request echo.
    pub input: ReportInput,
    /// Per-category results.
    pub result: ReportResult,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_serializes_every_key() {
        let report = FullReport {
            input: ReportInput::new(QueryPoint::new(48.2, 16.37), 500),
            result: ReportResult::default(),
        };

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(
            json["input"],
            serde_json::json!({"center": {"lat": 48.2, "lon": 16.37}, "radius": 500})
        );
        let result = json["result"].as_object().unwrap();
        assert_eq!(result.len(), 14);
        assert_eq!(result["relative_type_of_area"], serde_json::json!({}));
        assert_eq!(result["bus_stations"], serde_json::json!([]));
    }
}
