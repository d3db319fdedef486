#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature category taxonomy and normalized result types.
//!
//! Defines the fixed set of map-feature categories the service can report
//! on, the point a search is centred on, and the uniform shapes every
//! category result is normalized into before it is serialized.

pub mod tags;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

pub use tags::{TagCollection, TagParseError};

/// A WGS84 coordinate in degrees.
///
/// No range validation is performed; out-of-range values are passed
/// through to the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl QueryPoint {
    /// Creates a query point from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// The categories of nearby features the service reports on.
///
/// The string form of each variant is the URL segment used to request that
/// category on its own.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
pub enum FeatureCategory {
    /// Aggregated commercial/industrial/residential/retail land use.
    #[serde(rename = "landuse")]
    #[strum(serialize = "landuse")]
    Landuse,
    /// Public parking amenities.
    #[serde(rename = "parking")]
    #[strum(serialize = "parking")]
    Parking,
    /// Park polygons.
    #[serde(rename = "parks")]
    #[strum(serialize = "parks")]
    Park,
    /// Shopping malls.
    #[serde(rename = "malls")]
    #[strum(serialize = "malls")]
    Mall,
    /// Chemists and drugstores.
    #[serde(rename = "chemists")]
    #[strum(serialize = "chemists")]
    Chemist,
    /// Convenience stores.
    #[serde(rename = "convenience")]
    #[strum(serialize = "convenience")]
    Convenience,
    /// Supermarkets.
    #[serde(rename = "supermarkets")]
    #[strum(serialize = "supermarkets")]
    Supermarket,
    /// Schools.
    #[serde(rename = "schools")]
    #[strum(serialize = "schools")]
    School,
    /// Kindergartens.
    #[serde(rename = "kindergarten")]
    #[strum(serialize = "kindergarten")]
    Kindergarten,
    /// Hospitals.
    #[serde(rename = "hospitals")]
    #[strum(serialize = "hospitals")]
    Hospital,
    /// Doctors' practices.
    #[serde(rename = "doctors")]
    #[strum(serialize = "doctors")]
    Doctor,
    /// Railway stations.
    #[serde(rename = "railway")]
    #[strum(serialize = "railway")]
    RailwayStation,
    /// Tram stops.
    #[serde(rename = "tram")]
    #[strum(serialize = "tram")]
    TramStop,
    /// Bus stops.
    #[serde(rename = "bus")]
    #[strum(serialize = "bus")]
    BusStop,
}

impl FeatureCategory {
    /// Returns all variants in full-report order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Landuse,
            Self::Mall,
            Self::Chemist,
            Self::Convenience,
            Self::Supermarket,
            Self::Park,
            Self::Parking,
            Self::School,
            Self::Kindergarten,
            Self::Hospital,
            Self::Doctor,
            Self::RailwayStation,
            Self::TramStop,
            Self::BusStop,
        ]
    }
}

/// Land-use labels included in the land-use aggregate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LandUse {
    /// Offices and commercial premises.
    Commercial,
    /// Factories and industrial estates.
    Industrial,
    /// Housing.
    Residential,
    /// Shops and retail parks.
    Retail,
}

impl LandUse {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Commercial,
            Self::Industrial,
            Self::Residential,
            Self::Retail,
        ]
    }
}

/// Measurement units attached to distances and areas in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Unit {
    /// Meters.
    #[serde(rename = "m")]
    Meters,
    /// Square meters.
    #[serde(rename = "m^2")]
    SquareMeters,
}

/// A reportable location (the centroid of a feature's geometry).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// A single matching feature, normalized across source tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Feature {
    /// Geodesic distance from the query point, in meters.
    pub distance: f64,
    /// Always [`Unit::Meters`].
    pub unit: Unit,
    /// Centroid of the feature geometry.
    pub location: Location,
    /// Human-readable name, when the feature has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parsed free-form tags, when the feature carries tag text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_tags: Option<TagCollection>,
    /// Per-feature area for area-bearing categories (parks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    /// Unit of [`Self::area`], set together with it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_unit: Option<Unit>,
}

impl Feature {
    /// Attaches an area in square meters.
    #[must_use]
    pub fn with_area(mut self, square_meters: f64) -> Self {
        self.area = Some(square_meters);
        self.area_unit = Some(Unit::SquareMeters);
        self
    }
}

/// Count and total area of the features carrying one land-use label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LanduseSummary {
    /// Number of matching features.
    pub count: i64,
    /// Combined area of the matching features.
    pub total_area: f64,
    /// Always [`Unit::SquareMeters`].
    pub unit: Unit,
}

impl LanduseSummary {
    /// Creates a summary with the area in square meters.
    #[must_use]
    pub const fn new(count: i64, total_area: f64) -> Self {
        Self {
            count,
            total_area,
            unit: Unit::SquareMeters,
        }
    }
}

/// Land-use summaries keyed by label. Labels without matches are absent.
pub type LanduseAggregate = BTreeMap<LandUse, LanduseSummary>;

/// The result of querying a single category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryResult {
    /// Matching features ordered nearest-first within each source.
    Features(Vec<Feature>),
    /// Statistical land-use summary.
    Landuse(LanduseAggregate),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_path_segments_round_trip() {
        for category in FeatureCategory::all() {
            let segment = category.to_string();
            assert_eq!(segment.parse::<FeatureCategory>().unwrap(), *category);
        }
        assert_eq!(
            "kindergarten".parse::<FeatureCategory>().unwrap(),
            FeatureCategory::Kindergarten
        );
        assert!("pubs".parse::<FeatureCategory>().is_err());
    }

    #[test]
    fn all_lists_fourteen_distinct_categories() {
        let mut categories = FeatureCategory::all().to_vec();
        categories.sort_unstable();
        categories.dedup();
        assert_eq!(categories.len(), 14);
    }

    #[test]
    fn feature_serializes_optional_fields_only_when_present() {
        let feature = Feature {
            distance: 12.5,
            unit: Unit::Meters,
            location: Location {
                lat: 48.2,
                lon: 16.37,
            },
            name: None,
            other_tags: None,
            area: None,
            area_unit: None,
        };
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "distance": 12.5,
                "unit": "m",
                "location": {"lat": 48.2, "lon": 16.37},
            })
        );
    }

    #[test]
    fn park_area_is_reported_on_feature() {
        let feature = Feature {
            distance: 0.0,
            unit: Unit::Meters,
            location: Location { lat: 1.0, lon: 2.0 },
            name: Some("Stadtpark".to_string()),
            other_tags: Some(TagCollection::new()),
            area: None,
            area_unit: None,
        }
        .with_area(6500.0);
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["area"], 6500.0);
        assert_eq!(json["area_unit"], "m^2");
        assert_eq!(json["name"], "Stadtpark");
        assert_eq!(json["other_tags"], serde_json::json!({}));
    }

    #[test]
    fn landuse_aggregate_uses_lowercase_labels() {
        let mut aggregate = LanduseAggregate::new();
        aggregate.insert(LandUse::Residential, LanduseSummary::new(2, 350.0));
        let json = serde_json::to_value(CategoryResult::Landuse(aggregate)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "residential": {"count": 2, "total_area": 350.0, "unit": "m^2"}
            })
        );
    }
}
