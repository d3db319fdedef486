//! The proximity query engine.
//!
//! [`query`] looks up the [`catalog::descriptor`] for a category, runs one
//! store lookup per source table, and normalizes the raw rows:
//!
//! * feature rows become [`Feature`]s, with the centroid `GeoJSON` parsed
//!   into a [`Location`] and the tag text parsed into a [`TagCollection`];
//! * label totals become a [`LanduseAggregate`].
//!
//! Multi-source categories are concatenated in source order. Any failure
//! aborts the whole category call.

use std::time::Instant;

use geojson::GeoJson;
use osm_service_feature_models::{
    CategoryResult, Feature, FeatureCategory, LandUse, LanduseAggregate,
    LanduseSummary, Location, QueryPoint, TagCollection, TagParseError, Unit,
};

use crate::DbError;
use crate::catalog::{self, ResultShape};
use crate::store::{FeatureRow, FeatureStore, LabelTotalRow, SourceQuery};

/// Errors that abort a category query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The store failed or could not be reached.
    #[error(transparent)]
    Store(#[from] DbError),

    /// A row carried tag text outside the `"key"=>"value"` grammar.
    #[error("Malformed tag data: {0}")]
    MalformedTags(#[from] TagParseError),

    /// A row's centroid was not a `GeoJSON` point.
    #[error("Malformed feature location: {message}")]
    MalformedLocation {
        /// Description of what went wrong.
        message: String,
    },

    /// A category's result did not have the shape its caller expects.
    #[error("{category} does not produce a {expected}")]
    ShapeMismatch {
        /// The category queried.
        category: FeatureCategory,
        /// What the caller expected.
        expected: &'static str,
    },

    /// A grouped row carried a label outside the requested set.
    #[error("Unexpected land-use label: {label}")]
    UnexpectedLabel {
        /// The offending label.
        label: String,
    },
}

/// Coarse classification of a [`QueryError`] for the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Store unreachable or connection could not be re-established.
    Connection,
    /// The store rejected or failed the statement, or returned rows that
    /// could not be read.
    Query,
    /// Tag text or geometry in a row did not follow the expected format.
    MalformedData,
}

impl QueryError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> QueryErrorKind {
        match self {
            Self::Store(DbError::Connection { .. }) => QueryErrorKind::Connection,
            Self::Store(DbError::Database(_) | DbError::Conversion { .. })
            | Self::ShapeMismatch { .. } => QueryErrorKind::Query,
            Self::MalformedTags(_)
            | Self::MalformedLocation { .. }
            | Self::UnexpectedLabel { .. } => QueryErrorKind::MalformedData,
        }
    }
}

/// Queries one category around `point`.
///
/// Feature lists are ordered by ascending distance within each source
/// table; the land-use aggregate is keyed by label.
///
/// # Errors
///
/// Returns [`QueryError`] if any store lookup fails or any row cannot be
/// normalized.
pub async fn query(
    store: &dyn FeatureStore,
    category: FeatureCategory,
    point: QueryPoint,
    radius: u32,
) -> Result<CategoryResult, QueryError> {
    let descriptor = catalog::descriptor(category);
    let started = Instant::now();

    let result = match descriptor.shape {
        ResultShape::Features { with_area } => {
            let mut features = Vec::new();
            for table in descriptor.sources {
                let source = SourceQuery {
                    table: *table,
                    filters: descriptor.filters,
                    point,
                    radius,
                };
                let rows = store.features(&source, with_area).await?;
                features.reserve(rows.len());
                for row in rows {
                    features.push(feature_from_row(row)?);
                }
            }
            CategoryResult::Features(features)
        }
        ResultShape::LabelTotals { group_by } => {
            let mut aggregate = LanduseAggregate::new();
            for table in descriptor.sources {
                let source = SourceQuery {
                    table: *table,
                    filters: descriptor.filters,
                    point,
                    radius,
                };
                for row in store.label_totals(&source, group_by).await? {
                    add_label_total(&mut aggregate, row)?;
                }
            }
            CategoryResult::Landuse(aggregate)
        }
    };

    log::debug!(
        "Queried {category} around ({}, {}) r={radius}m in {:?}",
        point.latitude,
        point.longitude,
        started.elapsed()
    );

    Ok(result)
}

/// Aggregated land use (commercial, industrial, residential, retail).
///
/// # Errors
///
/// Returns [`QueryError`] if the lookup fails.
pub async fn landuse(
    store: &dyn FeatureStore,
    point: QueryPoint,
    radius: u32,
) -> Result<LanduseAggregate, QueryError> {
    landuse_of(store, FeatureCategory::Landuse, point, radius).await
}

async fn landuse_of(
    store: &dyn FeatureStore,
    category: FeatureCategory,
    point: QueryPoint,
    radius: u32,
) -> Result<LanduseAggregate, QueryError> {
    match query(store, category, point, radius).await? {
        CategoryResult::Landuse(aggregate) => Ok(aggregate),
        CategoryResult::Features(_) => Err(QueryError::ShapeMismatch {
            category,
            expected: "land-use aggregate",
        }),
    }
}

async fn feature_list(
    store: &dyn FeatureStore,
    category: FeatureCategory,
    point: QueryPoint,
    radius: u32,
) -> Result<Vec<Feature>, QueryError> {
    match query(store, category, point, radius).await? {
        CategoryResult::Features(features) => Ok(features),
        CategoryResult::Landuse(_) => Err(QueryError::ShapeMismatch {
            category,
            expected: "feature list",
        }),
    }
}

macro_rules! feature_queries {
    ($($(#[$doc:meta])* $name:ident => $category:ident;)*) => {
        $(
            $(#[$doc])*
            ///
            /// # Errors
            ///
            /// Returns [`QueryError`] if any lookup fails.
            pub async fn $name(
                store: &dyn FeatureStore,
                point: QueryPoint,
                radius: u32,
            ) -> Result<Vec<Feature>, QueryError> {
                feature_list(store, FeatureCategory::$category, point, radius).await
            }
        )*
    };
}

feature_queries! {
    /// Publicly accessible parking.
    parking => Parking;
    /// Parks, each with its own area.
    parks => Park;
    /// Shopping malls.
    malls => Mall;
    /// Chemists.
    chemists => Chemist;
    /// Convenience stores.
    convenience => Convenience;
    /// Supermarkets.
    supermarkets => Supermarket;
    /// Schools: point features first, then relation features.
    schools => School;
    /// Kindergartens: point features first, then relation features.
    kindergartens => Kindergarten;
    /// Hospitals.
    hospitals => Hospital;
    /// Doctors' practices.
    doctors => Doctor;
    /// Railway stations.
    railway_stations => RailwayStation;
    /// Tram stops.
    tram_stops => TramStop;
    /// Bus stops.
    bus_stops => BusStop;
}

/// Normalizes a raw feature row.
///
/// # Errors
///
/// Returns [`QueryError`] if the centroid is not a `GeoJSON` point or the
/// tag text is malformed.
pub fn feature_from_row(row: FeatureRow) -> Result<Feature, QueryError> {
    let location = parse_location(&row.centroid)?;
    let other_tags = row
        .other_tags
        .as_deref()
        .map(TagCollection::parse)
        .transpose()?;

    Ok(Feature {
        distance: row.distance,
        unit: Unit::Meters,
        location,
        name: row.name,
        other_tags,
        area: row.area,
        area_unit: row.area.map(|_| Unit::SquareMeters),
    })
}

fn add_label_total(aggregate: &mut LanduseAggregate, row: LabelTotalRow) -> Result<(), QueryError> {
    let label: LandUse = row
        .label
        .parse()
        .map_err(|_| QueryError::UnexpectedLabel {
            label: row.label.clone(),
        })?;

    let summary = aggregate
        .entry(label)
        .or_insert_with(|| LanduseSummary::new(0, 0.0));
    summary.count += row.count;
    summary.total_area += row.total_area;

    Ok(())
}

/// Parses `GeoJSON` point text into a [`Location`].
fn parse_location(text: &str) -> Result<Location, QueryError> {
    let geojson: GeoJson = text.parse().map_err(|e| QueryError::MalformedLocation {
        message: format!("{e}"),
    })?;

    let GeoJson::Geometry(geometry) = geojson else {
        return Err(QueryError::MalformedLocation {
            message: format!("expected a geometry, got {text}"),
        });
    };

    let geometry: geo::Geometry<f64> =
        geometry
            .try_into()
            .map_err(|e: geojson::Error| QueryError::MalformedLocation {
                message: e.to_string(),
            })?;

    match geometry {
        geo::Geometry::Point(point) => Ok(Location {
            lat: point.y(),
            lon: point.x(),
        }),
        _ => Err(QueryError::MalformedLocation {
            message: format!("expected a point, got {text}"),
        }),
    }
}
