//! The declarative per-category query table.
//!
//! Every [`FeatureCategory`] maps to one [`CategoryDescriptor`] naming the
//! tables it reads, the predicates a feature must satisfy, and the shape
//! its result takes. The engine has a single code path driven by this table.

use osm_service_feature_models::FeatureCategory;

use crate::store::{Column, FeatureFilter, FeatureTable};

/// The shape a category's result takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// A nearest-first feature list.
    Features {
        /// Whether each feature carries its own area.
        with_area: bool,
    },
    /// Counts and total areas grouped by a categorical column.
    LabelTotals {
        /// Column to group by.
        group_by: Column,
    },
}

/// How a single category is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDescriptor {
    /// Tables to read, in result order. Results are concatenated by source,
    /// not merged by distance.
    pub sources: &'static [FeatureTable],
    /// Predicates applied to every source.
    pub filters: &'static [FeatureFilter],
    /// Result shape.
    pub shape: ResultShape,
}

const POINTS: &[FeatureTable] = &[FeatureTable::Points];
const MULTIPOLYGONS: &[FeatureTable] = &[FeatureTable::Multipolygons];
const POINTS_THEN_RELATIONS: &[FeatureTable] =
    &[FeatureTable::Points, FeatureTable::OtherRelations];

const FEATURE_LIST: ResultShape = ResultShape::Features { with_area: false };

const fn tag(key: &'static str, value: &'static str) -> FeatureFilter {
    FeatureFilter::Tag { key, value }
}

const fn not_tag(key: &'static str, value: &'static str) -> FeatureFilter {
    FeatureFilter::NotTag { key, value }
}

const fn points_tagged(filters: &'static [FeatureFilter]) -> CategoryDescriptor {
    CategoryDescriptor {
        sources: POINTS,
        filters,
        shape: FEATURE_LIST,
    }
}

const LANDUSE_LABELS: &[FeatureFilter] = &[FeatureFilter::ColumnIn {
    column: Column::Landuse,
    values: &["commercial", "industrial", "residential", "retail"],
}];
const PARKING: &[FeatureFilter] = &[
    tag("amenity", "parking"),
    not_tag("access", "private"),
    not_tag("access", "no"),
    not_tag("access", "discouraged"),
];
const PARK: &[FeatureFilter] = &[FeatureFilter::ColumnIn {
    column: Column::Leisure,
    values: &["park"],
}];
const MALL: &[FeatureFilter] = &[tag("shop", "mall")];
const CHEMIST: &[FeatureFilter] = &[tag("shop", "chemist")];
const CONVENIENCE: &[FeatureFilter] = &[tag("shop", "convenience")];
const SUPERMARKET: &[FeatureFilter] = &[tag("shop", "supermarket")];
const SCHOOL: &[FeatureFilter] = &[tag("amenity", "school")];
const KINDERGARTEN: &[FeatureFilter] = &[tag("amenity", "kindergarten")];
const HOSPITAL: &[FeatureFilter] = &[tag("amenity", "hospital")];
const DOCTOR: &[FeatureFilter] = &[tag("amenity", "doctors")];
const RAILWAY_STATION: &[FeatureFilter] = &[tag("railway", "station")];
const TRAM_STOP: &[FeatureFilter] = &[tag("railway", "tram_stop")];
const BUS_STOP: &[FeatureFilter] = &[FeatureFilter::ColumnIn {
    column: Column::Highway,
    values: &["bus_stop"],
}];

/// Returns the query descriptor for `category`.
#[must_use]
pub const fn descriptor(category: FeatureCategory) -> CategoryDescriptor {
    match category {
        FeatureCategory::Landuse => CategoryDescriptor {
            sources: MULTIPOLYGONS,
            filters: LANDUSE_LABELS,
            shape: ResultShape::LabelTotals {
                group_by: Column::Landuse,
            },
        },
        FeatureCategory::Parking => points_tagged(PARKING),
        FeatureCategory::Park => CategoryDescriptor {
            sources: MULTIPOLYGONS,
            filters: PARK,
            shape: ResultShape::Features { with_area: true },
        },
        FeatureCategory::Mall => points_tagged(MALL),
        FeatureCategory::Chemist => points_tagged(CHEMIST),
        FeatureCategory::Convenience => points_tagged(CONVENIENCE),
        FeatureCategory::Supermarket => points_tagged(SUPERMARKET),
        FeatureCategory::School => CategoryDescriptor {
            sources: POINTS_THEN_RELATIONS,
            filters: SCHOOL,
            shape: FEATURE_LIST,
        },
        FeatureCategory::Kindergarten => CategoryDescriptor {
            sources: POINTS_THEN_RELATIONS,
            filters: KINDERGARTEN,
            shape: FEATURE_LIST,
        },
        FeatureCategory::Hospital => points_tagged(HOSPITAL),
        FeatureCategory::Doctor => points_tagged(DOCTOR),
        FeatureCategory::RailwayStation => points_tagged(RAILWAY_STATION),
        FeatureCategory::TramStop => points_tagged(TRAM_STOP),
        FeatureCategory::BusStop => points_tagged(BUS_STOP),
    }
}
