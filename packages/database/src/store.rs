//! The feature store seam.
//!
//! A [`FeatureStore`] answers two kinds of spatial lookups around a query
//! point: individual matching features from one source table, and per-label
//! totals over one categorical column. Stores return raw rows; turning them
//! into normalized results is the engine's job.

use async_trait::async_trait;
use osm_service_feature_models::{QueryPoint, tags::quoted_pair};

use crate::DbError;

/// The feature tables a query can read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureTable {
    /// Point features (`points`).
    Points,
    /// Polygon and multi-polygon features (`multipolygons`).
    Multipolygons,
    /// Features sourced from relations that are not multipolygons
    /// (`other_relations`).
    OtherRelations,
}

impl FeatureTable {
    /// The table name in the feature database.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Multipolygons => "multipolygons",
            Self::OtherRelations => "other_relations",
        }
    }
}

/// Dedicated categorical columns that predicates may compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    /// `multipolygons.landuse`
    Landuse,
    /// `multipolygons.leisure`
    Leisure,
    /// `points.highway`
    Highway,
}

impl Column {
    /// The column name in the feature database.
    #[must_use]
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::Landuse => "landuse",
            Self::Leisure => "leisure",
            Self::Highway => "highway",
        }
    }
}

/// A predicate a feature must satisfy besides lying within the radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFilter {
    /// The tag text contains the literal `"key"=>"value"` pair.
    Tag {
        /// Tag key.
        key: &'static str,
        /// Tag value.
        value: &'static str,
    },
    /// The tag text is present and does not contain the literal pair.
    NotTag {
        /// Tag key.
        key: &'static str,
        /// Tag value.
        value: &'static str,
    },
    /// The column equals one of the given values.
    ColumnIn {
        /// Column to compare.
        column: Column,
        /// Accepted values.
        values: &'static [&'static str],
    },
}

impl FeatureFilter {
    /// The literal text a tag predicate searches for, or `None` for column
    /// predicates.
    #[must_use]
    pub fn tag_pattern(&self) -> Option<String> {
        match self {
            Self::Tag { key, value } | Self::NotTag { key, value } => {
                Some(quoted_pair(key, value))
            }
            Self::ColumnIn { .. } => None,
        }
    }

    /// Evaluates the predicate against a feature's tag text and a column
    /// lookup, with SQL semantics for missing values: a predicate over an
    /// absent tag text or column value never holds.
    pub fn matches<'a>(
        &self,
        other_tags: Option<&str>,
        column_value: impl Fn(Column) -> Option<&'a str>,
    ) -> bool {
        match self {
            Self::Tag { key, value } => {
                other_tags.is_some_and(|text| text.contains(&quoted_pair(key, value)))
            }
            Self::NotTag { key, value } => {
                other_tags.is_some_and(|text| !text.contains(&quoted_pair(key, value)))
            }
            Self::ColumnIn { column, values } => {
                column_value(*column).is_some_and(|actual| values.iter().any(|v| *v == actual))
            }
        }
    }
}

/// A spatial lookup against a single source table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceQuery<'a> {
    /// Table to read.
    pub table: FeatureTable,
    /// Predicates that must all hold.
    pub filters: &'a [FeatureFilter],
    /// Centre of the search.
    pub point: QueryPoint,
    /// Search radius in meters.
    pub radius: u32,
}

/// A raw feature row as returned by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Feature name, if any.
    pub name: Option<String>,
    /// Centroid of the feature geometry as `GeoJSON` text.
    pub centroid: String,
    /// Serialized tag text, if any.
    pub other_tags: Option<String>,
    /// Geodesic distance from the query point in meters.
    pub distance: f64,
    /// Geodesic area of the feature in square meters, when requested.
    pub area: Option<f64>,
}

/// Per-label totals over one categorical column.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTotalRow {
    /// Column value the row is grouped by.
    pub label: String,
    /// Number of features carrying the label.
    pub count: i64,
    /// Combined geodesic area in square meters.
    pub total_area: f64,
}

/// Read-only access to the feature tables.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Returns the features of `query.table` within `query.radius` meters of
    /// `query.point` that satisfy every filter, nearest first.
    ///
    /// When `with_area` is set, each row carries the feature's area.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the lookup fails.
    async fn features(
        &self,
        query: &SourceQuery<'_>,
        with_area: bool,
    ) -> Result<Vec<FeatureRow>, DbError>;

    /// Returns per-label feature counts and total areas for the features of
    /// `query.table` within the radius that satisfy every filter, grouped by
    /// `group_by`. No ordering is implied.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the lookup fails.
    async fn label_totals(
        &self,
        query: &SourceQuery<'_>,
        group_by: Column,
    ) -> Result<Vec<LabelTotalRow>, DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_COLUMNS: fn(Column) -> Option<&'static str> = |_| None;

    #[test]
    fn tag_filter_requires_exact_quoted_pair() {
        let filter = FeatureFilter::Tag {
            key: "shop",
            value: "mall",
        };
        assert!(filter.matches(Some(r#""shop"=>"mall","name"=>"X""#), NO_COLUMNS));
        assert!(!filter.matches(Some(r#""shop"=>"mall_annex""#), NO_COLUMNS));
        assert!(!filter.matches(None, NO_COLUMNS));
    }

    #[test]
    fn negated_tag_filter_needs_tag_text() {
        let filter = FeatureFilter::NotTag {
            key: "access",
            value: "private",
        };
        assert!(filter.matches(Some(r#""access"=>"yes""#), NO_COLUMNS));
        assert!(!filter.matches(Some(r#""access"=>"private""#), NO_COLUMNS));
        assert!(!filter.matches(None, NO_COLUMNS));
    }

    #[test]
    fn column_filter_checks_membership() {
        let filter = FeatureFilter::ColumnIn {
            column: Column::Highway,
            values: &["bus_stop"],
        };
        assert!(filter.matches(None, |c| (c == Column::Highway).then_some("bus_stop")));
        assert!(!filter.matches(None, |_| Some("crossing")));
        assert!(!filter.matches(None, NO_COLUMNS));
    }
}
