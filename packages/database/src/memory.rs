//! In-process feature store.
//!
//! Holds features in memory and evaluates the same predicates the `PostGIS`
//! store compiles to SQL, using geodesic distances and areas from `geo`.
//! Used for fixtures, demos and tests that should not need a database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use geo::{
    Centroid, Closest, ClosestPoint, Contains, Distance, Geodesic, GeodesicArea, Geometry, Point,
    Rect, coord,
};
use geojson::GeoJson;
use osm_service_feature_models::TagCollection;

use crate::DbError;
use crate::store::{Column, FeatureRow, FeatureStore, FeatureTable, LabelTotalRow, SourceQuery};

/// A feature held by a [`MemoryFeatureStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryFeature {
    table: FeatureTable,
    geometry: Geometry<f64>,
    name: Option<String>,
    other_tags: Option<String>,
    columns: BTreeMap<Column, String>,
    recorded_area: Option<f64>,
}

impl MemoryFeature {
    /// Creates a feature from an arbitrary geometry in `(lon, lat)` order.
    #[must_use]
    pub const fn new(table: FeatureTable, geometry: Geometry<f64>) -> Self {
        Self {
            table,
            geometry,
            name: None,
            other_tags: None,
            columns: BTreeMap::new(),
            recorded_area: None,
        }
    }

    /// Creates a point feature.
    #[must_use]
    pub fn point(table: FeatureTable, lat: f64, lon: f64) -> Self {
        Self::new(table, Geometry::Point(Point::new(lon, lat)))
    }

    /// Creates an axis-aligned square polygon centred on `(lat, lon)`,
    /// extending `half_side` degrees in each direction.
    #[must_use]
    pub fn square(table: FeatureTable, lat: f64, lon: f64, half_side: f64) -> Self {
        let rect = Rect::new(
            coord! { x: lon - half_side, y: lat - half_side },
            coord! { x: lon + half_side, y: lat + half_side },
        );
        Self::new(table, Geometry::Polygon(rect.to_polygon()))
    }

    /// Sets the feature name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the serialized tag text from key/value pairs.
    #[must_use]
    pub fn tagged(mut self, tags: &[(&str, &str)]) -> Self {
        let collection: TagCollection = tags.iter().copied().collect();
        self.other_tags = Some(collection.to_tag_text());
        self
    }

    /// Sets the serialized tag text verbatim.
    #[must_use]
    pub fn with_tag_text(mut self, text: impl Into<String>) -> Self {
        self.other_tags = Some(text.into());
        self
    }

    /// Sets a categorical column value.
    #[must_use]
    pub fn with_column(mut self, column: Column, value: impl Into<String>) -> Self {
        self.columns.insert(column, value.into());
        self
    }

    /// Reports `square_meters` as the feature's area instead of the
    /// geodesic area of its geometry.
    #[must_use]
    pub fn with_area(mut self, square_meters: f64) -> Self {
        self.recorded_area = Some(square_meters);
        self
    }

    fn matches(&self, query: &SourceQuery<'_>) -> bool {
        self.table == query.table
            && query.filters.iter().all(|filter| {
                filter.matches(self.other_tags.as_deref(), |column| {
                    self.columns.get(&column).map(String::as_str)
                })
            })
    }

    /// Geodesic distance in meters from `point` to the nearest part of the
    /// geometry. Zero when the point lies inside a polygon.
    fn distance_to(&self, point: Point<f64>) -> f64 {
        if let Geometry::Point(own) = &self.geometry {
            return Geodesic.distance(*own, point);
        }

        if self.geometry.contains(&point) {
            return 0.0;
        }

        match self.geometry.closest_point(&point) {
            Closest::Intersection(nearest) | Closest::SinglePoint(nearest) => {
                Geodesic.distance(nearest, point)
            }
            Closest::Indeterminate => f64::INFINITY,
        }
    }

    fn area(&self) -> f64 {
        self.recorded_area
            .unwrap_or_else(|| self.geometry.geodesic_area_unsigned())
    }

    fn centroid_geojson(&self) -> Result<String, DbError> {
        let centroid = self
            .geometry
            .centroid()
            .ok_or_else(|| DbError::Conversion {
                message: "Feature geometry has no centroid".to_string(),
            })?;

        let geometry = geojson::Geometry::new(geojson::Value::from(&centroid));
        Ok(GeoJson::from(geometry).to_string())
    }
}

/// A [`FeatureStore`] over an in-memory feature list.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeatureStore {
    features: Vec<MemoryFeature>,
}

impl MemoryFeatureStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Adds a feature, builder style.
    #[must_use]
    pub fn with(mut self, feature: MemoryFeature) -> Self {
        self.features.push(feature);
        self
    }

    fn within<'a>(
        &'a self,
        query: &'a SourceQuery<'_>,
    ) -> impl Iterator<Item = (&'a MemoryFeature, f64)> + 'a {
        let origin = Point::new(query.point.longitude, query.point.latitude);
        let radius = f64::from(query.radius);

        self.features
            .iter()
            .filter(move |feature| feature.matches(query))
            .map(move |feature| (feature, feature.distance_to(origin)))
            .filter(move |(_, distance)| *distance <= radius)
    }
}

#[async_trait]
impl FeatureStore for MemoryFeatureStore {
    async fn features(
        &self,
        query: &SourceQuery<'_>,
        with_area: bool,
    ) -> Result<Vec<FeatureRow>, DbError> {
        let mut matches: Vec<_> = self.within(query).collect();
        matches.sort_by(|(_, a), (_, b)| a.total_cmp(b));

        matches
            .into_iter()
            .map(|(feature, distance)| {
                Ok(FeatureRow {
                    name: feature.name.clone(),
                    centroid: feature.centroid_geojson()?,
                    other_tags: feature.other_tags.clone(),
                    distance,
                    area: with_area.then(|| feature.area()),
                })
            })
            .collect()
    }

    async fn label_totals(
        &self,
        query: &SourceQuery<'_>,
        group_by: Column,
    ) -> Result<Vec<LabelTotalRow>, DbError> {
        let mut totals: BTreeMap<&str, (i64, f64)> = BTreeMap::new();

        for (feature, _) in self.within(query) {
            let Some(label) = feature.columns.get(&group_by) else {
                continue;
            };
            let entry = totals.entry(label.as_str()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += feature.area();
        }

        Ok(totals
            .into_iter()
            .map(|(label, (count, total_area))| LabelTotalRow {
                label: label.to_string(),
                count,
                total_area,
            })
            .collect())
    }
}
