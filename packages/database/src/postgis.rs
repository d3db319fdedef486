//! `PostGIS`-backed feature store.
//!
//! Spatial lookups are compiled to raw SQL and run with
//! `query_raw_params()`. Distances and the radius filter use the
//! `geography` type so they are geodesic, not planar.
//!
//! The store owns a lazily established connection. A query acquires the
//! current connection, connecting first if there is none; when a statement
//! fails the connection is dropped so the next query starts from a fresh
//! one. Failed statements are not retried.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};
use tokio::sync::Mutex;

use crate::DbError;
use crate::db::{self, DatabaseConfig};
use crate::store::{Column, FeatureFilter, FeatureRow, FeatureStore, LabelTotalRow, SourceQuery};

/// Parameters `$1`..`$3` of every spatial query.
const GEOGRAPHY_POINT: &str = "ST_MakePoint($1, $2)::geography";

/// A [`FeatureStore`] reading the `points`, `multipolygons` and
/// `other_relations` tables of an `ogr2ogr`-style OSM import.
pub struct PostgisStore {
    config: DatabaseConfig,
    connection: Mutex<Option<Arc<dyn Database>>>,
}

impl PostgisStore {
    /// Creates a store that connects on first use.
    #[must_use]
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    /// Creates a store and connects immediately, so startup fails fast on a
    /// bad configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the initial connection fails.
    pub async fn connect(config: DatabaseConfig) -> Result<Self, DbError> {
        let store = Self::new(config);
        store.acquire().await?;
        Ok(store)
    }

    /// Returns the current connection, establishing one if needed.
    async fn acquire(&self) -> Result<Arc<dyn Database>, DbError> {
        let mut slot = self.connection.lock().await;

        if let Some(db) = slot.as_ref() {
            return Ok(Arc::clone(db));
        }

        log::info!("Connecting to database...");
        let db: Arc<dyn Database> = Arc::from(db::connect(&self.config).await?);
        *slot = Some(Arc::clone(&db));

        Ok(db)
    }

    /// Drops `failed` if it is still the current connection.
    async fn invalidate(&self, failed: &Arc<dyn Database>) {
        let mut slot = self.connection.lock().await;

        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, failed)) {
            log::warn!("Discarding database connection after a failed query");
            *slot = None;
        }
    }

    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, DbError> {
        let db = self.acquire().await?;

        match db.query_raw_params(sql, params).await {
            Ok(rows) => Ok(rows),
            Err(e) => {
                self.invalidate(&db).await;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl FeatureStore for PostgisStore {
    async fn features(
        &self,
        query: &SourceQuery<'_>,
        with_area: bool,
    ) -> Result<Vec<FeatureRow>, DbError> {
        let (sql, params) = feature_sql(query, with_area);
        let rows = self.query(&sql, &params).await?;

        rows.iter()
            .map(|row| feature_row(row, with_area))
            .collect()
    }

    async fn label_totals(
        &self,
        query: &SourceQuery<'_>,
        group_by: Column,
    ) -> Result<Vec<LabelTotalRow>, DbError> {
        let (sql, params) = label_totals_sql(query, group_by);
        let rows = self.query(&sql, &params).await?;

        rows.iter().map(label_total_row).collect()
    }
}

/// Builds the `WHERE` clause and parameters shared by both query kinds.
fn where_clause(query: &SourceQuery<'_>) -> (String, Vec<DatabaseValue>) {
    let mut sql = format!(
        " WHERE ST_DWithin(geom::geography, {GEOGRAPHY_POINT}, $3, false)"
    );
    let mut params = vec![
        DatabaseValue::Real64(query.point.longitude),
        DatabaseValue::Real64(query.point.latitude),
        DatabaseValue::Real64(f64::from(query.radius)),
    ];
    let mut param_idx = 4u32;

    for filter in query.filters {
        match filter {
            FeatureFilter::Tag { .. } | FeatureFilter::NotTag { .. } => {
                let negation = if matches!(filter, FeatureFilter::NotTag { .. }) {
                    "NOT "
                } else {
                    ""
                };
                let pattern = filter.tag_pattern().unwrap_or_default();
                write!(sql, " AND {negation}other_tags LIKE ${param_idx}").unwrap();
                params.push(DatabaseValue::String(format!("%{}%", escape_like(&pattern))));
                param_idx += 1;
            }
            FeatureFilter::ColumnIn { column, values } => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| {
                        params.push(DatabaseValue::String((*value).to_string()));
                        let placeholder = format!("${param_idx}");
                        param_idx += 1;
                        placeholder
                    })
                    .collect();
                write!(
                    sql,
                    " AND {} IN ({})",
                    column.column_name(),
                    placeholders.join(", ")
                )
                .unwrap();
            }
        }
    }

    (sql, params)
}

fn feature_sql(query: &SourceQuery<'_>, with_area: bool) -> (String, Vec<DatabaseValue>) {
    let mut sql = format!(
        "SELECT name, ST_AsGeoJSON(ST_Centroid(geom)) AS centroid, other_tags,
                ST_Distance(geom::geography, {GEOGRAPHY_POINT}) AS dist"
    );
    if with_area {
        sql.push_str(", ST_Area(geom::geography) AS area");
    }
    write!(sql, " FROM {}", query.table.table_name()).unwrap();

    let (where_sql, params) = where_clause(query);
    sql.push_str(&where_sql);
    sql.push_str(" ORDER BY dist");

    (sql, params)
}

fn label_totals_sql(query: &SourceQuery<'_>, group_by: Column) -> (String, Vec<DatabaseValue>) {
    let column = group_by.column_name();
    let mut sql = format!(
        "SELECT {column} AS label, COUNT(*) AS feature_count,
                ST_Area(ST_Collect(geom)::geography, false) AS total_area
         FROM {}",
        query.table.table_name()
    );

    let (where_sql, params) = where_clause(query);
    sql.push_str(&where_sql);
    write!(sql, " GROUP BY {column}").unwrap();

    (sql, params)
}

/// Escapes `LIKE` wildcards so tag patterns match literally.
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn feature_row(row: &Row, with_area: bool) -> Result<FeatureRow, DbError> {
    let centroid: Option<String> = row.to_value("centroid").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse centroid: {e}"),
    })?;
    let centroid = centroid.ok_or_else(|| DbError::Conversion {
        message: "Feature has no centroid".to_string(),
    })?;

    let distance: f64 = row.to_value("dist").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse distance: {e}"),
    })?;

    let area = if with_area {
        let area: f64 = row.to_value("area").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse area: {e}"),
        })?;
        Some(area)
    } else {
        None
    };

    let name: Option<String> = row.to_value("name").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse name: {e}"),
    })?;
    let other_tags: Option<String> =
        row.to_value("other_tags").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse other_tags: {e}"),
        })?;

    Ok(FeatureRow {
        name,
        centroid,
        other_tags,
        distance,
        area,
    })
}

fn label_total_row(row: &Row) -> Result<LabelTotalRow, DbError> {
    Ok(LabelTotalRow {
        label: row.to_value("label").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse label: {e}"),
        })?,
        count: row.to_value("feature_count").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse feature count: {e}"),
        })?,
        total_area: row.to_value("total_area").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse total area: {e}"),
        })?,
    })
}
