#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature store access and the proximity query engine.
//!
//! The [`engine`] turns a `(category, point, radius)` request into one or
//! more [`store::SourceQuery`] lookups against a [`store::FeatureStore`],
//! then normalizes the heterogeneous rows into
//! [`osm_service_feature_models::CategoryResult`]s.
//!
//! Two stores are provided: [`postgis::PostgisStore`], which issues
//! `PostGIS` spatial queries through `switchy_database` with
//! `query_raw_params()`, and `memory::MemoryFeatureStore`, an in-process
//! store that evaluates the same predicates with geodesic math from `geo`.
//! The memory store is only compiled with the `test-utils` feature.

pub mod catalog;
pub mod db;
pub mod engine;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod postgis;
pub mod store;

pub use engine::QueryError;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The store could not be reached or the connection could not be
    /// (re)established.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
