#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset filters for resolved scopes.
//!
//! Turns a set of seed parcels into a `SoQL` `$where`/`$limit` pair for
//! each configured dataset, in whatever unit and column spelling that
//! dataset uses. Dataset configurations are embedded TOML (see
//! [`registry`]); [`socrata`] fetches the filtered rows.

pub mod builder;
pub mod points;
pub mod registry;
pub mod socrata;

use geoscope_http::HttpError;
use thiserror::Error;

pub use builder::FilterBuilder;
pub use geoscope_filter_models::{
    DatasetFilter, DatasetGeoConfig, FilterKind, GeoUnit, DEFAULT_PREVIEW_LIMIT, DEFAULT_ROW_LIMIT,
};
pub use points::{PointColumns, rows_in_scope};
pub use socrata::{DatasetService, SocrataClient};

/// Errors from dataset configuration and fetching.
#[derive(Debug, Error)]
pub enum FilterError {
    /// HTTP request failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A dataset configuration failed to parse.
    #[error("invalid dataset config: {0}")]
    Config(#[from] toml::de::Error),

    /// No dataset with the given id or name.
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    /// The service answered with something other than rows.
    #[error("unexpected response from {url}: {message}")]
    Response {
        /// Request URL.
        url: String,
        /// What was wrong.
        message: String,
    },
}
