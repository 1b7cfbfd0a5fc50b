#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial indexes over NYC geodata.
//!
//! Loads three `GeoJSON` layers at startup, reprojects them into NY
//! State Plane feet, and builds R-tree indexes over them:
//!
//! 1. **Parcels** (`MapPLUTO` tax lots) keyed by BBL.
//! 2. **Streets** (LION centerlines) with width-based corridor buffers
//!    and a lazily built endpoint graph.
//! 3. **Neighborhood areas** (NTA / CDTA polygons).
//!
//! The indexes are read-only after load and are shared across requests
//! through a single [`GeoIndex`].

pub mod area;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod geometry;
pub mod parcel;
pub mod source;
pub mod street;

use std::path::PathBuf;

use geoscope_geography_models::BblError;
use geoscope_projection::ProjectionError;
use geoscope_spatial_models::{BufferPolicy, GeoSources};
use thiserror::Error;

pub use area::{AreaIndex, NeighborhoodArea};
pub use parcel::{Parcel, ParcelIndex};
pub use source::{Layer, LayerFeature};
pub use street::{Adjacency, NodeKey, StreetIndex, StreetSegment};

/// Errors from reading spatial layers.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// A source path could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A layer is not valid `GeoJSON`.
    #[error("GeoJSON error in layer '{layer}': {source}")]
    GeoJson {
        /// Layer name.
        layer: String,
        /// Underlying error.
        source: Box<geojson::Error>,
    },

    /// A layer's CRS is missing or unsupported.
    #[error("CRS error in layer '{layer}': {message}")]
    Crs {
        /// Layer name.
        layer: String,
        /// What went wrong.
        message: String,
    },

    /// A layer is missing required structure (layers, columns).
    #[error("Source error in '{layer}': {message}")]
    Source {
        /// Layer or source name.
        layer: String,
        /// What went wrong.
        message: String,
    },

    /// A parcel row's key could not be composed.
    #[error("Invalid parcel key in layer '{layer}' row {row}: {source}")]
    ParcelKey {
        /// Layer name.
        layer: String,
        /// Zero-based feature index.
        row: usize,
        /// Underlying error.
        source: BblError,
    },

    /// Reprojection failed.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// The three spatial indexes, loaded together and shared read-only.
pub struct GeoIndex {
    /// Tax-lot parcels.
    pub parcels: ParcelIndex,
    /// Street centerlines.
    pub streets: StreetIndex,
    /// Neighborhood areas.
    pub areas: AreaIndex,
}

impl GeoIndex {
    /// Bundles already-built indexes.
    #[must_use]
    pub const fn new(parcels: ParcelIndex, streets: StreetIndex, areas: AreaIndex) -> Self {
        Self {
            parcels,
            streets,
            areas,
        }
    }

    /// Reads all three layers and builds their indexes.
    ///
    /// # Errors
    ///
    /// Returns the first [`SpatialError`] hit by any layer. Any load
    /// failure is fatal.
    pub fn load(sources: &GeoSources, policy: BufferPolicy) -> Result<Self, SpatialError> {
        let parcels = ParcelIndex::load(&sources.parcels)?;
        let streets = StreetIndex::load(&sources.streets, policy)?;
        let areas = AreaIndex::load(&sources.areas)?;

        log::info!(
            "Geo index ready: {} parcels, {} street segments, {} areas",
            parcels.len(),
            streets.len(),
            areas.len()
        );

        Ok(Self::new(parcels, streets, areas))
    }
}
