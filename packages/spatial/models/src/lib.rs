#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared configuration types for the geoscope spatial layers.
//!
//! Source datasets publish the same logical field under different
//! column names depending on vintage and export tool (`BoroCode` vs
//! `borough`, `StreetWidth_Max` vs `RW_WIDTH`). The [`columns`] module
//! holds the alias tables the loaders resolve once per layer. The
//! [`BufferPolicy`] controls how street centerlines become corridors.

pub mod columns;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How street segments are widened into corridor polygons.
///
/// A segment with a known width `w` is buffered by `w + increment_ft`;
/// a segment with no width uses `default_ft`. Either way the result is
/// clamped to `[min_ft, max_ft]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BufferPolicy {
    /// Upper bound on any width-derived buffer, in feet.
    pub max_ft: f64,
    /// Lower bound on any width-derived buffer, in feet.
    pub min_ft: f64,
    /// Added to a segment's published width, in feet.
    pub increment_ft: f64,
    /// Used for segments with no published width, in feet.
    pub default_ft: f64,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            max_ft: 120.0,
            min_ft: 10.0,
            increment_ft: 10.0,
            default_ft: 30.0,
        }
    }
}

impl BufferPolicy {
    /// Buffer distance for a segment with the given published width.
    #[must_use]
    pub fn width_buffer(&self, width_ft: Option<f64>) -> f64 {
        let raw = match width_ft {
            Some(w) if w.is_finite() => w + self.increment_ft,
            _ => self.default_ft,
        };
        raw.max(self.min_ft).min(self.max_ft)
    }

    /// Buffer distance for a segment, honoring a fixed caller override.
    ///
    /// A fixed distance bypasses the width policy entirely, including the
    /// clamp.
    #[must_use]
    pub fn resolve(&self, width_ft: Option<f64>, fixed_ft: Option<f64>) -> f64 {
        fixed_ft.map_or_else(|| self.width_buffer(width_ft), f64::abs)
    }

    /// Largest buffer any segment can receive under this policy.
    #[must_use]
    pub fn max_for(&self, fixed_ft: Option<f64>) -> f64 {
        fixed_ft.map_or(self.max_ft, f64::abs)
    }
}

/// Where to read one spatial layer from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// A `GeoJSON` file, or a directory holding one `GeoJSON` file per
    /// layer.
    pub path: PathBuf,
    /// Explicit layer (file stem) to read from a directory source.
    #[serde(default)]
    pub layer: Option<String>,
    /// EPSG code to assume when the file does not declare its CRS.
    #[serde(default)]
    pub epsg: Option<u32>,
}

impl SourceConfig {
    /// Source at `path` with layer and CRS detected from the data.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layer: None,
            epsg: None,
        }
    }
}

/// The three layers a geoscope index is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoSources {
    /// Tax-lot polygons (`MapPLUTO`).
    pub parcels: SourceConfig,
    /// Street centerlines (LION).
    pub streets: SourceConfig,
    /// Neighborhood tabulation areas (NTA / CDTA).
    pub areas: SourceConfig,
}

/// Layer-name fragment preferred when a parcel source directory holds
/// several layers.
pub const PARCEL_LAYER_HINT: &str = "mappluto";

/// Layer-name fragment preferred when a street source directory holds
/// several layers.
pub const STREET_LAYER_HINT: &str = "lion";

/// Layer-name fragment preferred when an area source directory holds
/// several layers.
pub const AREA_LAYER_HINT: &str = "nta";
