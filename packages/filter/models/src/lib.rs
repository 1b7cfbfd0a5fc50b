#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset geo configuration and filter types.
//!
//! Every downstream dataset is keyed by some geographic unit: a parcel
//! key, a precinct, a neighborhood area, a street segment, a point
//! location, separate borough/block/lot columns, or a borough name. A
//! [`DatasetGeoConfig`] declares which one and how its columns are
//! spelled; a [`DatasetFilter`] is the `$where`/`$limit` pair built for
//! it.

use geoscope_scope_models::{ScopeMode, SurroundingOptions};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Default ceiling on rows fetched per dataset.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Row limit of the unfiltered preview used when a scope converts to no
/// values.
pub const DEFAULT_PREVIEW_LIMIT: u32 = 50;

/// Default circle radius for point datasets, in feet.
pub const DEFAULT_CIRCLE_FT: f64 = 500.0;

/// The unit a dataset's rows are keyed by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum GeoUnit {
    /// Ten-digit parcel key in one column.
    #[serde(rename = "BBL")]
    #[strum(serialize = "BBL")]
    Bbl,
    /// Police precinct number.
    #[serde(rename = "PRECINCT")]
    #[strum(serialize = "PRECINCT")]
    Precinct,
    /// Neighborhood area code.
    #[serde(rename = "NTA", alias = "NTA Code")]
    #[strum(to_string = "NTA", serialize = "NTA Code")]
    Nta,
    /// Street segment id.
    #[serde(rename = "SEGMENT")]
    #[strum(serialize = "SEGMENT")]
    Segment,
    /// Point location within a circle around each parcel.
    #[serde(rename = "RADIUS")]
    #[strum(serialize = "RADIUS")]
    Radius,
    /// Borough, block, and lot in separate columns.
    #[serde(rename = "BBL_SPLIT")]
    #[strum(serialize = "BBL_SPLIT")]
    BblSplit,
    /// Borough name or code.
    #[serde(rename = "BOROUGH")]
    #[strum(serialize = "BOROUGH")]
    Borough,
}

/// How a dataset spells boroughs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BoroughFormat {
    /// Numeric code, `"1"`.
    #[default]
    Code,
    /// Name, `"Manhattan"`.
    Name,
    /// Upper-case name, `"MANHATTAN"`.
    UpperName,
}

/// Column names a dataset uses for each unit. Only the ones its geo unit
/// needs must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoColumns {
    /// Parcel key column.
    pub bbl: Option<String>,
    /// Precinct column.
    pub precinct: Option<String>,
    /// Neighborhood area code column.
    pub nta: Option<String>,
    /// Street segment id column.
    pub segment: Option<String>,
    /// Point location column, for circle filters.
    pub location: Option<String>,
    /// Borough column.
    pub borough: Option<String>,
    /// Block column.
    pub block: Option<String>,
    /// Lot column.
    pub lot: Option<String>,
}

/// Geo configuration for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetGeoConfig {
    /// Dataset identifier at the tabular service (Socrata four-by-four).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Unit rows are keyed by; `None` for datasets with no geographic
    /// key.
    #[serde(default)]
    pub geo_unit: Option<GeoUnit>,
    /// Filter by the surrounding scope rather than the first seed only.
    #[serde(default)]
    pub surrounding: bool,
    /// Surrounding-scope algorithm.
    #[serde(default)]
    pub mode: ScopeMode,
    /// Radius for radius-mode scopes and circle filters, in feet.
    #[serde(default)]
    pub radius_ft: Option<f64>,
    /// Keep the seed parcels in the surrounding scope.
    #[serde(default = "default_true")]
    pub include_self: bool,
    /// Column names.
    #[serde(default)]
    pub columns: GeoColumns,
    /// Borough spelling for borough and split-key filters.
    #[serde(default)]
    pub borough_format: BoroughFormat,
    /// Zero-padding width of the block column; `0` for none.
    #[serde(default = "default_block_width")]
    pub block_width: usize,
    /// Zero-padding width of the lot column; `0` for none.
    #[serde(default = "default_lot_width")]
    pub lot_width: usize,
    /// Row limit, capped at the global ceiling.
    #[serde(default)]
    pub limit: Option<u32>,
}

const fn default_true() -> bool {
    true
}

const fn default_block_width() -> usize {
    5
}

const fn default_lot_width() -> usize {
    4
}

impl DatasetGeoConfig {
    /// Surrounding-scope options for this dataset.
    #[must_use]
    pub fn surrounding_options(&self) -> SurroundingOptions {
        SurroundingOptions {
            mode: self.mode,
            radius_ft: self.radius_ft,
            include_self: self.include_self,
            ..SurroundingOptions::default()
        }
    }

    /// The column the geo unit filters on, for single-column units.
    #[must_use]
    pub fn unit_column(&self) -> Option<&str> {
        let columns = &self.columns;
        match self.geo_unit? {
            GeoUnit::Bbl => columns.bbl.as_deref(),
            GeoUnit::Precinct => columns.precinct.as_deref(),
            GeoUnit::Nta => columns.nta.as_deref(),
            GeoUnit::Segment => columns.segment.as_deref(),
            GeoUnit::Radius => columns.location.as_deref(),
            GeoUnit::Borough => columns.borough.as_deref(),
            GeoUnit::BblSplit => None,
        }
    }
}

/// What kind of filter was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FilterKind {
    /// Restricted to the resolved scope.
    Scoped,
    /// The scope converted to no values; a small unfiltered sample.
    Preview,
    /// The dataset has no geographic key; unfiltered up to the ceiling.
    Unscoped,
}

/// A `$where`/`$limit` pair for one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFilter {
    /// Dataset identifier.
    pub dataset_id: String,
    /// `SoQL` predicate; `None` for previews and unscoped datasets.
    pub where_clause: Option<String>,
    /// Row limit.
    pub limit: u32,
    /// What kind of filter this is.
    pub kind: FilterKind,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn geo_unit_names() {
        assert_eq!(GeoUnit::from_str("NTA Code").unwrap(), GeoUnit::Nta);
        assert_eq!(GeoUnit::from_str("bbl_split").unwrap(), GeoUnit::BblSplit);
        assert_eq!(GeoUnit::Nta.to_string(), "NTA");
        assert!(GeoUnit::from_str("").is_err());
    }

    #[test]
    fn config_defaults() {
        let config: DatasetGeoConfig = toml::from_str(
            r#"
            id = "abcd-1234"
            name = "Example"
            geo_unit = "NTA Code"

            [columns]
            nta = "nta_code"
            "#,
        )
        .unwrap();
        assert_eq!(config.geo_unit, Some(GeoUnit::Nta));
        assert_eq!(config.unit_column(), Some("nta_code"));
        assert!(!config.surrounding);
        assert!(config.include_self);
        assert_eq!(config.mode, ScopeMode::Street);
        assert_eq!((config.block_width, config.lot_width), (5, 4));
        assert_eq!(config.borough_format, BoroughFormat::Code);
    }

    #[test]
    fn surrounding_options_follow_config() {
        let config: DatasetGeoConfig = toml::from_str(
            r#"
            id = "abcd-1234"
            name = "Example"
            surrounding = true
            mode = "radius"
            radius_ft = 250.0
            include_self = false
            "#,
        )
        .unwrap();
        let options = config.surrounding_options();
        assert_eq!(options.mode, ScopeMode::Radius);
        assert_eq!(options.radius_ft, Some(250.0));
        assert!(!options.include_self);
        assert_eq!(config.geo_unit, None);
    }
}
