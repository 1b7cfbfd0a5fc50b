#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geo bundle types.
//!
//! A [`GeoBundle`] is everything geoscope knows about one resolved
//! location. Each populated field records in [`GeoBundle::sources`]
//! which collaborator supplied it, so callers can tell a Geoclient
//! precinct from one read off the parcel layer.

use std::collections::BTreeMap;

use geoscope_geography_models::{Bbl, Precinct, Provenance};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter};

/// A bundle field that carries provenance.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BundleField {
    /// Parcel key.
    Bbl,
    /// Building identification numbers.
    Bins,
    /// Borough name.
    Borough,
    /// Neighborhood area code.
    Nta,
    /// Police precinct.
    Precinct,
    /// Address text.
    Address,
    /// Longitude and latitude.
    Coordinates,
}

/// A resolved, enriched location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBundle {
    /// Parcel key.
    pub bbl: Option<Bbl>,
    /// Building identification numbers on the lot, sorted.
    pub bins: Vec<String>,
    /// Borough name.
    pub borough: Option<String>,
    /// Neighborhood area code.
    pub nta: Option<String>,
    /// Police precinct.
    pub precinct: Option<Precinct>,
    /// Address text.
    pub address: Option<String>,
    /// WGS84 longitude.
    pub longitude: Option<f64>,
    /// WGS84 latitude.
    pub latitude: Option<f64>,
    /// Which collaborator supplied each populated field.
    pub sources: BTreeMap<BundleField, Provenance>,
    /// Open extension fields (community district, census tract, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

// Each setter ignores `None`, so a preferred source applied after a
// fallback source overwrites it only where it has a value.
impl GeoBundle {
    /// Sets the parcel key.
    pub fn set_bbl(&mut self, bbl: Option<Bbl>, source: Provenance) {
        if let Some(bbl) = bbl {
            self.bbl = Some(bbl);
            self.sources.insert(BundleField::Bbl, source);
        }
    }

    /// Sets the building identifiers, sorted and deduplicated. An empty
    /// list is ignored.
    pub fn set_bins(&mut self, mut bins: Vec<String>, source: Provenance) {
        if !bins.is_empty() {
            bins.sort_unstable();
            bins.dedup();
            self.bins = bins;
            self.sources.insert(BundleField::Bins, source);
        }
    }

    /// Sets the borough name.
    pub fn set_borough(&mut self, borough: Option<String>, source: Provenance) {
        if let Some(borough) = borough {
            self.borough = Some(borough);
            self.sources.insert(BundleField::Borough, source);
        }
    }

    /// Sets the neighborhood area code.
    pub fn set_nta(&mut self, nta: Option<String>, source: Provenance) {
        if let Some(nta) = nta {
            self.nta = Some(nta);
            self.sources.insert(BundleField::Nta, source);
        }
    }

    /// Sets the police precinct.
    pub fn set_precinct(&mut self, precinct: Option<Precinct>, source: Provenance) {
        if let Some(precinct) = precinct {
            self.precinct = Some(precinct);
            self.sources.insert(BundleField::Precinct, source);
        }
    }

    /// Sets the address text.
    pub fn set_address(&mut self, address: Option<String>, source: Provenance) {
        if let Some(address) = address {
            self.address = Some(address);
            self.sources.insert(BundleField::Address, source);
        }
    }

    /// Sets WGS84 `(longitude, latitude)`.
    pub fn set_coordinates(&mut self, coordinates: Option<(f64, f64)>, source: Provenance) {
        if let Some((lon, lat)) = coordinates {
            self.longitude = Some(lon);
            self.latitude = Some(lat);
            self.sources.insert(BundleField::Coordinates, source);
        }
    }

    /// Stores an extension field, ignoring `None`.
    pub fn set_extra(&mut self, key: &str, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.extras.insert(key.to_string(), value.into());
        }
    }

    /// Where a field came from.
    #[must_use]
    pub fn source_of(&self, field: BundleField) -> Option<Provenance> {
        self.sources.get(&field).copied()
    }

    /// WGS84 `(longitude, latitude)`, when both are present.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.longitude?, self.latitude?))
    }
}

/// Bundle cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to build a bundle.
    pub misses: u64,
    /// Bundles currently cached.
    pub size: usize,
    /// Maximum bundles kept.
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_source_overwrites_only_present_values() {
        let mut bundle = GeoBundle::default();
        bundle.set_precinct(Some(18), Provenance::ParcelIndex);
        bundle.set_nta(Some("MN05".to_string()), Provenance::SpatialJoin);

        bundle.set_precinct(Some(14), Provenance::Geocoder);
        bundle.set_nta(None, Provenance::Geocoder);

        assert_eq!(bundle.precinct, Some(14));
        assert_eq!(bundle.source_of(BundleField::Precinct), Some(Provenance::Geocoder));
        assert_eq!(bundle.nta.as_deref(), Some("MN05"));
        assert_eq!(bundle.source_of(BundleField::Nta), Some(Provenance::SpatialJoin));
    }

    #[test]
    fn unset_fields_have_no_source() {
        let mut bundle = GeoBundle::default();
        bundle.set_bins(vec![], Provenance::Geocoder);
        bundle.set_coordinates(None, Provenance::Geocoder);
        assert!(bundle.sources.is_empty());
        assert_eq!(bundle.coordinates(), None);
    }

    #[test]
    fn bins_are_sorted_without_repeats() {
        let mut bundle = GeoBundle::default();
        let bins = ["1000003", "1000001", "1000003", "1000002"];
        bundle.set_bins(bins.iter().map(ToString::to_string).collect(), Provenance::Geocoder);
        assert_eq!(bundle.bins, vec!["1000001", "1000002", "1000003"]);
        assert_eq!(bundle.source_of(BundleField::Bins), Some(Provenance::Geocoder));
    }

    #[test]
    fn serializes_sources_by_field_name() {
        let mut bundle = GeoBundle::default();
        bundle.set_bbl("1013007501".parse().ok(), Provenance::Geocoder);
        bundle.set_coordinates(Some((-73.97, 40.75)), Provenance::ParcelIndex);
        bundle.set_extra("censusTract", Some("96"));
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["bbl"], "1013007501");
        assert_eq!(json["sources"]["bbl"], "geocoder");
        assert_eq!(json["sources"]["coordinates"], "parcel_index");
        assert_eq!(json["extras"]["censusTract"], "96");
    }
}
