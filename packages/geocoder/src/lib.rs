#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! External geocoding for NYC locations.
//!
//! Wraps the NYC Geoclient v2 API behind the [`Geocoder`] trait:
//!
//! 1. **Address** lookups (house number, street, borough).
//! 2. **Intersection** lookups (two cross streets, borough).
//! 3. **BBL** and **BIN** lookups for parcel and building attributes.
//!
//! Responses are normalized into a flat [`GeoclientRecord`]. Also
//! provides [`address::classify`] for sorting loosely structured
//! location records into the right lookup.

pub mod address;
pub mod geoclient;

use async_trait::async_trait;
use geoscope_geography_models::{Bbl, Precinct};
use geoscope_http::HttpError;
use serde::Serialize;
use thiserror::Error;

pub use address::{LocationKind, LocationRecord, classify};
pub use geoclient::{GeoclientClient, GeoclientConfig};

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The request could not be formed from the input.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input.
        message: String,
    },

    /// Rate limit exceeded after retries.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// A normalized Geoclient response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoclientRecord {
    /// Tax-lot key.
    pub bbl: Option<Bbl>,
    /// Building identification numbers on the lot, sorted.
    pub bins: Vec<String>,
    /// Borough name.
    pub borough: Option<String>,
    /// Neighborhood area code, normalized.
    pub nta: Option<String>,
    /// Police precinct.
    pub police_precinct: Option<Precinct>,
    /// Community district.
    pub community_district: Option<String>,
    /// Census tract.
    pub census_tract: Option<String>,
    /// WGS84 latitude.
    pub latitude: Option<f64>,
    /// WGS84 longitude.
    pub longitude: Option<f64>,
    /// Geosupport return code; `"00"` is an exact match.
    pub grc: Option<String>,
    /// The response section as returned.
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl GeoclientRecord {
    /// Whether Geosupport reported an exact match.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.grc.as_deref() == Some("00")
    }

    /// WGS84 `(longitude, latitude)`, when both are present.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.longitude?, self.latitude?))
    }
}

/// An external geocoding service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Looks up a street address.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service call fails.
    async fn address(
        &self,
        house_number: &str,
        street: &str,
        borough: &str,
    ) -> Result<GeoclientRecord, GeocodeError>;

    /// Looks up the intersection of two streets.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service call fails.
    async fn intersection(
        &self,
        street1: &str,
        street2: &str,
        borough: &str,
    ) -> Result<GeoclientRecord, GeocodeError>;

    /// Looks up a tax lot.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service call fails.
    async fn bbl(&self, bbl: &Bbl) -> Result<GeoclientRecord, GeocodeError>;

    /// Looks up a building. The record's BBL is composed from its
    /// borough/block/lot parts when the service omits the whole key.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service call fails.
    async fn bin(&self, bin: &str) -> Result<GeoclientRecord, GeocodeError>;

    /// Looks up a one-line address such as `"237 Park Ave"`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::InvalidInput`] if the text has no leading
    /// house number, else whatever [`Geocoder::address`] returns.
    async fn address_line(
        &self,
        address: &str,
        borough: &str,
    ) -> Result<GeoclientRecord, GeocodeError> {
        let (house_number, street) =
            address::split_house_number(address).ok_or_else(|| GeocodeError::InvalidInput {
                message: format!("no house number in '{address}'"),
            })?;
        self.address(&house_number, &street, borough).await
    }

    /// Lot key for a building, `None` when the service cannot place it.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service call fails.
    async fn bbl_for_bin(&self, bin: &str) -> Result<Option<Bbl>, GeocodeError> {
        Ok(self.bin(bin).await?.bbl)
    }

    /// Buildings on a lot, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service call fails.
    async fn bins_for_bbl(&self, bbl: &Bbl) -> Result<Vec<String>, GeocodeError> {
        Ok(self.bbl(bbl).await?.bins)
    }
}
