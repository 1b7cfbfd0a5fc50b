//! NYC Geoclient v2 client.
//!
//! Geoclient fronts the Department of City Planning's Geosupport. Every
//! endpoint answers with a single-key object (`{"address": {...}}`)
//! whose section holds several hundred flat fields. Only the fields
//! geoscope uses are normalized; the full section is kept in
//! [`GeoclientRecord::raw`].
//!
//! See <https://api-portal.nyc.gov/api-details#api=geoclient>

use std::time::Duration;

use async_trait::async_trait;
use geoscope_geography_models::{Bbl, Borough, borough::borough_name_for_code, normalize_area_code};
use geoscope_http::{DEFAULT_TIMEOUT, HttpError, send_json};
use serde_json::{Map, Value};

use crate::{GeoclientRecord, GeocodeError, Geocoder};

/// Public Geoclient v2 endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.nyc.gov/geoclient/v2";

/// Header carrying the API subscription key.
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Prefix shared by the numbered BIN fields of multi-building lots
/// (`giBuildingIdentificationNumber1`, `...2`, ...), lowercased.
const GI_BIN_PREFIX: &str = "gibuildingidentificationnumber";

/// Connection settings for [`GeoclientClient`].
#[derive(Debug, Clone)]
pub struct GeoclientConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Subscription key.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GeoclientConfig {
    /// Settings for the public endpoint with the default timeout.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP client for Geoclient.
pub struct GeoclientClient {
    client: reqwest::Client,
    config: GeoclientConfig,
}

impl GeoclientClient {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(config: GeoclientConfig) -> Result<Self, GeocodeError> {
        Ok(Self {
            client: geoscope_http::client(config.timeout)?,
            config,
        })
    }

    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<GeoclientRecord, GeocodeError> {
        let url = format!("{}/{endpoint}.json", self.config.base_url.trim_end_matches('/'));
        log::debug!("Geoclient {endpoint}: {params:?}");

        let body = send_json(|| {
            self.client
                .get(&url)
                .header(KEY_HEADER, &self.config.api_key)
                .query(params)
        })
        .await
        .map_err(|e: HttpError| {
            if e.is_rate_limited() {
                GeocodeError::RateLimited
            } else {
                GeocodeError::Http(e)
            }
        })?;

        let record = parse_response(&body, endpoint)?;
        if !record.is_exact() {
            log::debug!(
                "Geoclient {endpoint} returned grc={:?} for {params:?}",
                record.grc
            );
        }
        Ok(record)
    }
}

#[async_trait]
impl Geocoder for GeoclientClient {
    async fn address(
        &self,
        house_number: &str,
        street: &str,
        borough: &str,
    ) -> Result<GeoclientRecord, GeocodeError> {
        self.fetch(
            "address",
            &[
                ("houseNumber", house_number),
                ("street", street),
                ("borough", borough),
            ],
        )
        .await
    }

    async fn intersection(
        &self,
        street1: &str,
        street2: &str,
        borough: &str,
    ) -> Result<GeoclientRecord, GeocodeError> {
        self.fetch(
            "intersection",
            &[
                ("crossStreetOne", street1),
                ("crossStreetTwo", street2),
                ("borough", borough),
            ],
        )
        .await
    }

    async fn bbl(&self, bbl: &Bbl) -> Result<GeoclientRecord, GeocodeError> {
        let borough = bbl.borough().to_string();
        let block = bbl.block_padded(5);
        let lot = bbl.lot_padded(4);
        self.fetch(
            "bbl",
            &[("borough", &borough), ("block", &block), ("lot", &lot)],
        )
        .await
    }

    async fn bin(&self, bin: &str) -> Result<GeoclientRecord, GeocodeError> {
        self.fetch("bin", &[("bin", bin)]).await
    }
}

/// Extracts and normalizes the named section of a response body.
///
/// # Errors
///
/// Returns [`GeocodeError::Parse`] if the section is missing or not an
/// object.
pub fn parse_response(body: &Value, section: &str) -> Result<GeoclientRecord, GeocodeError> {
    let section_map = body
        .get(section)
        .and_then(Value::as_object)
        .ok_or_else(|| GeocodeError::Parse {
            message: format!("Geoclient response missing '{section}' section"),
        })?;
    Ok(normalize(section_map))
}

/// Normalizes a response section.
#[must_use]
pub fn normalize(section: &Map<String, Value>) -> GeoclientRecord {
    GeoclientRecord {
        bbl: section_bbl(section),
        bins: extract_bins(section),
        borough: section_borough(section),
        nta: text(section, "nta2020")
            .or_else(|| text(section, "nta"))
            .and_then(|code| normalize_area_code(&code)),
        police_precinct: text(section, "policePrecinct").and_then(|p| p.parse().ok()),
        community_district: text(section, "communityDistrict"),
        census_tract: text(section, "censusTract2010").or_else(|| text(section, "censusTract")),
        latitude: number(section, "latitude"),
        longitude: number(section, "longitude"),
        grc: text(section, "geosupportReturnCode"),
        raw: section.clone(),
    }
}

/// Building identification numbers in a section, digits only, sorted
/// and de-duplicated.
#[must_use]
pub fn extract_bins(section: &Map<String, Value>) -> Vec<String> {
    let mut bins: Vec<String> = section
        .iter()
        .filter(|(key, _)| {
            key.as_str() == "buildingIdentificationNumber"
                || key.as_str() == "bin"
                || key.to_lowercase().starts_with(GI_BIN_PREFIX)
        })
        .filter_map(|(key, _)| text(section, key))
        .filter(|bin| bin.bytes().all(|b| b.is_ascii_digit()))
        .collect();
    bins.sort();
    bins.dedup();
    bins
}

fn section_bbl(section: &Map<String, Value>) -> Option<Bbl> {
    if let Some(bbl) = text(section, "bbl").and_then(|s| s.parse().ok()) {
        return Some(bbl);
    }
    let borough = text(section, "bblBoroughCode")?;
    let block = text(section, "bblTaxBlock")?;
    let lot = text(section, "bblTaxLot")?;
    Bbl::compose(&borough, &block, &lot).ok()
}

fn section_borough(section: &Map<String, Value>) -> Option<String> {
    text(section, "boroughName")
        .or_else(|| text(section, "firstBoroughName"))
        .map(|name| Borough::from_name(&name).map_or(name, |b| b.to_string()))
        .or_else(|| {
            text(section, "boroughCode1In")
                .and_then(|code| borough_name_for_code(&code))
                .map(ToString::to_string)
        })
}

fn text(section: &Map<String, Value>, key: &str) -> Option<String> {
    match section.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(section: &Map<String, Value>, key: &str) -> Option<f64> {
    match section.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}
