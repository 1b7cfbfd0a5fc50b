//! In-test geocoder and fixture resolver.

use std::sync::Arc;

use async_trait::async_trait;
use geoscope_geocoder::{GeoclientRecord, GeocodeError, Geocoder};
use geoscope_geography_models::Bbl;
use geoscope_spatial::fixtures;

use crate::Resolver;

pub fn resolver() -> Resolver {
    Resolver::new(Arc::new(fixtures::geo_index()))
}

/// Answers BBL lookups with a fixed area code, or fails every call.
pub struct FakeGeocoder {
    area: Option<String>,
}

impl FakeGeocoder {
    pub fn with_area(code: &str) -> Self {
        Self {
            area: Some(code.to_string()),
        }
    }

    pub const fn failing() -> Self {
        Self { area: None }
    }

    fn unavailable() -> GeocodeError {
        GeocodeError::Parse {
            message: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn address(&self, _: &str, _: &str, _: &str) -> Result<GeoclientRecord, GeocodeError> {
        Err(Self::unavailable())
    }

    async fn intersection(&self, _: &str, _: &str, _: &str) -> Result<GeoclientRecord, GeocodeError> {
        Err(Self::unavailable())
    }

    async fn bbl(&self, bbl: &Bbl) -> Result<GeoclientRecord, GeocodeError> {
        let nta = self.area.clone().ok_or_else(Self::unavailable)?;
        Ok(GeoclientRecord {
            bbl: Some(*bbl),
            nta: Some(nta),
            ..GeoclientRecord::default()
        })
    }

    async fn bin(&self, _: &str) -> Result<GeoclientRecord, GeocodeError> {
        Err(Self::unavailable())
    }
}
