#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Identifier resolvers over the loaded [`GeoIndex`].
//!
//! Every lookup direction between a parcel key and the units datasets
//! are published in:
//!
//! - **Precinct**: parcel-layer attribute, see [`Resolver::precinct_for_parcel`]
//! - **Neighborhood area**: pre-joined attribute, spatial join, or the
//!   external geocoder, see [`Resolver::area_for_parcel`]
//! - **Street segment**: corridor intersection, see
//!   [`Resolver::segments_for_parcel`]
//! - **Coordinate**: representative point and nearest lot, see
//!   [`Resolver::coordinate_for_parcel`]
//!
//! Resolvers never fail. Misses and absorbed errors come back as `None`
//! or an empty `Vec` so one bad lookup cannot abort a batch.

mod area;
mod coordinate;
mod precinct;
mod street;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use geoscope_geocoder::Geocoder;
use geoscope_spatial::GeoIndex;

/// Parcel key lookups backed by the shared spatial indexes and, when
/// configured, an authoritative external geocoder.
#[derive(Clone)]
pub struct Resolver {
    index: Arc<GeoIndex>,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl Resolver {
    /// Resolver over the spatial indexes only.
    #[must_use]
    pub const fn new(index: Arc<GeoIndex>) -> Self {
        Self {
            index,
            geocoder: None,
        }
    }

    /// Adds an external geocoder consulted by the authoritative lookups.
    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// The shared spatial indexes.
    #[must_use]
    pub fn index(&self) -> &GeoIndex {
        &self.index
    }

    /// The shared spatial indexes, as the owning handle.
    #[must_use]
    pub const fn index_handle(&self) -> &Arc<GeoIndex> {
        &self.index
    }

    /// The configured external geocoder.
    #[must_use]
    pub fn geocoder(&self) -> Option<&Arc<dyn Geocoder>> {
        self.geocoder.as_ref()
    }
}
