#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geo bundle resolution.
//!
//! Turns location records into [`GeoBundle`]s:
//!
//! 1. **Addresses** go to the geocoder's address lookup, which returns
//!    the parcel key directly.
//! 2. **Intersections** go to the intersection lookup, which returns
//!    only coordinates; the nearest parcel supplies the key.
//! 3. **Parcel keys** skip the geocoder's location lookups and are
//!    enriched from the spatial indexes.
//!
//! Every bundle is memoized in a [`BundleCache`] keyed by its parcel and
//! the lookup that reached it.
//!
//! Landmarks and placeholder text have no lookup and resolve to
//! nothing. A failed record is logged and skipped; it never aborts a
//! batch.

pub mod cache;

use std::{collections::HashSet, num::NonZeroUsize, sync::Arc};

use futures::{StreamExt as _, stream};
use geoscope_bundle_models::{CacheStats, GeoBundle};
use geoscope_geocoder::{
    GeoclientRecord, GeocodeError, Geocoder, LocationKind, LocationRecord, classify,
};
use geoscope_geography_models::{Bbl, Provenance};
use geoscope_resolve::Resolver;

pub use cache::{BundleCache, BundleKey, BundleOrigin, DEFAULT_CAPACITY};

/// Default number of records resolved concurrently.
pub const DEFAULT_WORKERS: usize = 4;

/// Resolves location records and parcel keys into enriched bundles.
pub struct BundleResolver {
    resolver: Resolver,
    cache: BundleCache,
    workers: NonZeroUsize,
}

impl BundleResolver {
    /// Resolver with the default cache capacity and worker count.
    #[must_use]
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            cache: BundleCache::default(),
            workers: NonZeroUsize::new(DEFAULT_WORKERS).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Replaces the cache with one of the given capacity.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = BundleCache::new(capacity);
        self
    }

    /// Sets how many records a batch resolves concurrently.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = NonZeroUsize::new(workers).unwrap_or(NonZeroUsize::MIN);
        self
    }

    /// The underlying identifier resolver.
    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Bundle cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Bundle for a known parcel key, from the cache when possible.
    ///
    /// Index values win over geocoder values here since no location
    /// lookup was made. The geocoder, when configured, still supplies
    /// building identifiers and fills fields the indexes lack. Returns
    /// `None` when neither the indexes nor the geocoder know the parcel.
    pub async fn resolve_bbl(&self, bbl: &Bbl) -> Option<GeoBundle> {
        let key = BundleKey::parcel(*bbl);
        if let Some(bundle) = self.cache.get(&key) {
            return Some(bundle);
        }

        let known = self.resolver.index().parcels.get(bbl).is_some();
        let record = match self.resolver.geocoder() {
            Some(geocoder) => logged(geocoder.bbl(bbl).await, "bbl", &bbl.to_string()),
            None => None,
        };
        if !known && record.is_none() {
            log::debug!("No parcel {bbl} in the index or the geocoder");
            return None;
        }

        let mut bundle = GeoBundle::default();
        bundle.set_bbl(Some(*bbl), Provenance::Input);
        if let Some(record) = &record {
            apply_record(&mut bundle, record);
        }
        self.apply_index(&mut bundle, bbl);

        Some(self.cache.insert(key, bundle))
    }

    /// Bundle for the parcel containing or nearest a WGS84 coordinate.
    pub async fn resolve_coordinate(&self, lon: f64, lat: f64) -> Option<GeoBundle> {
        let (bbl, distance) = self.resolver.parcel_for_coordinate(lon, lat)?;
        log::debug!("({lon}, {lat}) resolved to {bbl} at {distance:.1} ft");
        self.resolve_bbl(&bbl).await
    }

    /// Bundle for free location text such as `"237 Park Ave"` or
    /// `"Broadway & W 42 St"`.
    pub async fn resolve_text(&self, text: &str, borough: &str) -> Option<GeoBundle> {
        self.resolve_record(&LocationRecord::street_text(text, borough)).await
    }

    /// Bundle for one location record.
    ///
    /// Geocoder values win over index values, since the caller named a
    /// location rather than a parcel. The geocoder is asked every time;
    /// the index enrichment of a parcel it names is cached per location
    /// text.
    pub async fn resolve_record(&self, record: &LocationRecord) -> Option<GeoBundle> {
        match classify(record) {
            LocationKind::Address {
                house_number,
                street,
                borough,
            } => {
                let context = format!("{house_number} {street}, {borough}");
                let geocoder = self.geocoder_for("address", &context)?;
                let found = logged(
                    geocoder.address(&house_number, &street, &borough).await,
                    "address",
                    &context,
                )?;
                let Some(bbl) = found.bbl else {
                    log::warn!("Address lookup for {context} returned no parcel key");
                    return None;
                };
                let key = BundleKey::address(bbl, context);
                if let Some(bundle) = self.cache.get(&key) {
                    return Some(bundle);
                }

                let mut bundle = GeoBundle::default();
                bundle.set_bbl(Some(bbl), Provenance::Geocoder);
                bundle.set_address(Some(format!("{house_number} {street}")), Provenance::Input);
                self.apply_index(&mut bundle, &bbl);
                apply_record(&mut bundle, &found);
                Some(self.cache.insert(key, bundle))
            }
            LocationKind::Intersection {
                street1,
                street2,
                borough,
            } => {
                let context = format!("{street1} & {street2}, {borough}");
                let geocoder = self.geocoder_for("intersection", &context)?;
                let found = logged(
                    geocoder.intersection(&street1, &street2, &borough).await,
                    "intersection",
                    &context,
                )?;
                let Some((lon, lat)) = found.coordinates() else {
                    log::warn!("Intersection lookup for {context} returned no coordinates");
                    return None;
                };
                let Some((bbl, distance)) = self.resolver.parcel_for_coordinate(lon, lat) else {
                    log::warn!("No parcel near intersection {context}");
                    return None;
                };
                log::debug!("Intersection {context} snapped to {bbl} at {distance:.1} ft");
                let key = BundleKey::intersection(bbl, context);
                if let Some(bundle) = self.cache.get(&key) {
                    return Some(bundle);
                }

                let mut bundle = GeoBundle::default();
                bundle.set_bbl(Some(bbl), Provenance::ParcelIndex);
                bundle.set_address(Some(format!("{street1} & {street2}")), Provenance::Input);
                self.apply_index(&mut bundle, &bbl);
                apply_record(&mut bundle, &found);
                Some(self.cache.insert(key, bundle))
            }
            LocationKind::Landmark { text, borough } => {
                log::info!("Skipping landmark {text:?} ({borough}): no lookup for landmarks");
                None
            }
            LocationKind::NotGeocodable => {
                log::debug!("Skipping non-geocodable record {record:?}");
                None
            }
        }
    }

    /// Bundles for a batch of records, resolved concurrently.
    ///
    /// Output follows input order. Failed records are dropped, and a
    /// parcel already produced by an earlier record is not repeated.
    pub async fn resolve_batch(&self, records: &[LocationRecord]) -> Vec<GeoBundle> {
        let resolved: Vec<(usize, Option<GeoBundle>)> = stream::iter(records.iter().enumerate())
            .map(|(i, record)| async move { (i, self.resolve_record(record).await) })
            .buffer_unordered(self.workers.get())
            .collect()
            .await;

        let bundles = merge_in_order(resolved);
        log::info!(
            "Resolved {} of {} location records",
            bundles.len(),
            records.len()
        );
        bundles
    }

    /// Bundles for a batch of parcel keys, resolved concurrently, in
    /// input order without repeats.
    pub async fn resolve_bbls(&self, bbls: &[Bbl]) -> Vec<GeoBundle> {
        let resolved: Vec<(usize, Option<GeoBundle>)> = stream::iter(bbls.iter().enumerate())
            .map(|(i, bbl)| async move { (i, self.resolve_bbl(bbl).await) })
            .buffer_unordered(self.workers.get())
            .collect()
            .await;
        merge_in_order(resolved)
    }

    fn geocoder_for(&self, kind: &str, context: &str) -> Option<&dyn Geocoder> {
        let geocoder = self.resolver.geocoder().map(Arc::as_ref);
        if geocoder.is_none() {
            log::warn!("No geocoder configured for {kind} lookup of {context}");
        }
        geocoder
    }

    /// Fills borough, area, precinct, and coordinates from the indexes.
    fn apply_index(&self, bundle: &mut GeoBundle, bbl: &Bbl) {
        bundle.set_borough(Some(bbl.borough().to_string()), Provenance::ParcelKey);
        if let Some((code, source)) = self.resolver.area_with_source(bbl) {
            bundle.set_nta(Some(code), source);
        }
        bundle.set_precinct(self.resolver.precinct_for_parcel(bbl), Provenance::ParcelIndex);
        bundle.set_coordinates(self.resolver.coordinate_for_parcel(bbl), Provenance::ParcelIndex);
    }
}

/// Parcel keys of bundles, in order.
#[must_use]
pub fn seeds(bundles: &[GeoBundle]) -> Vec<Bbl> {
    bundles.iter().filter_map(|b| b.bbl).collect()
}

/// Copies geocoder values into a bundle. The parcel key is left to the
/// caller.
fn apply_record(bundle: &mut GeoBundle, record: &GeoclientRecord) {
    bundle.set_bins(record.bins.clone(), Provenance::Geocoder);
    bundle.set_borough(record.borough.clone(), Provenance::Geocoder);
    bundle.set_nta(record.nta.clone(), Provenance::Geocoder);
    bundle.set_precinct(record.police_precinct, Provenance::Geocoder);
    bundle.set_coordinates(record.coordinates(), Provenance::Geocoder);
    bundle.set_extra("communityDistrict", record.community_district.clone());
    bundle.set_extra("censusTract", record.census_tract.clone());
    bundle.set_extra("grc", record.grc.clone());
}

fn logged(
    result: Result<GeoclientRecord, GeocodeError>,
    kind: &str,
    context: &str,
) -> Option<GeoclientRecord> {
    match result {
        Ok(record) => Some(record),
        Err(e) => {
            log::warn!("Geocoder {kind} lookup failed for {context}: {e}");
            None
        }
    }
}

fn merge_in_order(mut resolved: Vec<(usize, Option<GeoBundle>)>) -> Vec<GeoBundle> {
    resolved.sort_by_key(|(i, _)| *i);
    let mut seen: HashSet<Bbl> = HashSet::new();
    resolved
        .into_iter()
        .filter_map(|(_, bundle)| bundle)
        .filter(|bundle| bundle.bbl.is_none_or(|bbl| seen.insert(bbl)))
        .collect()
}
