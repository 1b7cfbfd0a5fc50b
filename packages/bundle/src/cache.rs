//! Capped memoization of bundles by parcel key and origin.
//!
//! Parcels never change while the process runs, so a bundle built once
//! stays valid. A parcel reached through an address or an intersection
//! carries geocoder values a bare parcel lookup lacks, so each origin is
//! cached separately. The table is capped and evicts the oldest entry first.
//! The lock covers only the lookup and the check-then-insert; bundles
//! are built outside it.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use geoscope_bundle_models::{CacheStats, GeoBundle};
use geoscope_geography_models::Bbl;

/// Default number of cached bundles.
pub const DEFAULT_CAPACITY: usize = 4096;

/// How a bundle's parcel was reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BundleOrigin {
    /// The parcel key itself.
    Parcel,
    /// A geocoded address, by its normalized text.
    Address(String),
    /// A geocoded intersection, by its normalized text.
    Intersection(String),
}

/// Cache key: a parcel plus the lookup that reached it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleKey {
    /// Parcel key.
    pub bbl: Bbl,
    /// Lookup that produced the parcel.
    pub origin: BundleOrigin,
}

impl BundleKey {
    /// Key for a parcel looked up directly.
    #[must_use]
    pub const fn parcel(bbl: Bbl) -> Self {
        Self {
            bbl,
            origin: BundleOrigin::Parcel,
        }
    }

    /// Key for a parcel reached through address text.
    #[must_use]
    pub fn address(bbl: Bbl, text: impl Into<String>) -> Self {
        Self {
            bbl,
            origin: BundleOrigin::Address(text.into()),
        }
    }

    /// Key for a parcel reached through intersection text.
    #[must_use]
    pub fn intersection(bbl: Bbl, text: impl Into<String>) -> Self {
        Self {
            bbl,
            origin: BundleOrigin::Intersection(text.into()),
        }
    }
}

impl fmt::Display for BundleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            BundleOrigin::Parcel => write!(f, "{}", self.bbl),
            BundleOrigin::Address(text) => write!(f, "{} (address {text})", self.bbl),
            BundleOrigin::Intersection(text) => write!(f, "{} (intersection {text})", self.bbl),
        }
    }
}

#[derive(Default)]
struct Entries {
    bundles: HashMap<BundleKey, GeoBundle>,
    order: VecDeque<BundleKey>,
}

/// Thread-safe FIFO-capped bundle cache.
pub struct BundleCache {
    entries: Mutex<Entries>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for BundleCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BundleCache {
    /// Cache holding at most `capacity` bundles (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached bundle for a key, counting the hit or miss.
    pub fn get(&self, key: &BundleKey) -> Option<GeoBundle> {
        let found = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bundles
            .get(key)
            .cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Bundle cache hit for {key}");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Stores a bundle and returns the cached one.
    ///
    /// When another task cached the same key first, its bundle is kept
    /// and returned so every caller sees identical values.
    pub fn insert(&self, key: BundleKey, bundle: GeoBundle) -> GeoBundle {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.bundles.get(&key) {
            return existing.clone();
        }
        while entries.order.len() >= self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.bundles.remove(&oldest);
        }
        entries.order.push_back(key.clone());
        entries.bundles.insert(key, bundle.clone());
        bundle
    }

    /// Number of cached bundles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bundles
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached bundle. Counters are kept.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.bundles.clear();
        entries.order.clear();
    }

    /// Hit, miss, and size counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(lot: u32) -> BundleKey {
        BundleKey::parcel(Bbl::from_parts(1, 1, lot).unwrap())
    }

    fn bundle(precinct: u16) -> GeoBundle {
        GeoBundle {
            precinct: Some(precinct),
            ..GeoBundle::default()
        }
    }

    #[test]
    fn counts_hits_and_misses() {
        let cache = BundleCache::new(4);
        assert!(cache.get(&key(1)).is_none());
        cache.insert(key(1), bundle(1));
        assert_eq!(cache.get(&key(1)), Some(bundle(1)));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
    }

    #[test]
    fn first_insert_wins() {
        let cache = BundleCache::new(4);
        cache.insert(key(1), bundle(1));
        assert_eq!(cache.insert(key(1), bundle(2)), bundle(1));
        assert_eq!(cache.get(&key(1)), Some(bundle(1)));
    }

    #[test]
    fn origins_of_one_parcel_are_separate_entries() {
        let cache = BundleCache::new(4);
        let bbl = Bbl::from_parts(1, 1, 1).unwrap();
        cache.insert(BundleKey::parcel(bbl), bundle(1));
        cache.insert(BundleKey::address(bbl, "1 MAIN ST, Manhattan"), bundle(2));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&BundleKey::parcel(bbl)), Some(bundle(1)));
        assert_eq!(
            cache.get(&BundleKey::address(bbl, "1 MAIN ST, Manhattan")),
            Some(bundle(2))
        );
        assert!(cache.get(&BundleKey::intersection(bbl, "1 MAIN ST, Manhattan")).is_none());
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let cache = BundleCache::new(2);
        cache.insert(key(1), bundle(1));
        cache.insert(key(2), bundle(2));
        cache.insert(key(3), bundle(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.get(&key(3)).is_some());
    }

    #[test]
    fn clear_empties_but_keeps_counters() {
        let cache = BundleCache::default();
        cache.insert(key(1), bundle(1));
        let _ = cache.get(&key(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().capacity, DEFAULT_CAPACITY);
    }
}
