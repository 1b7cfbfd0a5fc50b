//! Fixed-radius scope.

use geo::{Centroid, Distance, Euclidean};
use geoscope_geography_models::Bbl;
use geoscope_spatial::{GeoIndex, geometry::grow};

use crate::without_seeds;

/// Parcels intersecting the seeds' union grown by `radius_ft`, nearest
/// centroid first.
///
/// Distances are measured from the centroid of the seeds' union; equal
/// distances are ordered by key. The seeds are ranked along with
/// everything else and only removed at the end.
#[must_use]
pub fn radius(index: &GeoIndex, seeds: &[Bbl], radius_ft: f64, include_self: bool) -> Vec<Bbl> {
    let Some(union) = index.parcels.union_of(seeds) else {
        log::debug!("Radius scope: no known seed among {} keys", seeds.len());
        return Vec::new();
    };
    let Some(center) = union.centroid() else {
        return Vec::new();
    };
    let area = if radius_ft > 0.0 {
        grow(&union, radius_ft)
    } else {
        union
    };

    let mut ranked: Vec<(f64, Bbl)> = index
        .parcels
        .intersecting(&area)
        .into_iter()
        .map(|parcel| (Euclidean.distance(center, parcel.centroid), parcel.bbl))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut keys: Vec<Bbl> = Vec::with_capacity(ranked.len());
    for (_, bbl) in ranked {
        if !keys.contains(&bbl) {
            keys.push(bbl);
        }
    }

    log::debug!("Radius scope {radius_ft} ft: {} parcels", keys.len());
    without_seeds(keys, seeds, include_self)
}
