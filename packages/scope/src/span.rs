//! Corridor scope between two endpoint parcels.
//!
//! The endpoints are usually the two intersections bounding a stretch of
//! street ("Broadway between 42nd and 47th"). Three tiers are tried in
//! order, each only when the one before it finds no parcels:
//!
//! 1. [`SpanTier::Path`]: the fewest-segment street path over all pairs
//!    of the endpoints' nearest segments, buffered into a corridor.
//! 2. [`SpanTier::Candidates`]: the nearest segments themselves,
//!    whether or not they connect.
//! 3. [`SpanTier::StraightLine`]: a straight corridor between the two
//!    endpoint centroids.

use std::collections::HashSet;

use geo::Point;
use geoscope_geography_models::{Bbl, SegmentId};
use geoscope_scope_models::{SpanTier, SurroundingOptions};
use geoscope_spatial::{
    GeoIndex,
    geometry::{disc, straight_corridor, union_all},
};

use crate::without_seeds;

/// Result of a span query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanScope {
    /// Parcels in the corridor, sorted by key.
    pub parcels: Vec<Bbl>,
    /// The tier that produced the parcels; `None` when an endpoint is
    /// unknown.
    pub tier: Option<SpanTier>,
    /// Segments the corridor was built from, in path order. Empty for
    /// the straight-line tier.
    pub segments: Vec<SegmentId>,
}

/// Parcels along the street corridor between `from` and `to`.
///
/// `options.street` restricts candidate segments, and the path between
/// them, to streets whose name contains it. `options.candidates` sets
/// how many nearest segments are tried per endpoint. The shortest path
/// over every connected candidate pair wins.
#[must_use]
pub fn span(index: &GeoIndex, from: &Bbl, to: &Bbl, options: &SurroundingOptions) -> SpanScope {
    let (Some(start), Some(end)) = (index.parcels.get(from), index.parcels.get(to)) else {
        log::warn!("Span endpoints {from} -> {to}: unknown parcel");
        return SpanScope::default();
    };
    let seeds = [*from, *to];
    let (a, b) = (start.centroid, end.centroid);
    let streets = &index.streets;

    let among = options.street.as_deref().map(|name| streets.matching_name(name));
    if among.as_ref().is_some_and(Vec::is_empty) {
        log::info!(
            "Span {from} -> {to}: no street segments named like {:?}",
            options.street.as_deref().unwrap_or_default()
        );
    }

    let k = options.candidates.max(1);
    let starts = streets.nearest(a, k, among.as_deref());
    let goals = streets.nearest(b, k, among.as_deref());
    let allowed: Option<HashSet<usize>> = among.map(|rows| rows.into_iter().collect());

    match streets.shortest_path(&starts, &goals, allowed.as_ref()) {
        Some(path) => {
            let keys = parcels_along(index, &path, options.buffer_ft);
            if !keys.is_empty() {
                return finish(index, SpanTier::Path, keys, &path, &seeds, options.include_self);
            }
            log::info!("Span {from} -> {to}: path corridor is empty, trying candidate segments");
        }
        None => log::info!("Span {from} -> {to}: no street path, trying candidate segments"),
    }

    let mut candidates: Vec<usize> = starts.iter().chain(&goals).copied().collect();
    candidates.sort_unstable();
    candidates.dedup();
    if !candidates.is_empty() {
        let keys = parcels_along(index, &candidates, options.buffer_ft);
        if !keys.is_empty() {
            return finish(
                index,
                SpanTier::Candidates,
                keys,
                &candidates,
                &seeds,
                options.include_self,
            );
        }
    }

    log::info!("Span {from} -> {to}: falling back to a straight corridor");
    let distance = options
        .buffer_ft
        .map_or(streets.policy().default_ft, f64::abs);
    let area = straight_area(a, b, distance);
    let keys = index.parcels.keys_intersecting(&area);
    finish(index, SpanTier::StraightLine, keys, &[], &seeds, options.include_self)
}

fn parcels_along(index: &GeoIndex, rows: &[usize], fixed_ft: Option<f64>) -> Vec<Bbl> {
    let corridors = index.streets.corridors(rows, fixed_ft);
    index.parcels.keys_intersecting(&union_all(&corridors))
}

fn straight_area(a: Point<f64>, b: Point<f64>, distance: f64) -> geo::MultiPolygon<f64> {
    if a == b {
        disc(a, distance)
    } else {
        straight_corridor(a, b, distance)
    }
}

fn finish(
    index: &GeoIndex,
    tier: SpanTier,
    keys: Vec<Bbl>,
    rows: &[usize],
    seeds: &[Bbl],
    include_self: bool,
) -> SpanScope {
    log::info!("Span scope via {tier}: {} parcels", keys.len());
    SpanScope {
        parcels: without_seeds(keys, seeds, include_self),
        tier: Some(tier),
        segments: rows
            .iter()
            .filter_map(|&row| index.streets.segment(row).map(|s| s.id.clone()))
            .collect(),
    }
}
