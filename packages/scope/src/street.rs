//! Street-corridor scope.

use geoscope_geography_models::Bbl;
use geoscope_spatial::{GeoIndex, geometry::union_all};

use crate::without_seeds;

/// Parcels along the corridors of the street segments fronting the
/// seeds, sorted by key.
///
/// Only segments whose own corridor touches a seed count, so a long
/// street contributes just the frontage next to the lot rather than its
/// whole length.
#[must_use]
pub fn street(index: &GeoIndex, seeds: &[Bbl], fixed_ft: Option<f64>, include_self: bool) -> Vec<Bbl> {
    let Some(union) = index.parcels.union_of(seeds) else {
        log::debug!("Street scope: no known seed among {} keys", seeds.len());
        return Vec::new();
    };

    let rows = index.streets.corridors_touching(&union, fixed_ft);
    if rows.is_empty() {
        log::debug!("Street scope: no street corridor touches the seeds");
        return Vec::new();
    }

    let corridors = index.streets.corridors(&rows, fixed_ft);
    let keys = index.parcels.keys_intersecting(&union_all(&corridors));
    log::debug!(
        "Street scope over {} segments: {} parcels",
        rows.len(),
        keys.len()
    );
    without_seeds(keys, seeds, include_self)
}
