#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Surrounding-scope aggregation.
//!
//! Given seed parcels, finds the parcels around them by one of three
//! modes (see [`ScopeMode`]):
//!
//! 1. **Radius**: the seeds grown by a caller-supplied distance, ranked
//!    by centroid distance. See [`radius`].
//! 2. **Street**: the corridors of the street segments fronting the
//!    seeds. See [`street`].
//! 3. **Span**: the corridor along the street path between two endpoint
//!    seeds, with candidate and straight-line fallbacks. See [`span`].
//!
//! Seeds are removed after the computation unless
//! [`SurroundingOptions::include_self`] is set.

pub mod radius;
pub mod span;
pub mod street;

use std::{collections::BTreeSet, sync::Arc};

use geoscope_geography_models::Bbl;
use geoscope_spatial::GeoIndex;
use thiserror::Error;

pub use geoscope_scope_models::{ScopeMode, SpanTier, SurroundingOptions};
pub use span::SpanScope;

/// Errors from surrounding-scope requests.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// Radius mode was requested without a radius.
    #[error("radius mode requires a radius in feet")]
    MissingRadius,

    /// The radius was negative or not finite.
    #[error("invalid radius: {radius}")]
    InvalidRadius {
        /// The rejected radius.
        radius: f64,
    },

    /// Span mode was given the wrong number of endpoints.
    #[error("span mode needs exactly two endpoint parcels, got {count}")]
    SpanEndpoints {
        /// Number of seeds supplied.
        count: usize,
    },

    /// The blocking computation panicked or was cancelled.
    #[error("scope task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Surrounding parcels of the seeds, taken together.
///
/// Radius results are ordered nearest first; street and span results are
/// sorted by key. Unknown seeds are ignored; no known seed gives an empty
/// result.
///
/// # Errors
///
/// Returns [`ScopeError`] if the options are invalid for the mode.
pub fn surrounding(
    index: &GeoIndex,
    seeds: &[Bbl],
    options: &SurroundingOptions,
) -> Result<Vec<Bbl>, ScopeError> {
    match options.mode {
        ScopeMode::Radius => {
            let radius_ft = checked_radius(options)?;
            Ok(radius::radius(index, seeds, radius_ft, options.include_self))
        }
        ScopeMode::Street => Ok(street::street(
            index,
            seeds,
            options.buffer_ft,
            options.include_self,
        )),
        ScopeMode::Span => {
            let [from, to] = seeds else {
                return Err(ScopeError::SpanEndpoints { count: seeds.len() });
            };
            Ok(span::span(index, from, to, options).parcels)
        }
    }
}

/// Union of each seed's own surrounding scope, sorted and
/// de-duplicated.
///
/// Used for queries naming several locations. In span mode the seeds are
/// the two endpoints and this is the same as [`surrounding`]. When
/// `include_self` is unset every seed is removed from the union.
///
/// # Errors
///
/// Returns [`ScopeError`] if the options are invalid for the mode.
pub fn surrounding_many(
    index: &GeoIndex,
    seeds: &[Bbl],
    options: &SurroundingOptions,
) -> Result<Vec<Bbl>, ScopeError> {
    if options.mode == ScopeMode::Span {
        return surrounding(index, seeds, options);
    }

    let mut union = BTreeSet::new();
    for seed in seeds {
        union.extend(surrounding(index, std::slice::from_ref(seed), options)?);
    }
    if !options.include_self {
        for seed in seeds {
            union.remove(seed);
        }
    }

    log::debug!(
        "Surrounding {} for {} seeds: {} parcels",
        options.mode,
        seeds.len(),
        union.len()
    );
    Ok(union.into_iter().collect())
}

/// [`surrounding_many`] on the blocking thread pool.
///
/// # Errors
///
/// Returns [`ScopeError`] if the options are invalid for the mode or the
/// task fails.
pub async fn surrounding_blocking(
    index: Arc<GeoIndex>,
    seeds: Vec<Bbl>,
    options: SurroundingOptions,
) -> Result<Vec<Bbl>, ScopeError> {
    tokio::task::spawn_blocking(move || surrounding_many(&index, &seeds, &options)).await?
}

fn checked_radius(options: &SurroundingOptions) -> Result<f64, ScopeError> {
    let radius = options.radius_ft.ok_or(ScopeError::MissingRadius)?;
    if !radius.is_finite() || radius < 0.0 {
        return Err(ScopeError::InvalidRadius { radius });
    }
    Ok(radius)
}

/// Removes the seeds from a result unless they should stay.
pub(crate) fn without_seeds(mut parcels: Vec<Bbl>, seeds: &[Bbl], include_self: bool) -> Vec<Bbl> {
    if !include_self {
        parcels.retain(|bbl| !seeds.contains(bbl));
    }
    parcels
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geoscope_spatial::fixtures::{self, north, south};

    use super::*;

    #[test]
    fn radius_mode_requires_radius() {
        let index = fixtures::geo_index();
        let options = SurroundingOptions {
            mode: ScopeMode::Radius,
            ..SurroundingOptions::default()
        };
        assert!(matches!(
            surrounding(&index, &[north(2)], &options),
            Err(ScopeError::MissingRadius)
        ));
        assert!(matches!(
            surrounding(&index, &[north(2)], &SurroundingOptions::radius(-5.0)),
            Err(ScopeError::InvalidRadius { .. })
        ));
        assert!(matches!(
            surrounding(&index, &[north(2)], &SurroundingOptions::radius(f64::NAN)),
            Err(ScopeError::InvalidRadius { .. })
        ));
    }

    #[test]
    fn span_mode_requires_two_endpoints() {
        let index = fixtures::geo_index();
        let err = surrounding(&index, &[north(1)], &SurroundingOptions::span(None)).unwrap_err();
        assert!(matches!(err, ScopeError::SpanEndpoints { count: 1 }));
    }

    #[test]
    fn dispatches_on_mode() {
        let index = fixtures::geo_index();
        assert_eq!(
            surrounding(&index, &[north(2)], &SurroundingOptions::street()).unwrap(),
            vec![north(3), south(2)]
        );
        assert_eq!(
            surrounding(&index, &[north(2)], &SurroundingOptions::radius(10.0)).unwrap(),
            Vec::<Bbl>::new()
        );
    }

    #[test]
    fn street_union_is_superset_of_each_seed() {
        let index = fixtures::geo_index();
        let options = SurroundingOptions::street().including_self();
        let a = surrounding(&index, &[north(2)], &options).unwrap();
        let b = surrounding(&index, &[south(5)], &options).unwrap();
        let union = surrounding_many(&index, &[north(2), south(5)], &options).unwrap();
        for key in a.iter().chain(&b) {
            assert!(union.contains(key), "{key} missing from union");
        }
        assert!(union.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn union_drops_every_seed() {
        let index = fixtures::geo_index();
        let union = surrounding_many(&index, &[north(2), north(3)], &SurroundingOptions::street()).unwrap();
        assert!(!union.contains(&north(2)));
        assert!(!union.contains(&north(3)));
        assert!(union.contains(&south(2)));
    }

    #[test]
    fn unknown_seeds_give_empty_scope() {
        let index = fixtures::geo_index();
        let unknown: Bbl = "4000010001".parse().unwrap();
        assert!(surrounding_many(&index, &[unknown], &SurroundingOptions::radius(500.0)).unwrap().is_empty());
        assert!(surrounding_many(&index, &[], &SurroundingOptions::street()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn blocking_variant_matches_inline() {
        let index = Arc::new(fixtures::geo_index());
        let inline = surrounding_many(&index, &[north(2)], &SurroundingOptions::radius(50.0)).unwrap();
        let pooled = surrounding_blocking(index, vec![north(2)], SurroundingOptions::radius(50.0))
            .await
            .unwrap();
        assert_eq!(pooled, {
            let mut sorted = inline;
            sorted.sort();
            sorted
        });
    }
}
