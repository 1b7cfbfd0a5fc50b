#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Surrounding-scope request types.
//!
//! A surrounding scope is the set of parcels considered spatially
//! relevant to one or more seed parcels. [`ScopeMode`] picks the
//! algorithm and [`SurroundingOptions`] carries its parameters.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Number of nearest street segments tried per span endpoint.
pub const DEFAULT_SPAN_CANDIDATES: usize = 3;

/// How the surrounding parcels of a seed are found.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ScopeMode {
    /// Parcels within a fixed distance of the seed, nearest first.
    Radius,
    /// Parcels along the street corridors fronting the seed.
    #[default]
    Street,
    /// Parcels along the street path between two endpoint seeds.
    Span,
}

/// Which span tier produced a result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SpanTier {
    /// Corridor over a connected street path between the endpoints.
    Path,
    /// Corridors of the endpoints' nearest segments, connected or not.
    Candidates,
    /// Straight corridor between the endpoint centroids.
    StraightLine,
}

/// Parameters for a surrounding-scope computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SurroundingOptions {
    /// Algorithm to run.
    pub mode: ScopeMode,
    /// Radius in feet. Required in radius mode; there is no default.
    pub radius_ft: Option<f64>,
    /// Fixed corridor buffer in feet, overriding the width policy in
    /// street and span modes.
    pub buffer_ft: Option<f64>,
    /// Keep the seed parcels in the result.
    pub include_self: bool,
    /// Street name fragment constraining span candidates.
    pub street: Option<String>,
    /// Nearest segments tried per span endpoint.
    pub candidates: usize,
}

impl Default for SurroundingOptions {
    fn default() -> Self {
        Self {
            mode: ScopeMode::default(),
            radius_ft: None,
            buffer_ft: None,
            include_self: false,
            street: None,
            candidates: DEFAULT_SPAN_CANDIDATES,
        }
    }
}

impl SurroundingOptions {
    /// Radius mode with the given distance.
    #[must_use]
    pub fn radius(radius_ft: f64) -> Self {
        Self {
            mode: ScopeMode::Radius,
            radius_ft: Some(radius_ft),
            ..Self::default()
        }
    }

    /// Street mode with the width-derived buffer policy.
    #[must_use]
    pub fn street() -> Self {
        Self::default()
    }

    /// Span mode, optionally constrained to a street name.
    #[must_use]
    pub fn span(street: Option<&str>) -> Self {
        Self {
            mode: ScopeMode::Span,
            street: street.map(ToString::to_string),
            ..Self::default()
        }
    }

    /// Keeps the seeds in the result.
    #[must_use]
    pub const fn including_self(mut self) -> Self {
        self.include_self = true;
        self
    }

    /// Uses a fixed corridor buffer.
    #[must_use]
    pub const fn with_buffer(mut self, buffer_ft: f64) -> Self {
        self.buffer_ft = Some(buffer_ft);
        self
    }

    /// Sets the number of span candidates per endpoint.
    #[must_use]
    pub const fn with_candidates(mut self, candidates: usize) -> Self {
        self.candidates = candidates;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!(ScopeMode::from_str("RADIUS").unwrap(), ScopeMode::Radius);
        assert_eq!(ScopeMode::from_str("span").unwrap(), ScopeMode::Span);
        assert!(ScopeMode::from_str("block").is_err());
        assert_eq!(ScopeMode::Street.to_string(), "street");
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: SurroundingOptions = toml::from_str("mode = \"radius\"\nradiusFt = 250.0").unwrap();
        assert_eq!(options.mode, ScopeMode::Radius);
        assert_eq!(options.radius_ft, Some(250.0));
        assert!(!options.include_self);
        assert_eq!(options.candidates, DEFAULT_SPAN_CANDIDATES);
    }

    #[test]
    fn builders_set_mode() {
        let options = SurroundingOptions::span(Some("MAIN")).including_self();
        assert_eq!(options.mode, ScopeMode::Span);
        assert_eq!(options.street.as_deref(), Some("MAIN"));
        assert!(options.include_self);
        assert_eq!(SurroundingOptions::street().mode, ScopeMode::Street);
    }
}
