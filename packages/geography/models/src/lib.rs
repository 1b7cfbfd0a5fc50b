#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! NYC geographic identifiers.
//!
//! These types name the units every other geoscope package speaks in:
//! tax-lot parcel keys (BBLs), boroughs, police precincts, street
//! segment ids, and neighborhood area codes. They carry no geometry.

pub mod bbl;
pub mod borough;
pub mod provenance;

use serde::{Deserialize, Serialize};

pub use bbl::{Bbl, BblError};
pub use borough::Borough;
pub use provenance::Provenance;

/// NYPD police precinct number (e.g. 18 for Midtown North).
pub type Precinct = u16;

/// Identifier of a street centerline segment as published by the source
/// dataset (`SegmentID` in LION), or the row position when the source
/// carries no id column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub String);

impl SegmentId {
    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Normalizes a neighborhood area code for comparison.
///
/// Codes are trimmed and uppercased. Tabulation-area codes longer than
/// four characters (e.g. the 2020 NTA code `"MN1701"`) are cut down to
/// their four-character district prefix (`"MN17"`) so that NTA and CDTA
/// codes compare equal.
#[must_use]
pub fn normalize_area_code(code: &str) -> Option<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return None;
    }
    Some(code.chars().take(4).collect())
}
