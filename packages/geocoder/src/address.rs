//! Location record classification.
//!
//! Location records arrive as loosely structured `{house_number,
//! street_name, borough}` triples from upstream extraction. They come in
//! several shapes:
//! - Street addresses: `{"237", "PARK AVENUE", "Manhattan"}`
//! - Addresses with the number folded into the street: `"120-15 QUEENS BLVD"`
//! - Intersections: `"BROADWAY & W 42 ST"`, `"5TH AVE / E 59TH ST"`
//! - Landmarks: `"GRAND CENTRAL TERMINAL"`
//!
//! This module sorts them into the lookup Geoclient should receive.

use std::sync::LazyLock;

use geoscope_geography_models::Borough;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Leading house number, including Queens hyphenated numbers and letter
/// suffixes ("120-15", "35A").
static HOUSE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+[A-Za-z]?(?:-\d+[A-Za-z]?)?)\s+(.+?)\s*$").expect("valid regex")
});

/// Runs of whitespace, collapsed to one space.
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Cross-street separators, checked in order.
const INTERSECTION_SEPARATORS: &[&str] = &[" & ", " AND ", " / ", " AT ", "&", "/"];

/// Non-geocodable street text.
static SKIP_PATTERNS: &[&str] = &["UNKNOWN", "N/A", "NA", "NONE", "UNSPECIFIED"];

/// A location as extracted upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// House number, when given separately.
    #[serde(default)]
    pub house_number: Option<String>,
    /// Street name, intersection text, or landmark text.
    #[serde(default)]
    pub street_name: Option<String>,
    /// Borough name or code.
    #[serde(default)]
    pub borough: Option<String>,
}

impl LocationRecord {
    /// Record for a street address.
    #[must_use]
    pub fn address(house_number: &str, street_name: &str, borough: &str) -> Self {
        Self {
            house_number: Some(house_number.to_string()),
            street_name: Some(street_name.to_string()),
            borough: Some(borough.to_string()),
        }
    }

    /// Record with only street text (intersection or landmark).
    #[must_use]
    pub fn street_text(street_name: &str, borough: &str) -> Self {
        Self {
            house_number: None,
            street_name: Some(street_name.to_string()),
            borough: Some(borough.to_string()),
        }
    }
}

/// What kind of lookup a record needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationKind {
    /// House number on a street.
    Address {
        /// House number.
        house_number: String,
        /// Street name.
        street: String,
        /// Borough name as Geoclient expects it.
        borough: String,
    },
    /// Two cross streets.
    Intersection {
        /// First street.
        street1: String,
        /// Second street.
        street2: String,
        /// Borough name as Geoclient expects it.
        borough: String,
    },
    /// Free text with neither a house number nor a cross street.
    Landmark {
        /// Landmark text.
        text: String,
        /// Borough name as Geoclient expects it.
        borough: String,
    },
    /// Empty or placeholder text.
    NotGeocodable,
}

/// Classifies a record.
///
/// Intersections need an empty house number and a separator in the
/// street text. A house number (given, or leading the street text)
/// makes an address. Anything else non-empty is a landmark.
#[must_use]
pub fn classify(record: &LocationRecord) -> LocationKind {
    let street = clean(record.street_name.as_deref().unwrap_or_default());
    let house_number = clean(record.house_number.as_deref().unwrap_or_default());
    let borough = normalize_borough(record.borough.as_deref().unwrap_or_default());

    if street.is_empty() || SKIP_PATTERNS.contains(&street.as_str()) {
        return LocationKind::NotGeocodable;
    }

    if !house_number.is_empty() {
        return LocationKind::Address {
            house_number,
            street,
            borough,
        };
    }

    if let Some((street1, street2)) = split_intersection(&street) {
        return LocationKind::Intersection {
            street1,
            street2,
            borough,
        };
    }

    if let Some((house_number, street)) = split_house_number(&street) {
        return LocationKind::Address {
            house_number,
            street,
            borough,
        };
    }

    LocationKind::Landmark {
        text: street,
        borough,
    }
}

/// Splits a one-line address into house number and street.
///
/// Returns `None` when the text does not start with a house number.
#[must_use]
pub fn split_house_number(address: &str) -> Option<(String, String)> {
    let caps = HOUSE_NUMBER_RE.captures(address)?;
    Some((caps[1].to_uppercase(), clean(&caps[2])))
}

/// Splits intersection text into its two streets.
#[must_use]
pub fn split_intersection(text: &str) -> Option<(String, String)> {
    let upper = text.to_uppercase();
    INTERSECTION_SEPARATORS.iter().find_map(|sep| {
        let idx = upper.find(sep)?;
        let street1 = clean(&upper[..idx]);
        let street2 = clean(&upper[idx + sep.len()..]);
        (!street1.is_empty() && !street2.is_empty()).then_some((street1, street2))
    })
}

/// Maps borough text to the name Geoclient expects, passing unknown
/// text through trimmed.
#[must_use]
pub fn normalize_borough(text: &str) -> String {
    Borough::from_name(text).map_or_else(|| text.trim().to_string(), |b| b.to_string())
}

fn clean(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_street_address() {
        assert_eq!(
            classify(&LocationRecord::address("237", " park  avenue ", "manhattan")),
            LocationKind::Address {
                house_number: "237".to_string(),
                street: "PARK AVENUE".to_string(),
                borough: "Manhattan".to_string(),
            }
        );
    }

    #[test]
    fn classifies_folded_house_number() {
        assert_eq!(
            classify(&LocationRecord::street_text("120-15 Queens Blvd", "QN")),
            LocationKind::Address {
                house_number: "120-15".to_string(),
                street: "QUEENS BLVD".to_string(),
                borough: "Queens".to_string(),
            }
        );
    }

    #[test]
    fn classifies_intersections() {
        for text in ["Broadway & W 42 St", "BROADWAY AND W 42 ST", "broadway / w 42 st"] {
            assert_eq!(
                classify(&LocationRecord::street_text(text, "1")),
                LocationKind::Intersection {
                    street1: "BROADWAY".to_string(),
                    street2: "W 42 ST".to_string(),
                    borough: "Manhattan".to_string(),
                },
                "{text}"
            );
        }
    }

    #[test]
    fn house_number_wins_over_separator() {
        let kind = classify(&LocationRecord::address("1", "A & B STREET", "Bronx"));
        assert!(matches!(kind, LocationKind::Address { .. }));
    }

    #[test]
    fn bare_text_is_landmark() {
        assert_eq!(
            classify(&LocationRecord::street_text("Grand Central Terminal", "Manhattan")),
            LocationKind::Landmark {
                text: "GRAND CENTRAL TERMINAL".to_string(),
                borough: "Manhattan".to_string(),
            }
        );
    }

    #[test]
    fn empty_and_placeholder_text_is_not_geocodable() {
        assert_eq!(classify(&LocationRecord::default()), LocationKind::NotGeocodable);
        assert_eq!(
            classify(&LocationRecord::street_text("unknown", "Bronx")),
            LocationKind::NotGeocodable
        );
    }

    #[test]
    fn house_number_must_lead_the_text() {
        assert_eq!(
            split_house_number("42 ST"),
            Some(("42".to_string(), "ST".to_string()))
        );
        assert_eq!(split_house_number("W 42 ST"), None);
    }

    #[test]
    fn lettered_house_number_in_any_case() {
        assert_eq!(
            split_house_number("12b Main St"),
            Some(("12B".to_string(), "MAIN ST".to_string()))
        );
        assert_eq!(
            classify(&LocationRecord::street_text("237 Park Ave", "Manhattan")),
            LocationKind::Address {
                house_number: "237".to_string(),
                street: "PARK AVE".to_string(),
                borough: "Manhattan".to_string(),
            }
        );
    }

    #[test]
    fn unknown_borough_passes_through() {
        assert_eq!(normalize_borough(" Hoboken "), "Hoboken");
    }
}
