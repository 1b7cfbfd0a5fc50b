//! NYC borough codes and names.
//!
//! Borough codes are the single digit that leads every BBL and that
//! the Department of City Planning publishes as `BoroCode`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

/// One of the five NYC boroughs, numbered by its BBL borough code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
pub enum Borough {
    /// Borough code 1.
    Manhattan = 1,
    /// Borough code 2.
    Bronx = 2,
    /// Borough code 3.
    Brooklyn = 3,
    /// Borough code 4.
    Queens = 4,
    /// Borough code 5.
    #[strum(serialize = "Staten Island")]
    #[serde(rename = "Staten Island")]
    StatenIsland = 5,
}

impl Borough {
    /// Returns the numeric borough code (1-5).
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Maps a numeric borough code to its borough.
    ///
    /// Returns `None` for anything outside 1-5.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Manhattan),
            2 => Some(Self::Bronx),
            3 => Some(Self::Brooklyn),
            4 => Some(Self::Queens),
            5 => Some(Self::StatenIsland),
            _ => None,
        }
    }

    /// Two-letter borough abbreviation as used by `MapPLUTO`'s `Borough`
    /// column (e.g. "MN").
    #[must_use]
    pub const fn abbr(self) -> &'static str {
        match self {
            Self::Manhattan => "MN",
            Self::Bronx => "BX",
            Self::Brooklyn => "BK",
            Self::Queens => "QN",
            Self::StatenIsland => "SI",
        }
    }

    /// Parses a borough from free text.
    ///
    /// Accepts full names in any case, common aliases ("the bronx",
    /// "staten-island", "new york"), two-letter abbreviations, and the
    /// numeric code.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_lowercase();
        match lowered.as_str() {
            "1" | "manhattan" | "mn" | "new york" | "new york county" => Some(Self::Manhattan),
            "2" | "bronx" | "the bronx" | "bx" => Some(Self::Bronx),
            "3" | "brooklyn" | "bk" | "kings" => Some(Self::Brooklyn),
            "4" | "queens" | "qn" => Some(Self::Queens),
            "5" | "staten island" | "staten-island" | "statenisland" | "si" | "richmond" => {
                Some(Self::StatenIsland)
            }
            _ => None,
        }
    }
}

/// Maps a Geoclient borough code string ("1".."5") to the borough name.
///
/// Returns `None` for unrecognized codes.
#[must_use]
pub fn borough_name_for_code(code: &str) -> Option<&'static str> {
    match code.trim() {
        "1" => Some("Manhattan"),
        "2" => Some("Bronx"),
        "3" => Some("Brooklyn"),
        "4" => Some("Queens"),
        "5" => Some("Staten Island"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn code_roundtrip() {
        for borough in Borough::iter() {
            assert_eq!(Borough::from_code(borough.code()), Some(borough));
        }
    }

    #[test]
    fn display_name_parses_back() {
        for borough in Borough::iter() {
            assert_eq!(Borough::from_name(&borough.to_string()), Some(borough));
        }
    }

    #[test]
    fn abbreviations_parse() {
        for borough in Borough::iter() {
            assert_eq!(Borough::from_name(borough.abbr()), Some(borough));
        }
    }

    #[test]
    fn aliases() {
        assert_eq!(Borough::from_name("The Bronx"), Some(Borough::Bronx));
        assert_eq!(Borough::from_name("staten-island"), Some(Borough::StatenIsland));
        assert_eq!(Borough::from_name(" MANHATTAN "), Some(Borough::Manhattan));
        assert_eq!(Borough::from_name("Jersey City"), None);
    }

    #[test]
    fn code_names() {
        assert_eq!(borough_name_for_code("5"), Some("Staten Island"));
        assert_eq!(borough_name_for_code("0"), None);
    }
}
