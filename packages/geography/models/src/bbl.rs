//! Borough-Block-Lot parcel keys.
//!
//! A BBL is the 10-digit tax-lot identifier used by `MapPLUTO`, DOF, and
//! Geoclient: one borough digit, a five-digit zero-padded block, and a
//! four-digit zero-padded lot (e.g. `1013007501` is borough 1, block
//! 1300, lot 7501).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Borough;

const MAX_BLOCK: u32 = 99_999;
const MAX_LOT: u32 = 9_999;

/// Errors from composing or parsing a [`Bbl`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BblError {
    /// Borough part is not a code 1-5 or a recognized borough name.
    #[error("invalid borough {0:?} (expected code 1-5 or a borough name)")]
    Borough(String),

    /// Block part is not an integer in 0-99999.
    #[error("invalid block {0:?} (expected an integer up to 5 digits)")]
    Block(String),

    /// Lot part is not an integer in 0-9999.
    #[error("invalid lot {0:?} (expected an integer up to 4 digits)")]
    Lot(String),

    /// Whole-key text is not a 10-digit BBL.
    #[error("invalid BBL {0:?} (expected 10 digits)")]
    Format(String),
}

/// Canonical parcel key.
///
/// Always renders as exactly 10 digits. Ordering matches the ordering of
/// the rendered strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bbl {
    borough: Borough,
    block: u32,
    lot: u32,
}

impl Bbl {
    /// Builds a key from numeric parts.
    ///
    /// # Errors
    ///
    /// Returns [`BblError`] if the borough code is outside 1-5, the block
    /// exceeds five digits, or the lot exceeds four digits.
    pub fn from_parts(borough: u8, block: u32, lot: u32) -> Result<Self, BblError> {
        let borough =
            Borough::from_code(borough).ok_or_else(|| BblError::Borough(borough.to_string()))?;
        if block > MAX_BLOCK {
            return Err(BblError::Block(block.to_string()));
        }
        if lot > MAX_LOT {
            return Err(BblError::Lot(lot.to_string()));
        }
        Ok(Self {
            borough,
            block,
            lot,
        })
    }

    /// Composes a key from the textual borough, block, and lot columns of a
    /// source record.
    ///
    /// Each part tolerates surrounding whitespace and a float rendering
    /// of an integer (`"1300.0"`). The borough part may also be a borough
    /// name or abbreviation.
    ///
    /// # Errors
    ///
    /// Returns [`BblError`] naming the first part that does not parse.
    pub fn compose(borough: &str, block: &str, lot: &str) -> Result<Self, BblError> {
        let borough_code = parse_whole_number(borough)
            .and_then(|n| u8::try_from(n).ok())
            .and_then(Borough::from_code)
            .or_else(|| Borough::from_name(borough))
            .ok_or_else(|| BblError::Borough(borough.trim().to_string()))?;
        let block_num = parse_whole_number(block)
            .filter(|n| *n <= MAX_BLOCK)
            .ok_or_else(|| BblError::Block(block.trim().to_string()))?;
        let lot_num = parse_whole_number(lot)
            .filter(|n| *n <= MAX_LOT)
            .ok_or_else(|| BblError::Lot(lot.trim().to_string()))?;

        Ok(Self {
            borough: borough_code,
            block: block_num,
            lot: lot_num,
        })
    }

    /// Borough of this parcel.
    #[must_use]
    pub const fn borough(&self) -> Borough {
        self.borough
    }

    /// Numeric borough code (1-5).
    #[must_use]
    pub const fn borough_code(&self) -> u8 {
        self.borough.code()
    }

    /// Tax block number.
    #[must_use]
    pub const fn block(&self) -> u32 {
        self.block
    }

    /// Tax lot number.
    #[must_use]
    pub const fn lot(&self) -> u32 {
        self.lot
    }

    /// Block rendered zero-padded to `width` digits.
    #[must_use]
    pub fn block_padded(&self, width: usize) -> String {
        format!("{:0width$}", self.block)
    }

    /// Lot rendered zero-padded to `width` digits.
    #[must_use]
    pub fn lot_padded(&self, width: usize) -> String {
        format!("{:0width$}", self.lot)
    }
}

impl fmt::Display for Bbl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:05}{:04}", self.borough.code(), self.block, self.lot)
    }
}

impl FromStr for Bbl {
    type Err = BblError;

    /// Parses a whole-key rendering.
    ///
    /// Accepts the plain 10-digit form, a float rendering of it
    /// (`"1013007501.0"`), and separated forms such as `"1-1300-7501"`,
    /// `"1/01300/7501"`, or `"1.1300.7501"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        let parts: Vec<&str> = trimmed.split(['-', '/', '.', ' ']).collect();
        if parts.len() == 3 && parts.iter().all(|p| !p.is_empty()) {
            return Self::compose(parts[0], parts[1], parts[2]);
        }

        let digits = strip_zero_fraction(trimmed);
        if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BblError::Format(trimmed.to_string()));
        }

        Self::compose(&digits[..1], &digits[1..6], &digits[6..])
            .map_err(|_| BblError::Format(trimmed.to_string()))
    }
}

impl TryFrom<String> for Bbl {
    type Error = BblError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bbl> for String {
    fn from(value: Bbl) -> Self {
        value.to_string()
    }
}

/// Strips a trailing all-zero fractional part (`"1300.00"` -> `"1300"`).
fn strip_zero_fraction(s: &str) -> &str {
    match s.split_once('.') {
        Some((whole, frac)) if frac.bytes().all(|b| b == b'0') => whole,
        _ => s,
    }
}

fn parse_whole_number(s: &str) -> Option<u32> {
    let s = strip_zero_fraction(s.trim());
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
