//! Column alias tables.
//!
//! Each constant lists the accepted source column names for one logical
//! field, in priority order. Matching is case-insensitive.

/// Parcel borough code (`BoroCode`).
pub const PARCEL_BOROUGH: &[&str] = &["borocode", "boroughcode", "boro"];
/// Parcel tax block.
pub const PARCEL_BLOCK: &[&str] = &["block"];
/// Parcel tax lot.
pub const PARCEL_LOT: &[&str] = &["lot"];
/// Whole-key parcel BBL, used when the parts are absent.
pub const PARCEL_BBL: &[&str] = &["bbl", "appbbl"];
/// Police precinct attribute on the parcel layer.
pub const PARCEL_PRECINCT: &[&str] = &["policeprct", "police_prct", "policepct"];
/// Pre-joined neighborhood area code on the parcel layer.
pub const PARCEL_AREA: &[&str] = &["cdta2020", "nta2020", "ntacode", "nta"];

/// Street name on a centerline segment.
pub const STREET_NAME: &[&str] = &[
    "street",
    "streetname",
    "fullname",
    "full_stree",
    "street_nam",
    "st_name",
];
/// Published street width in feet.
pub const STREET_WIDTH: &[&str] = &["streetwidth_max", "rw_width_max", "rw_width", "width"];
/// Source segment identifier.
pub const STREET_SEGMENT_ID: &[&str] = &["segmentid", "segment_id", "segid"];

/// Community district tabulation area code, preferred as the area code.
pub const AREA_CDTA: &[&str] = &["cdta2020"];
/// Neighborhood tabulation area code, cut to its district prefix.
pub const AREA_NTA: &[&str] = &["nta2020", "ntacode", "nta"];
/// Human-readable area name.
pub const AREA_NAME: &[&str] = &["ntaname", "cdtaname", "name"];

/// Picks the first alias present among `columns`, returning the column's
/// actual spelling.
#[must_use]
pub fn resolve<'a, I>(aliases: &[&str], columns: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    aliases.iter().find_map(|alias| {
        columns
            .clone()
            .into_iter()
            .find(|column| column.eq_ignore_ascii_case(alias))
            .map(ToString::to_string)
    })
}
