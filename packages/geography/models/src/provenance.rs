//! Where a resolved attribute came from.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Source of a resolved attribute value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provenance {
    /// Returned by the external geocoding service.
    Geocoder,
    /// Read from a parcel-layer attribute.
    ParcelIndex,
    /// Computed by a spatial join against a polygon layer.
    SpatialJoin,
    /// Derived from the parcel key itself (e.g. borough from the BBL).
    ParcelKey,
    /// Supplied by the caller as part of the request.
    Input,
}
