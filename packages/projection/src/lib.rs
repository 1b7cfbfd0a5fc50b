#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate transforms for NYC geodata.
//!
//! All distance and buffer math in geoscope happens in NY State Plane
//! Long Island (EPSG:2263, US survey feet). Inputs arrive as WGS84
//! longitude/latitude from geocoders and users, and source layers may be
//! published in WGS84, State Plane, or Web Mercator. This crate converts
//! between the three with `proj4rs`.

use std::sync::LazyLock;

use geo::{Coord, MapCoords};
use proj4rs::{proj::Proj, transform::transform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from coordinate conversion.
#[derive(Debug, Clone, Error)]
pub enum ProjectionError {
    /// A coordinate was NaN or infinite.
    #[error("non-finite coordinate ({x}, {y})")]
    NonFinite {
        /// X / longitude value.
        x: f64,
        /// Y / latitude value.
        y: f64,
    },

    /// A geographic coordinate fell outside valid longitude/latitude.
    #[error("coordinate out of range: lon={lon}, lat={lat}")]
    OutOfRange {
        /// Longitude in degrees.
        lon: f64,
        /// Latitude in degrees.
        lat: f64,
    },

    /// The projection definition could not be built.
    #[error("invalid projection definition for {crs}: {message}")]
    Definition {
        /// CRS whose definition failed.
        crs: Crs,
        /// Underlying error.
        message: String,
    },

    /// The transform itself failed.
    #[error("transform {from} -> {to} failed: {message}")]
    Transform {
        /// Source CRS.
        from: Crs,
        /// Target CRS.
        to: Crs,
        /// Underlying error.
        message: String,
    },
}

/// The coordinate reference systems geoscope understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// EPSG:4326 longitude/latitude in degrees.
    Wgs84,
    /// EPSG:2263 NAD83 / New York Long Island, US survey feet.
    StatePlaneFt,
    /// EPSG:3857 spherical Web Mercator, meters.
    WebMercator,
}

impl Crs {
    /// The planar CRS every index stores geometry in.
    pub const PLANAR: Self = Self::StatePlaneFt;

    /// EPSG code.
    #[must_use]
    pub const fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::StatePlaneFt => 2263,
            Self::WebMercator => 3857,
        }
    }

    /// Maps an EPSG code to a supported CRS.
    ///
    /// EPSG:900913 and EPSG:102100 are accepted as Web Mercator aliases.
    #[must_use]
    pub const fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Self::Wgs84),
            2263 => Some(Self::StatePlaneFt),
            3857 | 900_913 | 102_100 => Some(Self::WebMercator),
            _ => None,
        }
    }

    /// Parses a CRS name as found in a `GeoJSON` `crs` member.
    ///
    /// Handles `"EPSG:2263"`, `"urn:ogc:def:crs:EPSG::2263"`, and the
    /// `OGC` `CRS84` alias for WGS84.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        if upper.ends_with("CRS84") {
            return Some(Self::Wgs84);
        }
        let code = upper.rsplit(':').next()?.trim();
        code.parse().ok().and_then(Self::from_epsg)
    }

    /// Whether coordinates are angular degrees rather than linear units.
    #[must_use]
    pub const fn is_geographic(self) -> bool {
        matches!(self, Self::Wgs84)
    }

    const fn proj_string(self) -> &'static str {
        match self {
            Self::Wgs84 => "+proj=longlat +datum=WGS84 +no_defs",
            Self::StatePlaneFt => {
                "+proj=lcc +lat_1=41.03333333333333 +lat_2=40.66666666666666 \
                 +lat_0=40.16666666666666 +lon_0=-74 +x_0=300000.0000000001 +y_0=0 \
                 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=us-ft +no_defs"
            }
            Self::WebMercator => {
                "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 \
                 +k=1 +units=m +no_defs"
            }
        }
    }

    fn build(self) -> Result<Proj, ProjectionError> {
        Proj::from_proj_string(self.proj_string()).map_err(|e| ProjectionError::Definition {
            crs: self,
            message: e.to_string(),
        })
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// A reusable transform between two CRSs.
///
/// Building the underlying projection definitions parses proj strings,
/// so bulk conversions (e.g. reprojecting a whole layer at load) should
/// build one `Transformer` and reuse it.
pub struct Transformer {
    from_crs: Crs,
    to_crs: Crs,
    from: Proj,
    to: Proj,
}

impl Transformer {
    /// Builds a transform from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Definition`] if either definition fails
    /// to parse.
    pub fn new(from: Crs, to: Crs) -> Result<Self, ProjectionError> {
        Ok(Self {
            from_crs: from,
            to_crs: to,
            from: from.build()?,
            to: to.build()?,
        })
    }

    /// Source CRS.
    #[must_use]
    pub const fn from_crs(&self) -> Crs {
        self.from_crs
    }

    /// Target CRS.
    #[must_use]
    pub const fn to_crs(&self) -> Crs {
        self.to_crs
    }

    /// Converts a single coordinate. Geographic coordinates are degrees
    /// on both input and output.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] for non-finite input, geographic input
    /// outside valid ranges, or a failed transform.
    pub fn convert(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::NonFinite { x, y });
        }
        if self.from_crs.is_geographic() {
            check_geographic(x, y)?;
        }
        if self.from_crs == self.to_crs {
            return Ok((x, y));
        }

        let mut point = if self.from_crs.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(&self.from, &self.to, &mut point).map_err(|e| ProjectionError::Transform {
            from: self.from_crs,
            to: self.to_crs,
            message: e.to_string(),
        })?;

        let (out_x, out_y) = if self.to_crs.is_geographic() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(ProjectionError::Transform {
                from: self.from_crs,
                to: self.to_crs,
                message: format!("non-finite result for ({x}, {y})"),
            });
        }

        Ok((out_x, out_y))
    }

    /// Converts every coordinate of a geometry.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProjectionError`] hit by any vertex.
    pub fn convert_geometry<G>(&self, geometry: &G) -> Result<G::Output, ProjectionError>
    where
        G: MapCoords<f64, f64>,
    {
        geometry.try_map_coords(|c: Coord<f64>| -> Result<Coord<f64>, ProjectionError> {
            let (x, y) = self.convert(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}

static TO_PLANAR: LazyLock<Result<Transformer, ProjectionError>> =
    LazyLock::new(|| Transformer::new(Crs::Wgs84, Crs::PLANAR));

static TO_GEOGRAPHIC: LazyLock<Result<Transformer, ProjectionError>> =
    LazyLock::new(|| Transformer::new(Crs::PLANAR, Crs::Wgs84));

fn shared(
    transformer: &'static Result<Transformer, ProjectionError>,
) -> Result<&'static Transformer, ProjectionError> {
    transformer.as_ref().map_err(Clone::clone)
}

fn check_geographic(lon: f64, lat: f64) -> Result<(), ProjectionError> {
    if (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(ProjectionError::OutOfRange { lon, lat })
    }
}

/// Converts a WGS84 longitude/latitude to State Plane feet, through a
/// process-wide [`Transformer`] built on first use.
///
/// # Errors
///
/// Returns [`ProjectionError`] for non-finite or out-of-range input.
pub fn to_planar(lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
    shared(&TO_PLANAR)?.convert(lon, lat)
}

/// Converts State Plane feet back to WGS84 longitude/latitude, through
/// a process-wide [`Transformer`] built on first use.
///
/// # Errors
///
/// Returns [`ProjectionError`] for non-finite input or a failed
/// transform.
pub fn to_geographic(x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
    shared(&TO_GEOGRAPHIC)?.convert(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Times Square, roughly.
    const LON: f64 = -73.9855;
    const LAT: f64 = 40.7580;

    #[test]
    fn planar_coordinates_land_in_nyc_range() {
        let (x, y) = to_planar(LON, LAT).unwrap();
        assert!((980_000.0..1_000_000.0).contains(&x), "x = {x}");
        assert!((205_000.0..225_000.0).contains(&y), "y = {y}");
    }

    #[test]
    fn roundtrip_within_a_millionth_of_a_degree() {
        let (x, y) = to_planar(LON, LAT).unwrap();
        let (lon, lat) = to_geographic(x, y).unwrap();
        assert!((lon - LON).abs() < 1e-6, "lon drifted: {lon}");
        assert!((lat - LAT).abs() < 1e-6, "lat drifted: {lat}");
    }

    #[test]
    fn web_mercator_to_planar_matches_wgs84_path() {
        let merc = Transformer::new(Crs::Wgs84, Crs::WebMercator)
            .unwrap()
            .convert(LON, LAT)
            .unwrap();
        let via_merc = Transformer::new(Crs::WebMercator, Crs::PLANAR)
            .unwrap()
            .convert(merc.0, merc.1)
            .unwrap();
        let direct = to_planar(LON, LAT).unwrap();
        assert!((via_merc.0 - direct.0).abs() < 0.01);
        assert!((via_merc.1 - direct.1).abs() < 0.01);
    }

    #[test]
    fn shared_transformers_agree_across_threads() {
        let expected = to_planar(LON, LAT).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| to_planar(LON, LAT).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
        let fresh = Transformer::new(Crs::Wgs84, Crs::PLANAR)
            .unwrap()
            .convert(LON, LAT)
            .unwrap();
        assert_eq!(fresh, expected);
        let back = to_geographic(expected.0, expected.1).unwrap();
        assert_eq!(to_geographic(expected.0, expected.1).unwrap(), back);
    }

    #[test]
    fn nan_input_is_rejected() {
        assert!(matches!(
            to_planar(f64::NAN, LAT),
            Err(ProjectionError::NonFinite { .. })
        ));
        assert!(matches!(
            to_geographic(1_000_000.0, f64::INFINITY),
            Err(ProjectionError::NonFinite { .. })
        ));
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        assert!(matches!(
            to_planar(LON, 123.0),
            Err(ProjectionError::OutOfRange { .. })
        ));
    }

    #[test]
    fn crs_names() {
        assert_eq!(Crs::from_name("EPSG:2263"), Some(Crs::StatePlaneFt));
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:EPSG::3857"),
            Some(Crs::WebMercator)
        );
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84"),
            Some(Crs::Wgs84)
        );
        assert_eq!(Crs::from_name("EPSG:32618"), None);
    }

    #[test]
    fn identity_transform_passes_through() {
        let t = Transformer::new(Crs::PLANAR, Crs::PLANAR).unwrap();
        assert_eq!(t.convert(1.5, 2.5).unwrap(), (1.5, 2.5));
    }
}
