use geo::{Intersects, MultiPolygon, Point};
use geoscope_geography_models::Bbl;
use geoscope_projection::to_planar;
use geoscope_spatial::geometry::grow;

use crate::Resolver;

impl Resolver {
    /// WGS84 `(longitude, latitude)` of a point inside the parcel.
    #[must_use]
    pub fn coordinate_for_parcel(&self, bbl: &Bbl) -> Option<(f64, f64)> {
        match self.index().parcels.representative_point(bbl) {
            Ok(point) => point,
            Err(e) => {
                log::warn!("Failed to convert representative point of {bbl}: {e}");
                None
            }
        }
    }

    /// Parcel containing or nearest to a WGS84 coordinate, with its
    /// distance in feet.
    #[must_use]
    pub fn parcel_for_coordinate(&self, lon: f64, lat: f64) -> Option<(Bbl, f64)> {
        match self.index().parcels.nearest(lon, lat) {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Nearest-parcel lookup failed for ({lon}, {lat}): {e}");
                None
            }
        }
    }

    /// Sorted keys of parcels within `buffer_ft` of a WGS84 coordinate.
    #[must_use]
    pub fn parcels_near_coordinate(&self, lon: f64, lat: f64, buffer_ft: f64) -> Vec<Bbl> {
        match self.index().parcels.within(lon, lat, buffer_ft) {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!("Radius lookup failed for ({lon}, {lat}): {e}");
                Vec::new()
            }
        }
    }

    /// Union of the given parcels grown by `buffer_ft`, `None` when no
    /// key is known.
    #[must_use]
    pub fn scope_area(&self, bbls: &[Bbl], buffer_ft: f64) -> Option<MultiPolygon<f64>> {
        let union = self.index().parcels.union_of(bbls)?;
        if buffer_ft > 0.0 {
            Some(grow(&union, buffer_ft))
        } else {
            Some(union)
        }
    }

    /// Positions of the WGS84 points falling inside the parcels' union
    /// grown by `buffer_ft`.
    ///
    /// Datasets without a parcel, precinct, or area column are filtered
    /// this way. Invalid coordinates are dropped.
    #[must_use]
    pub fn points_in_scope(&self, points: &[(f64, f64)], bbls: &[Bbl], buffer_ft: f64) -> Vec<usize> {
        let Some(area) = self.scope_area(bbls, buffer_ft) else {
            log::debug!("No known parcels to filter points by");
            return Vec::new();
        };
        points
            .iter()
            .enumerate()
            .filter_map(|(i, &(lon, lat))| match to_planar(lon, lat) {
                Ok((x, y)) => area.intersects(&Point::new(x, y)).then_some(i),
                Err(e) => {
                    log::debug!("Skipping point {i}: {e}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use geoscope_projection::{to_geographic, to_planar};
    use geoscope_spatial::fixtures::{self, X0, Y0, north};

    use crate::test_support::resolver;

    fn lon_lat(x: f64, y: f64) -> (f64, f64) {
        to_geographic(X0 + x, Y0 + y).unwrap()
    }

    #[test]
    fn representative_point_round_trips_to_lot_center() {
        let (lon, lat) = resolver().coordinate_for_parcel(&north(1)).unwrap();
        let (x, y) = to_planar(lon, lat).unwrap();
        let expected = fixtures::point(100.0, 70.0);
        assert!((x - expected.x()).abs() < 1e-3, "x = {x}");
        assert!((y - expected.y()).abs() < 1e-3, "y = {y}");
    }

    #[test]
    fn unknown_parcel_has_no_coordinate() {
        let unknown = "3000010001".parse().unwrap();
        assert_eq!(resolver().coordinate_for_parcel(&unknown), None);
    }

    #[test]
    fn coordinate_inside_a_lot_resolves_to_it() {
        let (lon, lat) = lon_lat(300.0, 70.0);
        let (bbl, distance) = resolver().parcel_for_coordinate(lon, lat).unwrap();
        assert_eq!(bbl, north(2));
        assert!(distance < 1e-6);
    }

    #[test]
    fn coordinate_between_lots_resolves_to_nearest() {
        let (lon, lat) = lon_lat(195.0, 70.0);
        let (bbl, distance) = resolver().parcel_for_coordinate(lon, lat).unwrap();
        assert_eq!(bbl, north(1));
        assert!((distance - 5.0).abs() < 0.01, "distance = {distance}");
    }

    #[test]
    fn invalid_coordinate_degrades_to_none() {
        let resolver = resolver();
        assert_eq!(resolver.parcel_for_coordinate(f64::NAN, 40.7), None);
        assert!(resolver.parcels_near_coordinate(-74.0, 140.0, 50.0).is_empty());
    }

    #[test]
    fn parcels_near_coordinate_respect_buffer() {
        let resolver = resolver();
        let (lon, lat) = lon_lat(200.0, 70.0);
        assert_eq!(
            resolver.parcels_near_coordinate(lon, lat, 15.0),
            vec![north(1), north(2)]
        );
        assert!(resolver.parcels_near_coordinate(lon, lat, 5.0).is_empty());
    }

    #[test]
    fn points_filtered_by_buffered_scope() {
        let resolver = resolver();
        let points = [lon_lat(100.0, 70.0), lon_lat(100.0, 150.0), (f64::NAN, 0.0)];
        assert_eq!(resolver.points_in_scope(&points, &[north(1)], 0.0), vec![0]);
        assert_eq!(resolver.points_in_scope(&points, &[north(1)], 40.0), vec![0, 1]);
    }

    #[test]
    fn points_with_unknown_scope_are_dropped() {
        let unknown = "3000010001".parse().unwrap();
        let points = [lon_lat(100.0, 70.0)];
        assert!(resolver().points_in_scope(&points, &[unknown], 100.0).is_empty());
    }
}
