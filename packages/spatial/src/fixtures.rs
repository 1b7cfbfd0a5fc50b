//! A small synthetic street grid in State Plane feet, for tests.
//!
//! Main Street runs east along `y = 0` in seven 200 ft segments with a
//! row of lots on each side (block 100 north, block 101 south). Broadway
//! crosses it at `x = 400`. Island Road is two disconnected 200 ft pieces
//! far to the north, each with one lot (block 200). Two neighborhood
//! areas split the grid at `x = 400`.

#![allow(clippy::missing_panics_doc)]

use geo::{Coord, MultiPolygon, Point, Rect};
use geoscope_geography_models::Bbl;
use geoscope_spatial_models::BufferPolicy;
use serde_json::{Value, json};

use crate::{AreaIndex, GeoIndex, Layer, ParcelIndex, StreetIndex};

/// Easting offset applied to every fixture coordinate.
pub const X0: f64 = 980_000.0;
/// Northing offset applied to every fixture coordinate.
pub const Y0: f64 = 200_000.0;

/// Planar point relative to the fixture origin.
#[must_use]
pub fn point(x: f64, y: f64) -> Point<f64> {
    Point::new(X0 + x, Y0 + y)
}

/// Planar rectangle relative to the fixture origin.
#[must_use]
pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    let rect = Rect::new(
        Coord { x: X0 + x0, y: Y0 + y0 },
        Coord { x: X0 + x1, y: Y0 + y1 },
    );
    MultiPolygon::new(vec![rect.to_polygon()])
}

/// `GeoJSON` polygon geometry for a rectangle relative to the origin.
#[must_use]
pub fn rect_geojson(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
    let (x0, y0, x1, y1) = (X0 + x0, Y0 + y0, X0 + x1, Y0 + y1);
    json!({
        "type": "Polygon",
        "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
    })
}

fn line_geojson(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
    json!({
        "type": "LineString",
        "coordinates": [[X0 + x0, Y0 + y0], [X0 + x1, Y0 + y1]]
    })
}

fn collection(features: Vec<Value>) -> String {
    json!({
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "EPSG:2263" } },
        "features": features
    })
    .to_string()
}

fn feature(properties: Value, geometry: Value) -> Value {
    json!({ "type": "Feature", "properties": properties, "geometry": geometry })
}

/// Manhattan parcel key for a fixture block and lot.
#[must_use]
pub fn bbl(block: u32, lot: u32) -> Bbl {
    Bbl::from_parts(1, block, lot).expect("fixture key")
}

/// Lot `i` (1-7) on the north side of Main Street.
#[must_use]
pub fn north(i: u32) -> Bbl {
    bbl(100, i)
}

/// Lot `i` (1-7) on the south side of Main Street.
#[must_use]
pub fn south(i: u32) -> Bbl {
    bbl(101, i)
}

/// Lot `i` (1-2) on Island Road.
#[must_use]
pub fn island(i: u32) -> Bbl {
    bbl(200, i)
}

/// Rows of the seven Main Street segments, west to east.
#[must_use]
pub fn main_street() -> Vec<usize> {
    (0..7).collect()
}

/// Parcel layer as `GeoJSON` text.
#[must_use]
pub fn parcels_geojson() -> String {
    let mut features = Vec::new();
    for (block, precinct, y0, y1) in [(100, 1, 20.0, 120.0), (101, 5, -120.0, -20.0)] {
        for lot in 1..=7u32 {
            let x0 = 10.0 + 200.0 * f64::from(lot - 1);
            features.push(feature(
                json!({ "BoroCode": 1, "Block": block, "Lot": lot, "PolicePrct": precinct }),
                rect_geojson(x0, y0, x0 + 180.0, y1),
            ));
        }
    }
    for (lot, x0) in [(1, 20.0), (2, 3020.0)] {
        features.push(feature(
            json!({ "BoroCode": "1", "Block": "200", "Lot": lot, "PolicePrct": "7", "NTA2020": "MN9901" }),
            rect_geojson(x0, 5020.0, x0 + 160.0, 5120.0),
        ));
    }
    collection(features)
}

/// Street layer as `GeoJSON` text.
#[must_use]
pub fn streets_geojson() -> String {
    let mut features = Vec::new();
    for i in 1..=7u32 {
        let x0 = 200.0 * f64::from(i - 1);
        features.push(feature(
            json!({ "SegmentID": format!("{i:07}"), "Street": "MAIN STREET", "StreetWidth_Max": 30 }),
            line_geojson(x0, 0.0, x0 + 200.0, 0.0),
        ));
    }
    features.push(feature(
        json!({ "SegmentID": "0000008", "Street": "BROADWAY" }),
        line_geojson(400.0, -400.0, 400.0, 0.0),
    ));
    features.push(feature(
        json!({ "SegmentID": "0000009", "Street": "BROADWAY" }),
        line_geojson(400.0, 0.0, 400.0, 400.0),
    ));
    features.push(feature(
        json!({ "SegmentID": "0000010", "Street": "ISLAND ROAD", "StreetWidth_Max": 20 }),
        line_geojson(0.0, 5000.0, 200.0, 5000.0),
    ));
    features.push(feature(
        json!({ "SegmentID": "0000011", "Street": "ISLAND ROAD", "StreetWidth_Max": 20 }),
        line_geojson(3000.0, 5000.0, 3200.0, 5000.0),
    ));
    collection(features)
}

/// Neighborhood area layer as `GeoJSON` text.
#[must_use]
pub fn areas_geojson() -> String {
    collection(vec![
        feature(
            json!({ "NTA2020": "MN0101", "NTAName": "Westside" }),
            rect_geojson(-100.0, -1000.0, 400.0, 6000.0),
        ),
        feature(
            json!({ "NTA2020": "MN0201", "NTAName": "Eastside" }),
            rect_geojson(400.0, -1000.0, 3500.0, 6000.0),
        ),
    ])
}

/// Parcel index over [`parcels_geojson`].
#[must_use]
pub fn parcel_index() -> ParcelIndex {
    let layer = Layer::from_geojson_str("mappluto", &parcels_geojson(), None).expect("parcels");
    ParcelIndex::from_layer(layer).expect("parcel index")
}

/// Street index over [`streets_geojson`] with the default policy.
#[must_use]
pub fn street_index() -> StreetIndex {
    let layer = Layer::from_geojson_str("lion", &streets_geojson(), None).expect("streets");
    StreetIndex::from_layer(layer, BufferPolicy::default())
}

/// Area index over [`areas_geojson`].
#[must_use]
pub fn area_index() -> AreaIndex {
    let layer = Layer::from_geojson_str("nta2020", &areas_geojson(), None).expect("areas");
    AreaIndex::from_layer(layer).expect("area index")
}

/// All three fixture indexes.
#[must_use]
pub fn geo_index() -> GeoIndex {
    GeoIndex::new(parcel_index(), street_index(), area_index())
}
