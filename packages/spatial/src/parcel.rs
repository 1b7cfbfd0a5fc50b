//! Tax-lot parcel index.
//!
//! Holds every `MapPLUTO` lot as a planar polygon keyed by its BBL, with
//! an R-tree over lot bounding boxes for nearest and intersection
//! queries.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use geo::{
    BoundingRect, Centroid, Distance, Euclidean, Geometry, InteriorPoint, Intersects,
    MultiPolygon, Point,
};
use geoscope_geography_models::{Bbl, Precinct, normalize_area_code};
use geoscope_projection::{ProjectionError, to_geographic, to_planar};
use geoscope_spatial_models::{PARCEL_LAYER_HINT, SourceConfig, columns};
use rstar::RTree;

use crate::{
    SpatialError,
    geometry::{RowEnvelope, build_tree, disc, nearest_rows, rect_envelope, rows_in_envelope},
    source::{Layer, prop_text},
};

/// One tax lot.
#[derive(Debug, Clone)]
pub struct Parcel {
    /// Canonical parcel key.
    pub bbl: Bbl,
    /// Lot polygon in State Plane feet.
    pub geometry: MultiPolygon<f64>,
    /// Police precinct attribute, when the layer carries one.
    pub precinct: Option<Precinct>,
    /// Pre-joined neighborhood area code, when the layer carries one.
    pub area_code: Option<String>,
    /// Polygon centroid in State Plane feet.
    pub centroid: Point<f64>,
}

impl Parcel {
    /// A point guaranteed to lie on the lot: the centroid when it falls
    /// inside the polygon, else an interior point.
    #[must_use]
    pub fn representative_point(&self) -> Point<f64> {
        if self.geometry.intersects(&self.centroid) {
            return self.centroid;
        }
        self.geometry.interior_point().unwrap_or(self.centroid)
    }
}

enum KeyColumns {
    Parts {
        borough: String,
        block: String,
        lot: String,
    },
    Whole(String),
}

/// Spatial index over tax lots.
pub struct ParcelIndex {
    parcels: Vec<Parcel>,
    by_bbl: HashMap<Bbl, usize>,
    by_precinct: BTreeMap<Precinct, Vec<Bbl>>,
    tree: RTree<RowEnvelope>,
}

impl ParcelIndex {
    /// Reads the parcel layer and builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the layer cannot be read or a row's
    /// parcel key cannot be composed.
    pub fn load(config: &SourceConfig) -> Result<Self, SpatialError> {
        Self::from_layer(Layer::read(config, PARCEL_LAYER_HINT)?)
    }

    /// Builds the index from an already-read layer.
    ///
    /// Rows without polygon geometry are skipped. A row whose key cannot
    /// be composed fails the whole load.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Source`] if the layer has neither
    /// borough/block/lot columns nor a BBL column, and
    /// [`SpatialError::ParcelKey`] for a malformed key.
    pub fn from_layer(layer: Layer) -> Result<Self, SpatialError> {
        let available = layer.columns();
        let find = |aliases: &[&str]| columns::resolve(aliases, available.iter().map(String::as_str));

        let keys = match (
            find(columns::PARCEL_BOROUGH),
            find(columns::PARCEL_BLOCK),
            find(columns::PARCEL_LOT),
        ) {
            (Some(borough), Some(block), Some(lot)) => KeyColumns::Parts {
                borough,
                block,
                lot,
            },
            _ => KeyColumns::Whole(find(columns::PARCEL_BBL).ok_or_else(|| {
                SpatialError::Source {
                    layer: layer.name.clone(),
                    message: "no borough/block/lot or BBL columns".to_string(),
                }
            })?),
        };
        let precinct_column = find(columns::PARCEL_PRECINCT);
        let area_column = find(columns::PARCEL_AREA);

        let mut parcels = Vec::with_capacity(layer.features.len());
        let mut skipped = 0usize;

        for (row, feature) in layer.features.into_iter().enumerate() {
            let props = &feature.properties;
            let text = |column: &str| prop_text(props, column).unwrap_or_default();

            let bbl = match &keys {
                KeyColumns::Parts {
                    borough,
                    block,
                    lot,
                } => Bbl::compose(
                    &text(borough.as_str()),
                    &text(block.as_str()),
                    &text(lot.as_str()),
                ),
                KeyColumns::Whole(column) => text(column.as_str()).parse::<Bbl>(),
            }
            .map_err(|source| SpatialError::ParcelKey {
                layer: layer.name.clone(),
                row,
                source,
            })?;

            let geometry = match feature.geometry {
                Some(Geometry::Polygon(p)) => MultiPolygon::new(vec![p]),
                Some(Geometry::MultiPolygon(mp)) => mp,
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            let Some(centroid) = geometry.centroid() else {
                skipped += 1;
                continue;
            };

            let precinct = precinct_column
                .as_deref()
                .and_then(|c| prop_text(props, c))
                .and_then(|s| s.parse().ok());
            let area_code = area_column
                .as_deref()
                .and_then(|c| prop_text(props, c))
                .and_then(|s| normalize_area_code(&s));

            parcels.push(Parcel {
                bbl,
                geometry,
                precinct,
                area_code,
                centroid,
            });
        }

        if skipped > 0 {
            log::warn!("Skipped {skipped} parcels without polygon geometry in '{}'", layer.name);
        }

        Ok(Self::from_parcels(parcels))
    }

    /// Builds the index from parcels already in State Plane feet.
    #[must_use]
    pub fn from_parcels(parcels: Vec<Parcel>) -> Self {
        let mut by_bbl = HashMap::with_capacity(parcels.len());
        let mut by_precinct: BTreeMap<Precinct, BTreeSet<Bbl>> = BTreeMap::new();

        for (row, parcel) in parcels.iter().enumerate() {
            by_bbl.entry(parcel.bbl).or_insert(row);
            if let Some(precinct) = parcel.precinct {
                by_precinct.entry(precinct).or_default().insert(parcel.bbl);
            }
        }

        let tree = build_tree(
            parcels
                .iter()
                .enumerate()
                .filter_map(|(row, p)| p.geometry.bounding_rect().map(|r| (row, r))),
        );

        log::info!(
            "Loaded {} parcels ({} distinct keys) into spatial index",
            parcels.len(),
            by_bbl.len()
        );

        Self {
            parcels,
            by_bbl,
            by_precinct: by_precinct
                .into_iter()
                .map(|(p, keys)| (p, keys.into_iter().collect()))
                .collect(),
            tree,
        }
    }

    /// Number of parcel rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    /// Whether the index holds no parcels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    /// All parcel rows in source order.
    pub fn iter(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.iter()
    }

    /// The first parcel row with the given key.
    #[must_use]
    pub fn get(&self, bbl: &Bbl) -> Option<&Parcel> {
        self.by_bbl.get(bbl).map(|&row| &self.parcels[row])
    }

    /// Parcels for each known key, in the order given. Unknown keys are
    /// skipped.
    #[must_use]
    pub fn by_keys<'a>(&'a self, bbls: &[Bbl]) -> Vec<&'a Parcel> {
        bbls.iter().filter_map(|bbl| self.get(bbl)).collect()
    }

    /// Union of the polygons of the given keys, `None` when no key is
    /// known.
    #[must_use]
    pub fn union_of(&self, bbls: &[Bbl]) -> Option<MultiPolygon<f64>> {
        let parcels = self.by_keys(bbls);
        if parcels.is_empty() {
            return None;
        }
        Some(crate::geometry::union_all(parcels.iter().map(|p| &p.geometry)))
    }

    /// Parcel containing or nearest to a planar point, with its distance
    /// in feet (zero when contained).
    #[must_use]
    pub fn nearest_to(&self, point: Point<f64>) -> Option<(&Parcel, f64)> {
        nearest_rows(&self.tree, point, 1, |row| {
            Euclidean.distance(&point, &self.parcels[row].geometry)
        })
        .first()
        .map(|&(row, distance)| (&self.parcels[row], distance))
    }

    /// Parcel key containing or nearest to a WGS84 coordinate, with its
    /// distance in feet.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the coordinate is invalid.
    pub fn nearest(&self, lon: f64, lat: f64) -> Result<Option<(Bbl, f64)>, ProjectionError> {
        let (x, y) = to_planar(lon, lat)?;
        Ok(self
            .nearest_to(Point::new(x, y))
            .map(|(parcel, distance)| (parcel.bbl, distance)))
    }

    /// Parcels whose polygon intersects `area`, in row order.
    #[must_use]
    pub fn intersecting(&self, area: &MultiPolygon<f64>) -> Vec<&Parcel> {
        let Some(rect) = area.bounding_rect() else {
            return Vec::new();
        };
        rows_in_envelope(&self.tree, &rect_envelope(rect))
            .into_iter()
            .map(|row| &self.parcels[row])
            .filter(|parcel| parcel.geometry.intersects(area))
            .collect()
    }

    /// Distinct keys of parcels intersecting `area`, sorted.
    #[must_use]
    pub fn keys_intersecting(&self, area: &MultiPolygon<f64>) -> Vec<Bbl> {
        sorted_keys(self.intersecting(area).into_iter().map(|p| p.bbl))
    }

    /// Keys of parcels within `buffer_ft` of a planar point, sorted. A
    /// zero buffer returns the parcels containing the point.
    #[must_use]
    pub fn within_planar(&self, point: Point<f64>, buffer_ft: f64) -> Vec<Bbl> {
        if buffer_ft > 0.0 {
            return self.keys_intersecting(&disc(point, buffer_ft));
        }
        let rows = rows_in_envelope(
            &self.tree,
            &rstar::AABB::from_point([point.x(), point.y()]),
        );
        sorted_keys(
            rows.into_iter()
                .map(|row| &self.parcels[row])
                .filter(|p| p.geometry.intersects(&point))
                .map(|p| p.bbl),
        )
    }

    /// Keys of parcels within `buffer_ft` of a WGS84 coordinate, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the coordinate is invalid.
    pub fn within(&self, lon: f64, lat: f64, buffer_ft: f64) -> Result<Vec<Bbl>, ProjectionError> {
        let (x, y) = to_planar(lon, lat)?;
        Ok(self.within_planar(Point::new(x, y), buffer_ft))
    }

    /// WGS84 longitude/latitude of a point on the parcel, `None` for an
    /// unknown key.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the conversion back to WGS84 fails.
    pub fn representative_point(&self, bbl: &Bbl) -> Result<Option<(f64, f64)>, ProjectionError> {
        let Some(parcel) = self.get(bbl) else {
            return Ok(None);
        };
        let point = parcel.representative_point();
        to_geographic(point.x(), point.y()).map(Some)
    }

    /// Police precinct attribute of a parcel.
    #[must_use]
    pub fn precinct_of(&self, bbl: &Bbl) -> Option<Precinct> {
        self.get(bbl).and_then(|p| p.precinct)
    }

    /// Sorted keys of every parcel carrying the given precinct attribute.
    #[must_use]
    pub fn keys_in_precinct(&self, precinct: Precinct) -> Vec<Bbl> {
        self.by_precinct.get(&precinct).cloned().unwrap_or_default()
    }
}

/// Sorts and de-duplicates parcel keys.
pub(crate) fn sorted_keys(keys: impl IntoIterator<Item = Bbl>) -> Vec<Bbl> {
    let set: BTreeSet<Bbl> = keys.into_iter().collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use geoscope_projection::to_geographic;

    use super::*;
    use crate::fixtures::{self, X0, Y0, north, south};

    #[test]
    fn loads_every_fixture_parcel() {
        let index = fixtures::parcel_index();
        assert_eq!(index.len(), 16);
        assert!(index.get(&north(3)).is_some());
        assert_eq!(index.precinct_of(&south(2)), Some(5));
    }

    #[test]
    fn nearest_prefers_containing_parcel() {
        let index = fixtures::parcel_index();
        let (parcel, distance) = index.nearest_to(fixtures::point(300.0, 70.0)).unwrap();
        assert_eq!(parcel.bbl, north(2));
        assert!(distance.abs() < 1e-9);
    }

    #[test]
    fn nearest_ties_resolve_to_first_row() {
        let index = fixtures::parcel_index();
        // Midway between north lot 2 and south lot 2.
        let (parcel, distance) = index.nearest_to(fixtures::point(300.0, 0.0)).unwrap();
        assert_eq!(parcel.bbl, north(2));
        assert!((distance - 20.0).abs() < 1e-9);
    }

    #[test]
    fn nearest_from_wgs84() {
        let index = fixtures::parcel_index();
        let (lon, lat) = to_geographic(X0 + 500.0, Y0 + 200.0).unwrap();
        let (bbl, distance) = index.nearest(lon, lat).unwrap().unwrap();
        assert_eq!(bbl, north(3));
        assert!((distance - 80.0).abs() < 0.01);
    }

    #[test]
    fn within_buffer_collects_sorted_keys() {
        let index = fixtures::parcel_index();
        let keys = index.within_planar(fixtures::point(400.0, 0.0), 30.0);
        assert_eq!(keys, vec![north(2), north(3), south(2), south(3)]);
    }

    #[test]
    fn within_zero_buffer_is_containment() {
        let index = fixtures::parcel_index();
        assert_eq!(index.within_planar(fixtures::point(100.0, 70.0), 0.0), vec![north(1)]);
        assert!(index.within_planar(fixtures::point(200.0, 70.0), 0.0).is_empty());
    }

    #[test]
    fn invalid_coordinates_are_errors() {
        let index = fixtures::parcel_index();
        assert!(index.nearest(f64::NAN, 40.7).is_err());
        assert!(index.within(-73.9, f64::INFINITY, 10.0).is_err());
    }

    #[test]
    fn representative_point_lies_on_parcel() {
        let index = fixtures::parcel_index();
        let (lon, lat) = index.representative_point(&north(1)).unwrap().unwrap();
        let (x, y) = to_planar(lon, lat).unwrap();
        assert!((x - (X0 + 100.0)).abs() < 0.01);
        assert!((y - (Y0 + 70.0)).abs() < 0.01);
    }

    #[test]
    fn representative_point_of_unknown_key_is_none() {
        let index = fixtures::parcel_index();
        let unknown = Bbl::from_parts(5, 1, 1).unwrap();
        assert_eq!(index.representative_point(&unknown).unwrap(), None);
    }

    #[test]
    fn precinct_lookup_is_sorted() {
        let index = fixtures::parcel_index();
        let keys = index.keys_in_precinct(5);
        assert_eq!(keys.len(), 7);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(index.keys_in_precinct(99).is_empty());
    }

    #[test]
    fn union_skips_unknown_keys() {
        let index = fixtures::parcel_index();
        let unknown = Bbl::from_parts(5, 1, 1).unwrap();
        assert!(index.union_of(&[unknown]).is_none());
        assert!(index.union_of(&[unknown, north(1)]).is_some());
    }

    #[test]
    fn malformed_key_fails_the_load() {
        let text = serde_json::json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:2263" } },
            "features": [{
                "type": "Feature",
                "properties": { "BoroCode": 9, "Block": 1, "Lot": 1 },
                "geometry": fixtures::rect_geojson(0.0, 0.0, 10.0, 10.0)
            }]
        })
        .to_string();
        let layer = Layer::from_geojson_str("pluto", &text, None).unwrap();
        assert!(matches!(
            ParcelIndex::from_layer(layer),
            Err(SpatialError::ParcelKey { row: 0, .. })
        ));
    }

    #[test]
    fn whole_bbl_column_is_used_without_parts() {
        let text = serde_json::json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:2263" } },
            "features": [{
                "type": "Feature",
                "properties": { "BBL": 1013007501.0 },
                "geometry": fixtures::rect_geojson(0.0, 0.0, 10.0, 10.0)
            }]
        })
        .to_string();
        let layer = Layer::from_geojson_str("pluto", &text, None).unwrap();
        let index = ParcelIndex::from_layer(layer).unwrap();
        assert_eq!(
            index.iter().next().map(|p| p.bbl.to_string()),
            Some("1013007501".to_string())
        );
    }
}
