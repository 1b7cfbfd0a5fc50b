//! Neighborhood area index (NTA / CDTA polygons).

use geo::{Area, BooleanOps, BoundingRect, Geometry, Intersects, MultiPolygon, Point};
use geoscope_geography_models::normalize_area_code;
use geoscope_projection::Crs;
use geoscope_spatial_models::{AREA_LAYER_HINT, SourceConfig, columns};
use rstar::RTree;

use crate::{
    SpatialError,
    geometry::{RowEnvelope, build_tree, rect_envelope, rows_in_envelope},
    source::{Layer, prop_text},
};

/// Overlaps closer than this (square feet) count as equal.
const OVERLAP_EPSILON: f64 = 1e-3;

/// One neighborhood tabulation area.
#[derive(Debug, Clone)]
pub struct NeighborhoodArea {
    /// Normalized four-character area code (e.g. `"MN17"`).
    pub code: String,
    /// Human-readable name.
    pub name: Option<String>,
    /// Boundary in State Plane feet.
    pub geometry: MultiPolygon<f64>,
}

/// Spatial index over neighborhood areas.
pub struct AreaIndex {
    areas: Vec<NeighborhoodArea>,
    tree: RTree<RowEnvelope>,
    native_crs: Crs,
}

impl AreaIndex {
    /// Reads the area layer and builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the layer cannot be read or has no
    /// area-code column.
    pub fn load(config: &SourceConfig) -> Result<Self, SpatialError> {
        Self::from_layer(Layer::read(config, AREA_LAYER_HINT)?)
    }

    /// Builds the index from an already-read layer.
    ///
    /// The community-district code (`CDTA2020`) is preferred; otherwise
    /// the NTA code is cut to its four-character district prefix. Rows
    /// without a code or polygon geometry are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Source`] if the layer has no code column.
    pub fn from_layer(layer: Layer) -> Result<Self, SpatialError> {
        let available = layer.columns();
        let find = |aliases: &[&str]| columns::resolve(aliases, available.iter().map(String::as_str));
        let code_column = find(columns::AREA_CDTA)
            .or_else(|| find(columns::AREA_NTA))
            .ok_or_else(|| SpatialError::Source {
                layer: layer.name.clone(),
                message: "no CDTA or NTA code column".to_string(),
            })?;
        let name_column = find(columns::AREA_NAME);

        let mut areas = Vec::with_capacity(layer.features.len());
        let mut skipped = 0usize;

        for feature in layer.features {
            let props = &feature.properties;
            let code = prop_text(props, &code_column).and_then(|c| normalize_area_code(&c));
            let geometry = match feature.geometry {
                Some(Geometry::Polygon(p)) => Some(MultiPolygon::new(vec![p])),
                Some(Geometry::MultiPolygon(mp)) => Some(mp),
                _ => None,
            };
            let (Some(code), Some(geometry)) = (code, geometry) else {
                skipped += 1;
                continue;
            };
            areas.push(NeighborhoodArea {
                code,
                name: name_column.as_deref().and_then(|c| prop_text(props, c)),
                geometry,
            });
        }

        if skipped > 0 {
            log::warn!("Skipped {skipped} area rows without a code or polygon in '{}'", layer.name);
        }

        Ok(Self::from_areas(areas, layer.native_crs))
    }

    /// Builds the index from areas already in State Plane feet.
    #[must_use]
    pub fn from_areas(areas: Vec<NeighborhoodArea>, native_crs: Crs) -> Self {
        let tree = build_tree(
            areas
                .iter()
                .enumerate()
                .filter_map(|(row, a)| a.geometry.bounding_rect().map(|r| (row, r))),
        );
        log::info!("Loaded {} neighborhood areas into spatial index", areas.len());
        Self {
            areas,
            tree,
            native_crs,
        }
    }

    /// Number of area rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether the index holds no areas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// CRS the layer was published in before reprojection.
    #[must_use]
    pub const fn native_crs(&self) -> Crs {
        self.native_crs
    }

    /// All areas in source order.
    pub fn iter(&self) -> impl Iterator<Item = &NeighborhoodArea> {
        self.areas.iter()
    }

    /// Area with the largest overlap with `geometry`.
    ///
    /// Only areas that intersect the geometry are considered. Equal
    /// overlaps (within a thousandth of a square foot) go to the earlier
    /// row; when nothing overlaps by a
    /// positive area (the geometry only touches boundaries), the first
    /// intersecting row wins.
    #[must_use]
    pub fn best_overlap(&self, geometry: &MultiPolygon<f64>) -> Option<&NeighborhoodArea> {
        let rect = geometry.bounding_rect()?;
        let mut best: Option<(&NeighborhoodArea, f64)> = None;
        for row in rows_in_envelope(&self.tree, &rect_envelope(rect)) {
            let area = &self.areas[row];
            if !area.geometry.intersects(geometry) {
                continue;
            }
            let overlap = area.geometry.intersection(geometry).unsigned_area();
            match best {
                Some((_, current)) if overlap <= current + OVERLAP_EPSILON => {}
                _ => best = Some((area, overlap)),
            }
        }
        best.map(|(area, _)| area)
    }

    /// Area containing a planar point; the earlier row wins on shared
    /// boundaries.
    #[must_use]
    pub fn containing(&self, point: Point<f64>) -> Option<&NeighborhoodArea> {
        rows_in_envelope(&self.tree, &rstar::AABB::from_point([point.x(), point.y()]))
            .into_iter()
            .map(|row| &self.areas[row])
            .find(|area| area.geometry.intersects(&point))
    }

    /// Every area row carrying the given code (after normalization).
    #[must_use]
    pub fn with_code(&self, code: &str) -> Vec<&NeighborhoodArea> {
        let Some(code) = normalize_area_code(code) else {
            return Vec::new();
        };
        self.areas.iter().filter(|a| a.code == code).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn nta_codes_are_cut_to_district_prefix() {
        let index = fixtures::area_index();
        let codes: Vec<&str> = index.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["MN01", "MN02"]);
        assert_eq!(index.iter().next().and_then(|a| a.name.as_deref()), Some("Westside"));
    }

    #[test]
    fn best_overlap_picks_largest_share() {
        let index = fixtures::area_index();
        // 50 ft in MN01, 150 ft in MN02.
        let straddling = fixtures::rect(350.0, 20.0, 550.0, 120.0);
        assert_eq!(index.best_overlap(&straddling).map(|a| a.code.as_str()), Some("MN02"));
    }

    #[test]
    fn equal_overlap_goes_to_earlier_row() {
        let index = fixtures::area_index();
        let centered = fixtures::rect(300.0, 20.0, 500.0, 120.0);
        assert_eq!(index.best_overlap(&centered).map(|a| a.code.as_str()), Some("MN01"));
    }

    #[test]
    fn outside_every_area_is_none() {
        let index = fixtures::area_index();
        let far = fixtures::rect(9000.0, 9000.0, 9100.0, 9100.0);
        assert!(index.best_overlap(&far).is_none());
        assert!(index.containing(fixtures::point(9000.0, 9000.0)).is_none());
    }

    #[test]
    fn containing_point() {
        let index = fixtures::area_index();
        assert_eq!(
            index.containing(fixtures::point(1000.0, 0.0)).map(|a| a.code.as_str()),
            Some("MN02")
        );
    }

    #[test]
    fn code_lookup_normalizes_input() {
        let index = fixtures::area_index();
        assert_eq!(index.with_code("mn0101").len(), 1);
        assert!(index.with_code("BK09").is_empty());
    }
}
