//! Reading `GeoJSON` layers from disk.
//!
//! A source is either a single `GeoJSON` file or a directory with one
//! `.geojson` / `.json` file per layer. When a directory holds several
//! layers, the first whose name contains the caller's hint wins (e.g.
//! `"mappluto"`), then the first layer in name order.
//!
//! Every geometry is reprojected into State Plane feet as it is read.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use geojson::{FeatureCollection, GeoJson};
use geoscope_projection::{Crs, Transformer};
use geoscope_spatial_models::SourceConfig;
use serde_json::{Map, Value};

use crate::SpatialError;

/// One feature: its attributes and its planar geometry.
#[derive(Debug, Clone)]
pub struct LayerFeature {
    /// Attribute columns.
    pub properties: Map<String, Value>,
    /// Geometry in State Plane feet, `None` when the feature has none.
    pub geometry: Option<geo::Geometry<f64>>,
}

/// A layer read from a source and reprojected to State Plane feet.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer name (file stem).
    pub name: String,
    /// CRS the layer was published in.
    pub native_crs: Crs,
    /// Features in file order.
    pub features: Vec<LayerFeature>,
}

impl Layer {
    /// Reads the layer a [`SourceConfig`] points at.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the path cannot be read, holds no
    /// layers, is not a `GeoJSON` feature collection, or has no usable
    /// CRS.
    pub fn read(config: &SourceConfig, hint: &str) -> Result<Self, SpatialError> {
        let path = pick_layer(config, hint)?;
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().to_string());

        log::info!("Reading layer '{name}' from {}", path.display());

        let text = std::fs::read_to_string(&path).map_err(|source| SpatialError::Io {
            path: path.clone(),
            source,
        })?;

        Self::from_geojson_str(&name, &text, config.epsg)
    }

    /// Parses a layer from `GeoJSON` text.
    ///
    /// The CRS comes from the legacy `crs` member when present, else from
    /// `epsg_override`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the text is not a feature collection,
    /// the CRS is missing or unsupported, or a geometry fails to convert
    /// or reproject.
    pub fn from_geojson_str(
        name: &str,
        text: &str,
        epsg_override: Option<u32>,
    ) -> Result<Self, SpatialError> {
        let geojson: GeoJson = text.parse().map_err(|source| SpatialError::GeoJson {
            layer: name.to_string(),
            source: Box::new(source),
        })?;

        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(SpatialError::Source {
                layer: name.to_string(),
                message: "expected a FeatureCollection".to_string(),
            });
        };

        let native_crs = layer_crs(name, &collection, epsg_override)?;
        let transformer = Transformer::new(native_crs, Crs::PLANAR)?;

        let mut features = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let geometry = match feature.geometry {
                Some(geometry) => {
                    let geometry: geo::Geometry<f64> =
                        geometry.try_into().map_err(|source| SpatialError::GeoJson {
                            layer: name.to_string(),
                            source: Box::new(source),
                        })?;
                    Some(transformer.convert_geometry(&geometry)?)
                }
                None => None,
            };
            features.push(LayerFeature {
                properties: feature.properties.unwrap_or_default(),
                geometry,
            });
        }

        log::debug!(
            "Layer '{name}': {} features, native CRS {native_crs}",
            features.len()
        );

        Ok(Self {
            name: name.to_string(),
            native_crs,
            features,
        })
    }

    /// Every attribute column seen on any feature, in name order.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .features
            .iter()
            .flat_map(|f| f.properties.keys().map(String::as_str))
            .collect();
        set.into_iter().map(ToString::to_string).collect()
    }
}

fn layer_crs(
    name: &str,
    collection: &FeatureCollection,
    epsg_override: Option<u32>,
) -> Result<Crs, SpatialError> {
    let declared = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(Value::as_str);

    if let Some(declared) = declared {
        return Crs::from_name(declared).ok_or_else(|| SpatialError::Crs {
            layer: name.to_string(),
            message: format!("unsupported CRS '{declared}'"),
        });
    }

    match epsg_override {
        Some(code) => Crs::from_epsg(code).ok_or_else(|| SpatialError::Crs {
            layer: name.to_string(),
            message: format!("unsupported EPSG:{code}"),
        }),
        None => Err(SpatialError::Crs {
            layer: name.to_string(),
            message: "no CRS declared and no EPSG override configured".to_string(),
        }),
    }
}

/// Resolves the concrete file a source config points at.
fn pick_layer(config: &SourceConfig, hint: &str) -> Result<PathBuf, SpatialError> {
    if !config.path.is_dir() {
        return Ok(config.path.clone());
    }

    let mut layers = list_layers(&config.path)?;
    layers.sort();

    let source_name = config.path.display().to_string();
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    };

    if let Some(wanted) = &config.layer {
        let wanted = wanted.to_lowercase();
        return layers
            .into_iter()
            .find(|p| stem(p.as_path()) == wanted)
            .ok_or_else(|| SpatialError::Source {
                layer: source_name,
                message: format!("layer '{wanted}' not found"),
            });
    }

    if let Some(hinted) = layers.iter().find(|p| stem(p.as_path()).contains(hint)) {
        return Ok(hinted.clone());
    }

    layers.into_iter().next().ok_or_else(|| SpatialError::Source {
        layer: source_name,
        message: "directory holds no .geojson or .json layers".to_string(),
    })
}

fn list_layers(dir: &Path) -> Result<Vec<PathBuf>, SpatialError> {
    let io_err = |source| SpatialError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut layers = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_layer = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("geojson") || e.eq_ignore_ascii_case("json"));
        if is_layer {
            layers.push(path);
        }
    }
    Ok(layers)
}

/// Reads an attribute as trimmed text.
///
/// Numbers holding whole values render without a fraction (`1300.0`
/// becomes `"1300"`). Blank strings and non-scalar values are `None`.
#[must_use]
pub fn prop_text(properties: &Map<String, Value>, column: &str) -> Option<String> {
    match properties.get(column)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 {
                    Some(format!("{f:.0}"))
                } else {
                    Some(f.to_string())
                }
            }
        }
        _ => None,
    }
}

/// Reads an attribute as a finite float, parsing numeric strings.
#[must_use]
pub fn prop_f64(properties: &Map<String, Value>, column: &str) -> Option<f64> {
    let value = match properties.get(column)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use geo::{BoundingRect, Geometry};
    use serde_json::json;

    use super::*;

    fn collection(crs: Option<&str>) -> String {
        let mut fc = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "Block": 1300.0, "Name": "  Midtown ", "Width": "42" },
                "geometry": { "type": "Point", "coordinates": [-73.9855, 40.758] }
            }]
        });
        if let Some(crs) = crs {
            fc["crs"] = json!({ "type": "name", "properties": { "name": crs } });
        }
        fc.to_string()
    }

    #[test]
    fn declared_crs_is_reprojected_to_planar() {
        let layer =
            Layer::from_geojson_str("nta", &collection(Some("urn:ogc:def:crs:OGC:1.3:CRS84")), None)
                .unwrap();
        assert_eq!(layer.native_crs, Crs::Wgs84);
        let Some(Geometry::Point(p)) = &layer.features[0].geometry else {
            panic!("expected a point");
        };
        assert!((980_000.0..1_000_000.0).contains(&p.x()));
        assert!((205_000.0..225_000.0).contains(&p.y()));
    }

    #[test]
    fn missing_crs_without_override_is_fatal() {
        let err = Layer::from_geojson_str("nta", &collection(None), None).unwrap_err();
        assert!(matches!(err, SpatialError::Crs { .. }));
    }

    #[test]
    fn override_supplies_missing_crs() {
        let layer = Layer::from_geojson_str("nta", &collection(None), Some(4326)).unwrap();
        assert_eq!(layer.native_crs, Crs::Wgs84);
    }

    #[test]
    fn unsupported_crs_is_fatal() {
        let err =
            Layer::from_geojson_str("nta", &collection(Some("EPSG:32618")), None).unwrap_err();
        assert!(matches!(err, SpatialError::Crs { .. }));
    }

    #[test]
    fn planar_layers_keep_their_coordinates() {
        let text = json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:2263" } },
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "LineString", "coordinates": [[1.0, 2.0], [3.0, 4.0]] }
            }]
        })
        .to_string();
        let layer = Layer::from_geojson_str("lion", &text, None).unwrap();
        let rect = layer.features[0]
            .geometry
            .as_ref()
            .and_then(|g| g.bounding_rect())
            .unwrap();
        assert!((rect.min().x - 1.0).abs() < 1e-9 && (rect.max().y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn property_readers() {
        let layer = Layer::from_geojson_str("nta", &collection(None), Some(4326)).unwrap();
        let props = &layer.features[0].properties;
        assert_eq!(prop_text(props, "Block"), Some("1300".to_string()));
        assert_eq!(prop_text(props, "Name"), Some("Midtown".to_string()));
        assert_eq!(prop_f64(props, "Width"), Some(42.0));
        assert_eq!(prop_text(props, "Missing"), None);
        assert_eq!(layer.columns(), vec!["Block", "Name", "Width"]);
    }

    #[test]
    fn non_collections_are_rejected() {
        let text = json!({ "type": "Point", "coordinates": [0.0, 0.0] }).to_string();
        let err = Layer::from_geojson_str("x", &text, Some(2263)).unwrap_err();
        assert!(matches!(err, SpatialError::Source { .. }));
    }
}
