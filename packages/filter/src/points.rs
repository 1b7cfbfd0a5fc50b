//! Filtering fetched rows by location.
//!
//! Some datasets carry only a longitude/latitude pair. Their rows are
//! fetched unscoped and kept when the point falls inside the scope.

use geoscope_geography_models::Bbl;
use geoscope_resolve::Resolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names of the coordinate columns of a point dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointColumns {
    /// Longitude column.
    pub longitude: String,
    /// Latitude column.
    pub latitude: String,
}

impl Default for PointColumns {
    fn default() -> Self {
        Self {
            longitude: "longitude".to_string(),
            latitude: "latitude".to_string(),
        }
    }
}

/// Reads a coordinate that may be a JSON number or a numeric string.
fn coordinate(row: &Value, column: &str) -> Option<f64> {
    match row.get(column)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Keeps the rows whose point lies within `buffer_ft` of the scope
/// parcels. Rows without a readable point are dropped.
#[must_use]
pub fn rows_in_scope(
    resolver: &Resolver,
    rows: Vec<Value>,
    columns: &PointColumns,
    scope: &[Bbl],
    buffer_ft: f64,
) -> Vec<Value> {
    let located: Vec<(usize, (f64, f64))> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let lon = coordinate(row, &columns.longitude)?;
            let lat = coordinate(row, &columns.latitude)?;
            Some((i, (lon, lat)))
        })
        .collect();
    let points: Vec<(f64, f64)> = located.iter().map(|(_, point)| *point).collect();

    let mut keep = vec![false; rows.len()];
    for position in resolver.points_in_scope(&points, scope, buffer_ft) {
        keep[located[position].0] = true;
    }

    let total = rows.len();
    let kept: Vec<Value> = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect();
    log::debug!("{} of {total} rows fall inside the scope", kept.len());
    kept
}
