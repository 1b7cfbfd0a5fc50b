//! Planar geometry helpers shared by the indexes.
//!
//! Everything here assumes State Plane feet.

use geo::{
    BoundingRect, Coord, LineString, MultiLineString, MultiPolygon, Point, Rect,
    algorithm::buffer::{Buffer, BufferStyle, LineCap, LineJoin},
    unary_union,
};
use rstar::{AABB, RTree, primitives::GeomWithData, primitives::Rectangle};

/// Miter limit for street corridors, as a multiple of the buffer width.
const MITER_LIMIT: f64 = 5.0;

/// R-tree entry: a bounding rectangle tagged with the row it belongs to.
pub(crate) type RowEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

pub(crate) fn rect_envelope(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Bounding rectangle of `rect` grown by `distance` on every side.
pub(crate) fn expanded_envelope(rect: Rect<f64>, distance: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [rect.min().x - distance, rect.min().y - distance],
        [rect.max().x + distance, rect.max().y + distance],
    )
}

/// Bulk-loads an R-tree from `(row, bounding rectangle)` pairs.
pub(crate) fn build_tree(rows: impl IntoIterator<Item = (usize, Rect<f64>)>) -> RTree<RowEnvelope> {
    let entries = rows
        .into_iter()
        .map(|(row, rect)| {
            GeomWithData::new(
                Rectangle::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                row,
            )
        })
        .collect();
    RTree::bulk_load(entries)
}

/// Rows whose bounding rectangle intersects `envelope`, in row order.
pub(crate) fn rows_in_envelope(tree: &RTree<RowEnvelope>, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
    let mut rows: Vec<usize> = tree
        .locate_in_envelope_intersecting(envelope)
        .map(|entry| entry.data)
        .collect();
    rows.sort_unstable();
    rows
}

/// The `k` rows nearest to `point`, by exact distance, nearest first.
///
/// The tree only knows bounding rectangles, so rows are pulled in order
/// of rectangle distance and refined with `exact`. Iteration stops once
/// the next rectangle is farther than the current `k`-th best. Equal
/// distances are broken by row order.
pub(crate) fn nearest_rows<F>(
    tree: &RTree<RowEnvelope>,
    point: Point<f64>,
    k: usize,
    exact: F,
) -> Vec<(usize, f64)>
where
    F: Fn(usize) -> f64,
{
    if k == 0 {
        return Vec::new();
    }

    let mut best: Vec<(usize, f64)> = Vec::with_capacity(k + 1);
    for (entry, envelope_distance_2) in tree.nearest_neighbor_iter_with_distance_2(&[point.x(), point.y()]) {
        if best.len() == k && envelope_distance_2.sqrt() > best[k - 1].1 {
            break;
        }
        let row = entry.data;
        let distance = exact(row);
        let pos = best.partition_point(|(r, d)| d.total_cmp(&distance).then(r.cmp(&row)).is_lt());
        best.insert(pos, (row, distance));
        best.truncate(k);
    }
    best
}

/// Ranks `rows` by exact distance, nearest first, and keeps the first `k`.
pub(crate) fn nearest_among<F>(rows: &[usize], k: usize, exact: F) -> Vec<(usize, f64)>
where
    F: Fn(usize) -> f64,
{
    let mut ranked: Vec<(usize, f64)> = rows.iter().map(|&row| (row, exact(row))).collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    ranked.dedup_by_key(|(row, _)| *row);
    ranked.truncate(k);
    ranked
}

/// Buffers a centerline into a corridor with flat ends and mitred joins.
#[must_use]
pub fn corridor(line: &MultiLineString<f64>, distance: f64) -> MultiPolygon<f64> {
    let style = BufferStyle::new(distance)
        .line_cap(LineCap::Butt)
        .line_join(LineJoin::Miter(MITER_LIMIT));
    line.buffer_with_style(style)
}

/// Buffers a polygon outward by `distance` with rounded corners.
#[must_use]
pub fn grow(area: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    area.buffer(distance)
}

/// Disc of radius `distance` around `point`.
#[must_use]
pub fn disc(point: Point<f64>, distance: f64) -> MultiPolygon<f64> {
    point.buffer(distance)
}

/// Straight corridor between two points.
#[must_use]
pub fn straight_corridor(from: Point<f64>, to: Point<f64>, distance: f64) -> MultiPolygon<f64> {
    let line = MultiLineString::new(vec![LineString::new(vec![
        Coord::from(from),
        Coord::from(to),
    ])]);
    corridor(&line, distance)
}

/// Unions any number of polygons into one.
#[must_use]
pub fn union_all<'a>(areas: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> MultiPolygon<f64> {
    unary_union(areas)
}

/// Bounding rectangle of a polygon set, `None` when empty.
#[must_use]
pub fn bounds(area: &MultiPolygon<f64>) -> Option<Rect<f64>> {
    area.bounding_rect()
}
