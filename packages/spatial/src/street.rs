//! Street centerline index.
//!
//! Holds LION segments as planar line strings, turns them into corridor
//! polygons under a [`BufferPolicy`], and answers connectivity queries
//! over a segment graph whose nodes are segment endpoints.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::OnceLock,
};

use geo::{
    BoundingRect, Coord, Distance, Euclidean, Geometry, Intersects, Length, LineString,
    MultiLineString, MultiPolygon, Point,
};
use geoscope_geography_models::SegmentId;
use geoscope_spatial_models::{BufferPolicy, STREET_LAYER_HINT, SourceConfig, columns};
use rstar::RTree;

use crate::{
    SpatialError,
    geometry::{
        RowEnvelope, build_tree, corridor, expanded_envelope, nearest_among, nearest_rows,
        rect_envelope, rows_in_envelope,
    },
    source::{Layer, prop_f64, prop_text},
};

/// Graph node: an endpoint quantized to tenths of a foot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    x: i64,
    y: i64,
}

impl NodeKey {
    #[allow(clippy::cast_possible_truncation)]
    fn quantize(coord: Coord<f64>) -> Self {
        Self {
            x: (coord.x * 10.0).round() as i64,
            y: (coord.y * 10.0).round() as i64,
        }
    }
}

/// One street centerline segment.
#[derive(Debug, Clone)]
pub struct StreetSegment {
    /// Source segment id.
    pub id: SegmentId,
    /// Trimmed street name.
    pub name: Option<String>,
    /// Published street width in feet.
    pub width_ft: Option<f64>,
    /// Centerline in State Plane feet.
    pub geometry: MultiLineString<f64>,
    endpoints: Option<(NodeKey, NodeKey)>,
}

impl StreetSegment {
    /// Builds a segment, deriving graph endpoints from its longest part.
    #[must_use]
    pub fn new(
        id: SegmentId,
        name: Option<String>,
        width_ft: Option<f64>,
        geometry: MultiLineString<f64>,
    ) -> Self {
        let endpoints = geometry
            .0
            .iter()
            .max_by(|a, b| Euclidean.length(*a).total_cmp(&Euclidean.length(*b)))
            .and_then(|line| Some((*line.0.first()?, *line.0.last()?)))
            .map(|(a, b)| (NodeKey::quantize(a), NodeKey::quantize(b)));
        Self {
            id,
            name,
            width_ft,
            geometry,
            endpoints,
        }
    }

    /// Quantized start and end nodes, `None` for empty geometry.
    #[must_use]
    pub const fn endpoints(&self) -> Option<(NodeKey, NodeKey)> {
        self.endpoints
    }
}

/// Endpoint adjacency over the whole network.
pub struct Adjacency {
    by_node: HashMap<NodeKey, Vec<usize>>,
}

impl Adjacency {
    fn build(segments: &[StreetSegment]) -> Self {
        let mut by_node: HashMap<NodeKey, Vec<usize>> = HashMap::new();
        for (row, segment) in segments.iter().enumerate() {
            if let Some((a, b)) = segment.endpoints {
                by_node.entry(a).or_default().push(row);
                if b != a {
                    by_node.entry(b).or_default().push(row);
                }
            }
        }
        Self { by_node }
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.by_node.len()
    }

    /// Segments at a node, in row order.
    #[must_use]
    pub fn at(&self, node: NodeKey) -> &[usize] {
        self.by_node.get(&node).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Spatial index over street centerlines.
pub struct StreetIndex {
    segments: Vec<StreetSegment>,
    by_id: HashMap<SegmentId, usize>,
    tree: RTree<RowEnvelope>,
    policy: BufferPolicy,
    adjacency: OnceLock<Adjacency>,
}

impl StreetIndex {
    /// Reads the street layer and builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the layer cannot be read.
    pub fn load(config: &SourceConfig, policy: BufferPolicy) -> Result<Self, SpatialError> {
        Ok(Self::from_layer(
            Layer::read(config, STREET_LAYER_HINT)?,
            policy,
        ))
    }

    /// Builds the index from an already-read layer. Rows without line
    /// geometry are skipped.
    #[must_use]
    pub fn from_layer(layer: Layer, policy: BufferPolicy) -> Self {
        let available = layer.columns();
        let find = |aliases: &[&str]| columns::resolve(aliases, available.iter().map(String::as_str));
        let name_column = find(columns::STREET_NAME);
        let width_column = find(columns::STREET_WIDTH);
        let id_column = find(columns::STREET_SEGMENT_ID);

        if name_column.is_none() {
            log::warn!("Street layer '{}' has no street-name column", layer.name);
        }

        let mut segments = Vec::with_capacity(layer.features.len());
        let mut skipped = 0usize;

        for (row, feature) in layer.features.into_iter().enumerate() {
            let props = &feature.properties;
            let geometry = match feature.geometry {
                Some(Geometry::LineString(line)) => MultiLineString::new(vec![line]),
                Some(Geometry::MultiLineString(lines)) => lines,
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            let id = id_column
                .as_deref()
                .and_then(|c| prop_text(props, c))
                .unwrap_or_else(|| row.to_string());
            let name = name_column.as_deref().and_then(|c| prop_text(props, c));
            let width_ft = width_column
                .as_deref()
                .and_then(|c| prop_f64(props, c))
                .filter(|w| *w >= 0.0);

            segments.push(StreetSegment::new(SegmentId(id), name, width_ft, geometry));
        }

        if skipped > 0 {
            log::warn!("Skipped {skipped} street rows without line geometry in '{}'", layer.name);
        }

        Self::from_segments(segments, policy)
    }

    /// Builds the index from segments already in State Plane feet.
    #[must_use]
    pub fn from_segments(segments: Vec<StreetSegment>, policy: BufferPolicy) -> Self {
        let mut by_id = HashMap::with_capacity(segments.len());
        for (row, segment) in segments.iter().enumerate() {
            by_id.entry(segment.id.clone()).or_insert(row);
        }
        let tree = build_tree(
            segments
                .iter()
                .enumerate()
                .filter_map(|(row, s)| s.geometry.bounding_rect().map(|r| (row, r))),
        );

        log::info!("Loaded {} street segments into spatial index", segments.len());

        Self {
            segments,
            by_id,
            tree,
            policy,
            adjacency: OnceLock::new(),
        }
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the index holds no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Buffer policy corridors are built with.
    #[must_use]
    pub const fn policy(&self) -> &BufferPolicy {
        &self.policy
    }

    /// Segment at a row.
    #[must_use]
    pub fn segment(&self, row: usize) -> Option<&StreetSegment> {
        self.segments.get(row)
    }

    /// Row of the first segment with the given source id.
    #[must_use]
    pub fn row_of(&self, id: &SegmentId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Buffer distance for a segment, honoring a fixed override.
    #[must_use]
    pub fn buffer_distance(&self, row: usize, fixed_ft: Option<f64>) -> f64 {
        let width = self.segments.get(row).and_then(|s| s.width_ft);
        self.policy.resolve(width, fixed_ft)
    }

    /// Corridor polygon of a segment.
    #[must_use]
    pub fn corridor(&self, row: usize, fixed_ft: Option<f64>) -> MultiPolygon<f64> {
        self.segments.get(row).map_or_else(
            || MultiPolygon::new(vec![]),
            |s| corridor(&s.geometry, self.buffer_distance(row, fixed_ft)),
        )
    }

    /// Corridor polygons of several segments.
    #[must_use]
    pub fn corridors(&self, rows: &[usize], fixed_ft: Option<f64>) -> Vec<MultiPolygon<f64>> {
        rows.iter().map(|&row| self.corridor(row, fixed_ft)).collect()
    }

    /// Rows whose corridor intersects `area`, in row order.
    #[must_use]
    pub fn corridors_touching(&self, area: &MultiPolygon<f64>, fixed_ft: Option<f64>) -> Vec<usize> {
        let Some(rect) = area.bounding_rect() else {
            return Vec::new();
        };
        let reach = expanded_envelope(rect, self.policy.max_for(fixed_ft));
        rows_in_envelope(&self.tree, &reach)
            .into_iter()
            .filter(|&row| self.corridor(row, fixed_ft).intersects(area))
            .collect()
    }

    /// Rows whose raw centerline intersects `area`, in row order.
    #[must_use]
    pub fn lines_touching(&self, area: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(rect) = area.bounding_rect() else {
            return Vec::new();
        };
        rows_in_envelope(&self.tree, &rect_envelope(rect))
            .into_iter()
            .filter(|&row| self.segments[row].geometry.intersects(area))
            .collect()
    }

    /// Rows whose street name contains `fragment`, case-insensitively.
    /// An empty fragment matches nothing.
    #[must_use]
    pub fn matching_name(&self, fragment: &str) -> Vec<usize> {
        let fragment = fragment.trim().to_uppercase();
        if fragment.is_empty() {
            return Vec::new();
        }
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.name
                    .as_ref()
                    .is_some_and(|n| n.to_uppercase().contains(&fragment))
            })
            .map(|(row, _)| row)
            .collect()
    }

    /// The `k` segments nearest a planar point, nearest first. When
    /// `among` is given only those rows are considered.
    #[must_use]
    pub fn nearest(&self, point: Point<f64>, k: usize, among: Option<&[usize]>) -> Vec<usize> {
        let distance = |row: usize| Euclidean.distance(&point, &self.segments[row].geometry);
        let ranked = match among {
            Some(rows) => nearest_among(rows, k, distance),
            None => nearest_rows(&self.tree, point, k, distance),
        };
        ranked.into_iter().map(|(row, _)| row).collect()
    }

    /// Endpoint adjacency, built on first use.
    pub fn adjacency(&self) -> &Adjacency {
        self.adjacency.get_or_init(|| {
            let adjacency = Adjacency::build(&self.segments);
            log::info!(
                "Built street adjacency: {} nodes over {} segments",
                adjacency.node_count(),
                self.segments.len()
            );
            adjacency
        })
    }

    /// Rows sharing an endpoint with `row`, in row order, excluding `row`.
    #[must_use]
    pub fn neighbors(&self, row: usize) -> Vec<usize> {
        let Some((a, b)) = self.segments.get(row).and_then(StreetSegment::endpoints) else {
            return Vec::new();
        };
        let adjacency = self.adjacency();
        let mut out: Vec<usize> = adjacency
            .at(a)
            .iter()
            .chain(adjacency.at(b))
            .copied()
            .filter(|&n| n != row)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Fewest-segment path from `start` to `goal`, inclusive. When
    /// `allowed` is given the walk never leaves it.
    #[must_use]
    pub fn path(&self, start: usize, goal: usize, allowed: Option<&HashSet<usize>>) -> Option<Vec<usize>> {
        let permitted = |row: usize| allowed.is_none_or(|set| set.contains(&row));
        if start >= self.segments.len() || !permitted(start) || !permitted(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let mut parent: HashMap<usize, usize> = HashMap::new();
        let mut seen: HashSet<usize> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(current) {
                if !permitted(next) || !seen.insert(next) {
                    continue;
                }
                parent.insert(next, current);
                if next == goal {
                    let mut path = vec![goal];
                    let mut at = goal;
                    while let Some(&prev) = parent.get(&at) {
                        path.push(prev);
                        at = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Shortest of the [`path`](Self::path)s between every `(start, goal)`
    /// candidate pair. Pairs are tried in order and a later path replaces
    /// the current one only when strictly shorter.
    #[must_use]
    pub fn shortest_path(
        &self,
        starts: &[usize],
        goals: &[usize],
        allowed: Option<&HashSet<usize>>,
    ) -> Option<Vec<usize>> {
        let mut best: Option<Vec<usize>> = None;
        for &start in starts {
            for &goal in goals {
                let Some(path) = self.path(start, goal, allowed) else {
                    continue;
                };
                if best.as_ref().is_none_or(|current| path.len() < current.len()) {
                    best = Some(path);
                }
            }
        }
        best
    }
}

/// Builds a single-part centerline from `(x, y)` vertices.
#[must_use]
pub fn centerline(vertices: &[(f64, f64)]) -> MultiLineString<f64> {
    MultiLineString::new(vec![LineString::from(vertices.to_vec())])
}

#[cfg(test)]
mod tests {
    use geo::Area;

    use super::*;
    use crate::fixtures::{self, main_street};

    #[test]
    fn loads_every_fixture_segment() {
        let index = fixtures::street_index();
        assert_eq!(index.len(), 11);
        assert_eq!(index.row_of(&SegmentId::from("0000009")), Some(8));
        assert_eq!(index.segment(0).and_then(|s| s.width_ft), Some(30.0));
    }

    #[test]
    fn buffer_distance_follows_policy() {
        let index = fixtures::street_index();
        // Main Street: 30 ft wide -> 40 ft corridor.
        assert!((index.buffer_distance(0, None) - 40.0).abs() < f64::EPSILON);
        // Broadway: no width -> 30 ft default.
        assert!((index.buffer_distance(7, None) - 30.0).abs() < f64::EPSILON);
        assert!((index.buffer_distance(7, Some(15.0)) - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn corridor_area_matches_width_buffer() {
        let index = fixtures::street_index();
        // 200 ft long, 40 ft each side, flat ends.
        assert!((index.corridor(0, None).unsigned_area() - 16_000.0).abs() < 1.0);
    }

    #[test]
    fn name_match_is_case_insensitive_substring() {
        let index = fixtures::street_index();
        assert_eq!(index.matching_name("broad"), vec![7, 8]);
        assert_eq!(index.matching_name("main"), (0..7).collect::<Vec<_>>());
        assert!(index.matching_name("  ").is_empty());
        assert!(index.matching_name("NOWHERE").is_empty());
    }

    #[test]
    fn corridors_touching_parcel() {
        let index = fixtures::street_index();
        let lot = fixtures::rect(210.0, 20.0, 390.0, 120.0);
        assert_eq!(index.corridors_touching(&lot, None), vec![1, 8]);
        // Raw centerlines sit 20 ft away from the lot.
        assert!(index.lines_touching(&lot).is_empty());
    }

    #[test]
    fn nearest_segments_rank_by_distance() {
        let index = fixtures::street_index();
        let from = fixtures::point(100.0, 70.0);
        assert_eq!(index.nearest(from, 3, None), vec![0, 1, 8]);
        let main = index.matching_name("main");
        assert_eq!(index.nearest(from, 3, Some(&main)), vec![0, 1, 2]);
    }

    #[test]
    fn neighbors_share_quantized_endpoints() {
        let index = fixtures::street_index();
        // Main segment 2 ends where Broadway starts.
        assert_eq!(index.neighbors(1), vec![0, 2, 7, 8]);
        assert!(index.neighbors(9).is_empty());
    }

    #[test]
    fn endpoints_snap_to_tenths_of_a_foot() {
        let a = StreetSegment::new(
            SegmentId::from("a"),
            None,
            None,
            centerline(&[(0.0, 0.0), (100.02, 0.0)]),
        );
        let b = StreetSegment::new(
            SegmentId::from("b"),
            None,
            None,
            centerline(&[(99.98, 0.01), (200.0, 0.0)]),
        );
        assert_eq!(a.endpoints().map(|e| e.1), b.endpoints().map(|e| e.0));
    }

    #[test]
    fn path_walks_along_main_street() {
        let index = fixtures::street_index();
        assert_eq!(index.path(0, 6, None), Some(main_street()));
        assert_eq!(index.path(3, 3, None), Some(vec![3]));
    }

    #[test]
    fn path_respects_allowed_set() {
        let index = fixtures::street_index();
        let broadway_only: HashSet<usize> = index.matching_name("broadway").into_iter().collect();
        assert_eq!(index.path(7, 8, Some(&broadway_only)), Some(vec![7, 8]));
        assert_eq!(index.path(0, 8, Some(&broadway_only)), None);
    }

    #[test]
    fn shortest_path_over_all_candidate_pairs() {
        let index = fixtures::street_index();
        assert_eq!(
            index.shortest_path(&[0, 1, 8], &[6, 5, 4], None),
            Some(vec![1, 2, 3, 4])
        );
    }

    #[test]
    fn shortest_path_ties_keep_the_first_pair() {
        let index = fixtures::street_index();
        assert_eq!(index.shortest_path(&[8, 1], &[4], None), Some(vec![8, 2, 3, 4]));
        assert_eq!(index.shortest_path(&[1, 8], &[4], None), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn shortest_path_without_connection() {
        let index = fixtures::street_index();
        assert_eq!(index.shortest_path(&[0, 1], &[9, 10], None), None);
        assert_eq!(index.shortest_path(&[], &[4], None), None);
    }

    #[test]
    fn disconnected_segments_have_no_path() {
        let index = fixtures::street_index();
        assert_eq!(index.path(0, 9, None), None);
        assert_eq!(index.path(9, 10, None), None);
    }
}
