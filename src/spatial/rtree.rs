//! R-tree based circle index using the rstar crate.
//!
//! Provides O(log n) spatial queries for:
//! - Pointer hit testing
//! - Circle intersection (drop targets)

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::geometry::Circle;
use crate::layout::NodeKey;

/// A circle in the spatial index with its node key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleEntry {
    pub key: NodeKey,
    pub circle: Circle,
    /// Position in the sequence the index was built from.
    pub rank: usize,
}

impl RTreeObject for CircleEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        bounding_box(&self.circle)
    }
}

fn bounding_box(circle: &Circle) -> AABB<[f64; 2]> {
    let Circle { x, y, radius } = *circle;
    AABB::from_corners([x - radius, y - radius], [x + radius, y + radius])
}

impl PointDistance for CircleEntry {
    /// Squared distance from the rim; zero inside the circle.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let outside = (self.circle.x - point[0]).hypot(self.circle.y - point[1]) - self.circle.radius;
        if outside <= 0.0 { 0.0 } else { outside * outside }
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.circle.contains(point[0], point[1])
    }
}

/// Spatial index over rendered circles.
pub struct CircleIndex {
    tree: RTree<CircleEntry>,
}

impl CircleIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Rebuild the index from `(key, circle)` pairs, remembering their order.
    pub fn rebuild(&mut self, circles: impl IntoIterator<Item = (NodeKey, Circle)>) {
        let entries: Vec<_> = circles
            .into_iter()
            .enumerate()
            .map(|(rank, (key, circle))| CircleEntry { key, circle, rank })
            .collect();

        self.tree = RTree::bulk_load(entries);
    }

    /// The circle under a point.
    ///
    /// When several circles contain the point, the one with the nearest
    /// center wins.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<NodeKey> {
        self.tree
            .locate_all_at_point(&[x, y])
            .min_by(|a, b| {
                let da = (a.circle.x - x).hypot(a.circle.y - y);
                let db = (b.circle.x - x).hypot(b.circle.y - y);
                da.total_cmp(&db).then(a.rank.cmp(&b.rank))
            })
            .map(|entry| entry.key)
    }

    /// Nearest circle whose rim is within `max_distance` of a point.
    pub fn nearest_within(&self, x: f64, y: f64, max_distance: f64) -> Option<NodeKey> {
        self.tree
            .nearest_neighbor(&[x, y])
            .filter(|entry| entry.distance_2(&[x, y]) <= max_distance * max_distance)
            .map(|entry| entry.key)
    }

    /// All circles penetrated by `circle`, in build order.
    pub fn overlapping(&self, circle: &Circle) -> Vec<NodeKey> {
        let mut hits: Vec<&CircleEntry> = self
            .tree
            .locate_in_envelope_intersecting(&bounding_box(circle))
            .filter(|entry| entry.circle.gap(circle) < 0.0)
            .collect();
        hits.sort_by_key(|entry| entry.rank);
        hits.into_iter().map(|entry| entry.key).collect()
    }

    /// Clear all circles from the index.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Get the number of circles in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for CircleIndex {
    fn default() -> Self {
        Self::new()
    }
}
