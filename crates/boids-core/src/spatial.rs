use crate::octree::Octree;
use glam::Vec3;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// Axis-aligned region queries over a point snapshot.
///
/// An index is rebuilt wholesale from the current positions once per tick and
/// is read-only afterwards. Results are indices into the slice passed to
/// `rebuild`. Queries are exact: a point is returned iff it lies inside
/// `[center - half_extents, center + half_extents]` componentwise (inclusive).
pub trait SpatialIndex {
    /// Replace the indexed point set.
    fn rebuild(&mut self, points: &[Vec3]);

    /// Number of indexed points (including any that can never match, e.g. NaN).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every matching index in unspecified order.
    fn visit_region(&self, center: Vec3, half_extents: Vec3, visitor: &mut dyn FnMut(usize));

    /// Collect matching indices, sorted ascending.
    fn query_region(&self, center: Vec3, half_extents: Vec3) -> Vec<usize> {
        let mut out = Vec::new();
        self.query_region_into(center, half_extents, &mut out);
        out
    }

    /// Like [`SpatialIndex::query_region`] but reuses `out` (cleared first).
    fn query_region_into(&self, center: Vec3, half_extents: Vec3, out: &mut Vec<usize>) {
        out.clear();
        self.visit_region(center, half_extents, &mut |idx| out.push(idx));
        out.sort_unstable();
    }
}

/// Inclusive point-in-box test shared by every backend.
#[inline]
pub fn in_region(point: Vec3, min: Vec3, max: Vec3) -> bool {
    point.x >= min.x
        && point.x <= max.x
        && point.y >= min.y
        && point.y <= max.y
        && point.z >= min.z
        && point.z <= max.z
}

/// Which tree the world uses for agent and food lookups.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    #[default]
    Octree,
    RTree,
}

/// Lightweight index-tagged point for the R*-tree backend.
#[derive(Clone, Debug)]
pub struct IndexedPoint {
    pub index: usize,
    pub position: [f32; 3],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f32; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// R*-tree backed index built via `bulk_load` (O(n log n)).
pub struct RTreeIndex {
    tree: RTree<IndexedPoint>,
    len: usize,
}

impl Default for RTreeIndex {
    fn default() -> Self {
        Self {
            tree: RTree::new(),
            len: 0,
        }
    }
}

impl RTreeIndex {
    pub fn build(points: &[Vec3]) -> Self {
        let mut index = Self::default();
        index.rebuild(points);
        index
    }
}

impl SpatialIndex for RTreeIndex {
    fn rebuild(&mut self, points: &[Vec3]) {
        // Non-finite points would poison envelope math; they can never match anyway.
        let locations: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .map(|(index, p)| IndexedPoint {
                index,
                position: p.to_array(),
            })
            .collect();
        self.tree = RTree::bulk_load(locations);
        self.len = points.len();
    }

    fn len(&self) -> usize {
        self.len
    }

    fn visit_region(&self, center: Vec3, half_extents: Vec3, visitor: &mut dyn FnMut(usize)) {
        let min = center - half_extents;
        let max = center + half_extents;
        if min.is_nan() || max.is_nan() || min.cmpgt(max).any() {
            return;
        }
        let envelope = AABB::from_corners(min.to_array(), max.to_array());
        for loc in self.tree.locate_in_envelope(&envelope) {
            visitor(loc.index);
        }
    }
}

/// Backend-dispatching index owned by the world.
pub enum AnyIndex {
    Octree(Octree),
    RTree(RTreeIndex),
}

impl AnyIndex {
    pub fn new(backend: IndexBackend) -> Self {
        match backend {
            IndexBackend::Octree => AnyIndex::Octree(Octree::default()),
            IndexBackend::RTree => AnyIndex::RTree(RTreeIndex::default()),
        }
    }

    pub fn backend(&self) -> IndexBackend {
        match self {
            AnyIndex::Octree(_) => IndexBackend::Octree,
            AnyIndex::RTree(_) => IndexBackend::RTree,
        }
    }
}

impl SpatialIndex for AnyIndex {
    fn rebuild(&mut self, points: &[Vec3]) {
        match self {
            AnyIndex::Octree(tree) => tree.rebuild(points),
            AnyIndex::RTree(tree) => tree.rebuild(points),
        }
    }

    fn len(&self) -> usize {
        match self {
            AnyIndex::Octree(tree) => tree.len(),
            AnyIndex::RTree(tree) => tree.len(),
        }
    }

    fn visit_region(&self, center: Vec3, half_extents: Vec3, visitor: &mut dyn FnMut(usize)) {
        match self {
            AnyIndex::Octree(tree) => tree.visit_region(center, half_extents, visitor),
            AnyIndex::RTree(tree) => tree.visit_region(center, half_extents, visitor),
        }
    }
}

/// Reference scan used by tests and tiny point sets.
pub fn brute_force_region(points: &[Vec3], center: Vec3, half_extents: Vec3) -> Vec<usize> {
    let min = center - half_extents;
    let max = center + half_extents;
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| in_region(**p, min, max))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn backends(points: &[Vec3]) -> [AnyIndex; 2] {
        let mut octree = AnyIndex::new(IndexBackend::Octree);
        let mut rtree = AnyIndex::new(IndexBackend::RTree);
        octree.rebuild(points);
        rtree.rebuild(points);
        [octree, rtree]
    }

    #[test]
    fn query_finds_points_inside_box() {
        let points = vec![
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(6.0, 5.0, 5.0),
            Vec3::new(50.0, 50.0, 50.0),
        ];
        for index in backends(&points) {
            let result = index.query_region(Vec3::splat(5.0), Vec3::splat(2.0));
            assert_eq!(result, vec![0, 1], "backend {:?}", index.backend());
        }
    }

    #[test]
    fn query_box_is_inclusive_on_faces() {
        let points = vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 1.0, -1.0)];
        for index in backends(&points) {
            let result = index.query_region(Vec3::ZERO, Vec3::ONE);
            assert_eq!(result, vec![0, 1], "backend {:?}", index.backend());
        }
    }

    #[test]
    fn query_on_empty_index_returns_empty() {
        for index in backends(&[]) {
            assert!(index.is_empty());
            assert!(index.query_region(Vec3::ZERO, Vec3::splat(100.0)).is_empty());
        }
    }

    #[test]
    fn rebuild_discards_previous_points() {
        let mut index = AnyIndex::new(IndexBackend::RTree);
        index.rebuild(&[Vec3::ZERO, Vec3::ONE]);
        index.rebuild(&[Vec3::splat(10.0)]);
        assert_eq!(index.len(), 1);
        assert!(index.query_region(Vec3::ZERO, Vec3::splat(2.0)).is_empty());
        assert_eq!(index.query_region(Vec3::splat(10.0), Vec3::ZERO), vec![0]);
    }

    #[test]
    fn nan_points_are_never_returned() {
        let points = vec![Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ZERO];
        for index in backends(&points) {
            assert_eq!(index.len(), 2);
            assert_eq!(
                index.query_region(Vec3::ZERO, Vec3::splat(1e6)),
                vec![1],
                "backend {:?}",
                index.backend()
            );
        }
    }

    #[test]
    fn negative_extents_match_nothing() {
        let points = vec![Vec3::ZERO];
        for index in backends(&points) {
            assert!(index
                .query_region(Vec3::ZERO, Vec3::new(1.0, -1.0, 1.0))
                .is_empty());
        }
    }

    fn point_strategy() -> impl Strategy<Value = Vec3> {
        proptest::array::uniform3(-60.0f32..60.0).prop_map(Vec3::from_array)
    }

    proptest! {
        #[test]
        fn proptest_query_matches_brute_force(
            points in proptest::collection::vec(point_strategy(), 0..300),
            center in point_strategy(),
            half in proptest::array::uniform3(0.0f32..40.0),
        ) {
            let half = Vec3::from_array(half);
            let expected = brute_force_region(&points, center, half);
            for index in backends(&points) {
                prop_assert_eq!(index.query_region(center, half), expected.clone());
            }
        }

        #[test]
        fn proptest_clustered_points_match_brute_force(
            offsets in proptest::collection::vec(proptest::array::uniform3(-0.01f32..0.01), 1..200),
            duplicates in 0usize..40,
        ) {
            // Tight clusters and exact duplicates stress subdivision depth limits.
            let mut points: Vec<Vec3> = offsets
                .into_iter()
                .map(|o| Vec3::splat(3.0) + Vec3::from_array(o))
                .collect();
            points.extend(std::iter::repeat_n(Vec3::splat(3.0), duplicates));
            let half = Vec3::splat(0.005);
            let expected = brute_force_region(&points, Vec3::splat(3.0), half);
            for index in backends(&points) {
                prop_assert_eq!(index.query_region(Vec3::splat(3.0), half), expected.clone());
            }
        }
    }
}
