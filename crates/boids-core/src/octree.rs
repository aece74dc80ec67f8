use crate::spatial::{in_region, SpatialIndex};
use glam::Vec3;

/// Points a leaf may hold before it is split into octants.
pub const LEAF_CAPACITY: usize = 8;
/// Depth at which splitting stops, so coincident points cannot recurse forever.
pub const MAX_DEPTH: u32 = 16;

/// Axis-aligned box used for node extents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest padded cube containing every finite point, or `None` if there are none.
    pub fn cube_around(points: &[Vec3]) -> Option<Self> {
        let mut finite = points.iter().filter(|p| p.is_finite());
        let first = *finite.next()?;
        let (min, max) = finite.fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        // Halve before combining so extents near f32::MAX stay finite.
        let center = min * 0.5 + max * 0.5;
        let half = (max * 0.5 - min * 0.5).max_element();
        // Pad so rounding in center +/- half can never exclude an extreme point.
        let half = Vec3::splat((half * (1.0 + 1e-4) + 1e-3).min(f32::MAX));
        let limit = Vec3::splat(f32::MAX);
        Some(Self::new(
            (center - half).max(-limit),
            (center + half).min(limit),
        ))
    }

    pub fn center(&self) -> Vec3 {
        self.min * 0.5 + self.max * 0.5
    }

    pub fn contains(&self, point: Vec3) -> bool {
        in_region(point, self.min, self.max)
    }

    /// Inclusive overlap test against the box `[min, max]`.
    pub fn intersects(&self, min: Vec3, max: Vec3) -> bool {
        self.min.x <= max.x
            && self.max.x >= min.x
            && self.min.y <= max.y
            && self.max.y >= min.y
            && self.min.z <= max.z
            && self.max.z >= min.z
    }

    /// Octant index (0-7) for a point; bit 0 = +x, bit 1 = +y, bit 2 = +z.
    pub fn octant_index(&self, point: Vec3) -> usize {
        let center = self.center();
        let mut index = 0;
        if point.x >= center.x {
            index |= 1;
        }
        if point.y >= center.y {
            index |= 2;
        }
        if point.z >= center.z {
            index |= 4;
        }
        index
    }

    pub fn child_bounds(&self, octant: usize) -> Self {
        let center = self.center();
        let min = Vec3::new(
            if octant & 1 == 0 { self.min.x } else { center.x },
            if octant & 2 == 0 { self.min.y } else { center.y },
            if octant & 4 == 0 { self.min.z } else { center.z },
        );
        let max = Vec3::new(
            if octant & 1 == 0 { center.x } else { self.max.x },
            if octant & 2 == 0 { center.y } else { self.max.y },
            if octant & 4 == 0 { center.z } else { self.max.z },
        );
        Self { min, max }
    }
}

#[derive(Clone, Debug)]
struct Node {
    bounds: Bounds,
    /// Index of the first of eight contiguous children; `None` for leaves.
    first_child: Option<usize>,
    /// Point indices, populated on leaves only.
    items: Vec<usize>,
}

impl Node {
    fn leaf(bounds: Bounds) -> Self {
        Self {
            bounds,
            first_child: None,
            items: Vec::new(),
        }
    }
}

/// Point octree with arena-allocated nodes.
///
/// Built top-down from a snapshot; there is no incremental insert or removal
/// because the world rebuilds the tree from scratch every tick.
#[derive(Clone, Debug, Default)]
pub struct Octree {
    points: Vec<Vec3>,
    nodes: Vec<Node>,
}

impl Octree {
    pub fn build(points: &[Vec3]) -> Self {
        let mut tree = Self::default();
        tree.rebuild(points);
        tree
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.nodes.first().map(|n| n.bounds)
    }

    /// Deepest level reached (root is depth 0); 0 for an empty tree.
    pub fn depth(&self) -> u32 {
        let mut deepest = 0;
        let mut stack = Vec::new();
        if !self.nodes.is_empty() {
            stack.push((0usize, 0u32));
        }
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some(first) = self.nodes[id].first_child {
                stack.extend((first..first + 8).map(|c| (c, depth + 1)));
            }
        }
        deepest
    }

    fn fill(&mut self, node_id: usize, items: Vec<usize>, depth: u32) {
        if items.len() <= LEAF_CAPACITY || depth >= MAX_DEPTH {
            self.nodes[node_id].items = items;
            return;
        }
        let bounds = self.nodes[node_id].bounds;
        let mut buckets: [Vec<usize>; 8] = Default::default();
        for idx in items {
            buckets[bounds.octant_index(self.points[idx])].push(idx);
        }
        let first = self.nodes.len();
        self.nodes
            .extend((0..8).map(|octant| Node::leaf(bounds.child_bounds(octant))));
        self.nodes[node_id].first_child = Some(first);
        for (octant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                self.fill(first + octant, bucket, depth + 1);
            }
        }
    }
}

impl SpatialIndex for Octree {
    fn rebuild(&mut self, points: &[Vec3]) {
        self.points.clear();
        self.points.extend_from_slice(points);
        self.nodes.clear();
        let Some(root) = Bounds::cube_around(points) else {
            return;
        };
        self.nodes.push(Node::leaf(root));
        let items: Vec<usize> = (0..points.len())
            .filter(|&i| points[i].is_finite())
            .collect();
        self.fill(0, items, 0);
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn visit_region(&self, center: Vec3, half_extents: Vec3, visitor: &mut dyn FnMut(usize)) {
        let min = center - half_extents;
        let max = center + half_extents;
        if self.nodes.is_empty() || min.is_nan() || max.is_nan() || min.cmpgt(max).any() {
            return;
        }
        let mut stack = vec![0usize];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.bounds.intersects(min, max) {
                continue;
            }
            match node.first_child {
                Some(first) => stack.extend(first..first + 8),
                None => {
                    for &idx in &node.items {
                        if in_region(self.points[idx], min, max) {
                            visitor(idx);
                        }
                    }
                }
            }
        }
    }
}
