//! Octree spatial index.
//!
//! An axis-aligned, cubical octree over triangle bounds. Cells store their own
//! bound: fatter data, but simpler code. Building and tracing both compute
//! positions absolutely from the ray rather than incrementally, so the walk
//! stays numerically solid.
//!
//! Tolerances appear in two places: triangle bounds are inflated (see
//! [`Triangle::bound`]) and leaf hits are accepted slightly outside the cell.
//! Depth is additionally limited by an absolute cell size, which is the simple
//! way to cope with many items overlapping one spot.

use crate::triangle::{Triangle, TOLERANCE};
use lumen_math::{Bound, Ray, Vec3};

/// Maximum items per leaf node before splitting.
const MAX_ITEMS: usize = 8;

/// Maximum tree depth.
const MAX_LEVELS: usize = 44;

/// Result of a ray query: which triangle was hit, and where.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index into the triangle slice the index was built over
    pub triangle: usize,
    /// World-space hit position
    pub position: Vec3,
}

/// Octree node - either a branch with eight optional children or a leaf
/// with triangle indices.
#[derive(Debug)]
pub enum OctreeNode {
    /// Internal node; child `i` covers octant `i` of `bound`.
    Branch {
        children: Box<[Option<OctreeNode>; 8]>,
        bound: Bound,
    },
    /// Leaf node with a small number of triangles.
    Leaf { items: Vec<usize>, bound: Bound },
}

/// Octree over a triangle slice.
///
/// The tree stores indices only; queries take the same slice the tree was
/// built from.
#[derive(Debug)]
pub struct Octree {
    root: OctreeNode,
}

impl Octree {
    /// Build the index over `triangles`.
    ///
    /// The bound always contains `eye`, so no camera ray starts outside the tree.
    pub fn new(eye: Vec3, triangles: &[Triangle]) -> Self {
        let bound = triangles
            .iter()
            .fold(Bound::from_point(eye), |acc, t| Bound::surrounding(&acc, t.bound()))
            .cubified();

        let items: Vec<usize> = (0..triangles.len()).collect();
        let root = OctreeNode::build(bound, items, 0, triangles);

        log::debug!(
            "Octree built: {} triangles, {} nodes, depth {}",
            triangles.len(),
            root.node_count(),
            root.depth()
        );

        Self { root }
    }

    /// Nearest intersection along `ray`, ignoring triangle `last_hit`.
    pub fn intersect(&self, triangles: &[Triangle], ray: &Ray, last_hit: Option<usize>) -> Option<Hit> {
        self.root.intersect(triangles, ray, last_hit, None)
    }

    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    pub fn bound(&self) -> &Bound {
        self.root.bound()
    }
}

impl OctreeNode {
    /// Recursive construction.
    ///
    /// A node branches when it holds too many items and is not too deep.
    /// Items straddling a center plane go to every octant they overlap. When
    /// more than one octant receives the whole item set, or the octant is
    /// smaller than a few tolerances, further splitting would not separate
    /// anything, so that child is built at maximum depth (a leaf).
    fn build(bound: Bound, items: Vec<usize>, level: usize, triangles: &[Triangle]) -> Self {
        let is_branch = items.len() > MAX_ITEMS && level < MAX_LEVELS - 1;
        if !is_branch {
            return OctreeNode::Leaf { items, bound };
        }

        let mut children: Box<[Option<OctreeNode>; 8]> = Box::default();
        let mut full_copies = 0;

        for s in (0..8).rev() {
            let sub_bound = bound.octant(s);
            let sub_items: Vec<usize> = items
                .iter()
                .copied()
                .filter(|&i| triangles[i].bound().overlaps_cell(&sub_bound))
                .collect();

            if sub_items.len() == items.len() {
                full_copies += 1;
            }
            let too_small = sub_bound.max.x - sub_bound.min.x < TOLERANCE * 4.0;
            let next_level = if full_copies > 1 || too_small {
                MAX_LEVELS
            } else {
                level + 1
            };

            if !sub_items.is_empty() {
                children[s] = Some(Self::build(sub_bound, sub_items, next_level, triangles));
            }
        }

        OctreeNode::Branch { children, bound }
    }

    /// Intersection query.
    ///
    /// `entry` is where the ray enters this cell; `None` means the ray origin
    /// (only valid at the root, whose bound contains the eye).
    fn intersect(
        &self,
        triangles: &[Triangle],
        ray: &Ray,
        last_hit: Option<usize>,
        entry: Option<Vec3>,
    ) -> Option<Hit> {
        match self {
            OctreeNode::Branch { children, bound } => {
                Self::intersect_branch(children, bound, triangles, ray, last_hit, entry)
            }
            OctreeNode::Leaf { items, bound } => {
                Self::intersect_leaf(items, bound, triangles, ray, last_hit)
            }
        }
    }

    /// Step through the sub-cells the ray passes, in ray order.
    fn intersect_branch(
        children: &[Option<OctreeNode>; 8],
        bound: &Bound,
        triangles: &[Triangle],
        ray: &Ray,
        last_hit: Option<usize>,
        entry: Option<Vec3>,
    ) -> Option<Hit> {
        let origin = ray.origin();
        let direction = ray.direction();
        let center = bound.centroid();

        let mut cell_position = entry.unwrap_or(origin);
        let mut sub_cell = bound.octant_of(cell_position);

        loop {
            if let Some(child) = &children[sub_cell] {
                let hit = child.intersect(triangles, ray, last_hit, Some(cell_position));
                if hit.is_some() {
                    return hit;
                }
            }

            // Find which face of the corner ahead is crossed first
            let mut step = [0.0f32; 3];
            for (axis, s) in step.iter_mut().enumerate() {
                let high = (sub_cell >> axis) & 1 == 1;
                let face = if (direction[axis] < 0.0) ^ high {
                    if high {
                        bound.max[axis]
                    } else {
                        bound.min[axis]
                    }
                } else {
                    center[axis]
                };
                *s = if direction[axis] == 0.0 {
                    f32::INFINITY
                } else {
                    (face - origin[axis]) / direction[axis]
                };
            }

            let mut axis = 2;
            for i in (0..2).rev() {
                if step[i] < step[axis] {
                    axis = i;
                }
            }

            // Leaving this node
            if ((sub_cell >> axis) & 1 == 1) ^ (direction[axis] < 0.0) {
                return None;
            }

            cell_position = ray.at(step[axis]);
            sub_cell ^= 1 << axis;
        }
    }

    /// Nearest hit among the leaf's items that lies within the cell.
    fn intersect_leaf(
        items: &[usize],
        bound: &Bound,
        triangles: &[Triangle],
        ray: &Ray,
        last_hit: Option<usize>,
    ) -> Option<Hit> {
        let mut nearest = f32::MAX;
        let mut result = None;

        // Skip the surface the ray just left
        for &i in items.iter().filter(|&&i| Some(i) != last_hit) {
            if let Some(distance) = triangles[i].intersect(ray) {
                if distance < nearest {
                    let position = ray.at(distance);
                    if bound.contains_within(position, TOLERANCE) {
                        nearest = distance;
                        result = Some(Hit {
                            triangle: i,
                            position,
                        });
                    }
                }
            }
        }

        result
    }

    pub fn bound(&self) -> &Bound {
        match self {
            OctreeNode::Branch { bound, .. } => bound,
            OctreeNode::Leaf { bound, .. } => bound,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, OctreeNode::Branch { .. })
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        match self {
            OctreeNode::Branch { children, .. } => {
                1 + children.iter().flatten().map(|c| c.node_count()).sum::<usize>()
            }
            OctreeNode::Leaf { .. } => 1,
        }
    }

    /// Depth of this subtree (a lone leaf has depth 1).
    pub fn depth(&self) -> usize {
        match self {
            OctreeNode::Branch { children, .. } => {
                1 + children.iter().flatten().map(|c| c.depth()).max().unwrap_or(0)
            }
            OctreeNode::Leaf { .. } => 1,
        }
    }
}
