use crate::Vec3;

/// Axis-aligned bounding box used by the octree and by triangles.
///
/// Stored as two corners. Octree cells are always cubical, but nothing here
/// assumes that except [`Bound::cubified`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bound {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bound {
    /// Create a bound from its min and max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// A zero-volume bound located at a single point.
    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Create a bound from two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a bound that surrounds two other bounds.
    pub fn surrounding(box0: &Bound, box1: &Bound) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Size along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Grow the max corner so that every axis has the length of the longest one.
    pub fn cubified(&self) -> Bound {
        let size = self.extent().max_element();
        Bound {
            min: self.min,
            max: self.max.max(self.min + Vec3::splat(size)),
        }
    }

    /// Sub-bound of octant `index`.
    ///
    /// Bit `i` of the index selects the upper half along axis `i`:
    ///
    /// ```text
    ///            110---111
    ///            /|    /|
    ///         010---011 |
    ///    y z   | 100-|-101
    ///    |/    |/    | /
    ///    .-x  000---001
    /// ```
    pub fn octant(&self, index: usize) -> Bound {
        let center = self.centroid();
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..3 {
            if (index >> axis) & 1 == 1 {
                min[axis] = center[axis];
            } else {
                max[axis] = center[axis];
            }
        }
        Bound { min, max }
    }

    /// Index of the octant containing `p`; points on a center plane go high.
    pub fn octant_of(&self, p: Vec3) -> usize {
        let center = self.centroid();
        (0..3).fold(0, |index, axis| {
            if p[axis] >= center[axis] {
                index | (1 << axis)
            } else {
                index
            }
        })
    }

    /// Whether this (item) bound overlaps `cell` on all three axes.
    ///
    /// Touching the min face of the cell counts as overlap, touching the max
    /// face does not.
    pub fn overlaps_cell(&self, cell: &Bound) -> bool {
        (0..3).all(|axis| self.max[axis] >= cell.min[axis] && self.min[axis] < cell.max[axis])
    }

    /// Whether `p` lies inside the bound grown by `tolerance` on every face.
    pub fn contains_within(&self, p: Vec3, tolerance: f32) -> bool {
        (0..3).all(|axis| {
            self.min[axis] - p[axis] <= tolerance && p[axis] - self.max[axis] <= tolerance
        })
    }

    /// An empty bound (contains nothing, identity for `surrounding`).
    pub const EMPTY: Bound = Bound {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };
}
