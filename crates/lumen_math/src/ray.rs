use crate::Vec3;

/// A ray in 3D space with an origin and a direction.
///
/// Rays are used for path tracing - they represent a half-line starting at
/// `origin` and traveling in `direction`. The direction is usually unit length
/// but nothing here depends on it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The same line travelled the other way.
    #[inline]
    pub fn reversed_direction(&self) -> Vec3 {
        -self.direction
    }
}
