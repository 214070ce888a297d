//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::gen_f32;
use lumen_core::TriangleDescription;
use lumen_math::{Bound, Ray, Vec3};
use rand::RngCore;

/// Geometric tolerance: one millimetre when one unit is one metre.
pub const TOLERANCE: f32 = 1.0 / 1024.0;

/// Determinants below this magnitude mean the ray runs along the plane.
const EPSILON: f32 = 1e-6;

/// A triangle primitive with a diffuse material.
#[derive(Debug, Clone)]
pub struct Triangle {
    /// Vertices
    vertices: [Vec3; 3],
    /// v1 - v0
    edge1: Vec3,
    /// v2 - v0
    edge2: Vec3,
    /// Pre-computed face normal (unit length, zero if degenerate)
    normal: Vec3,
    /// Unit vector along edge1
    tangent: Vec3,
    area: f32,
    /// Diffuse reflectivity, clamped to [0, 1]
    reflectivity: Vec3,
    /// Emitted radiance, clamped to be non-negative
    emissivity: Vec3,
    /// Bounding box, inflated by the tolerance
    bound: Bound,
}

impl Triangle {
    /// Create a new triangle from three vertices and its material.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, reflectivity: Vec3, emissivity: Vec3) -> Self {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let edge3 = v2 - v1;

        let tangent = edge1.normalize_or_zero();
        let normal = tangent.cross(edge3).normalize_or_zero();
        let area = 0.5 * edge1.cross(edge3).length();

        Self {
            vertices: [v0, v1, v2],
            edge1,
            edge2,
            normal,
            tangent,
            area,
            reflectivity: reflectivity.clamp(Vec3::ZERO, Vec3::ONE),
            emissivity: emissivity.clamp(Vec3::ZERO, Vec3::splat(f32::MAX)),
            bound: Self::tolerant_bound(&[v0, v1, v2]),
        }
    }

    /// Create a triangle from a parsed model record.
    pub fn from_description(desc: &TriangleDescription) -> Self {
        let [v0, v1, v2] = desc.vertices;
        Self::new(v0, v1, v2, desc.reflectivity, desc.emissivity)
    }

    /// Vertex bound padded outwards by `TOLERANCE * (|coord| + 1)`.
    ///
    /// The padding grows with magnitude so that float error in far away
    /// geometry never pushes an intersection outside its own bound.
    fn tolerant_bound(vertices: &[Vec3; 3]) -> Bound {
        vertices.iter().fold(Bound::EMPTY, |bound, &v| {
            let pad = (v.abs() + Vec3::ONE) * TOLERANCE;
            Bound::new(bound.min.min(v - pad), bound.max.max(v + pad))
        })
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Returns the distance along the ray (in units of the direction length),
    /// or `None` for misses, rays parallel to the plane and hits behind the
    /// origin.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let pvec = ray.direction().cross(self.edge2);
        let det = self.edge1.dot(pvec);

        // Ray lies in the plane of the triangle
        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin() - self.vertices[0];

        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(self.edge1);
        let v = ray.direction().dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let distance = self.edge2.dot(qvec) * inv_det;

        // Only allow hits in the forward direction
        (distance >= 0.0).then_some(distance)
    }

    /// Sample a point uniformly over the triangle's area.
    pub fn sample_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        let sqr1 = gen_f32(rng).sqrt();
        let r2 = gen_f32(rng);

        // Barycentrics
        let a = 1.0 - sqr1;
        let b = (1.0 - r2) * sqr1;

        self.edge1 * a + self.edge2 * b + self.vertices[0]
    }

    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.vertices
    }

    pub fn bound(&self) -> &Bound {
        &self.bound
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn tangent(&self) -> Vec3 {
        self.tangent
    }

    pub fn area(&self) -> f32 {
        self.area
    }

    pub fn reflectivity(&self) -> Vec3 {
        self.reflectivity
    }

    pub fn emissivity(&self) -> Vec3 {
        self.emissivity
    }

    /// Whether this triangle can be sampled as a light source.
    pub fn is_emitter(&self) -> bool {
        self.emissivity != Vec3::ZERO && self.area > 0.0
    }
}
