//! Surface shading at a ray hit.

use std::f32::consts::PI;

use crate::{gen_f32, Color, Triangle};
use lumen_math::Vec3;
use rand::RngCore;

/// Smallest squared distance used for solid angle conversion.
const MIN_DISTANCE_SQUARED: f32 = 1e-6;

/// A sampled continuation of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounce {
    /// Unit direction leaving the surface
    pub direction: Vec3,
    /// Weight applied to the radiance arriving along `direction`
    pub color: Color,
}

/// A point on a triangle together with the triangle's material.
#[derive(Clone, Copy)]
pub struct SurfacePoint<'a> {
    triangle: &'a Triangle,
    position: Vec3,
}

impl<'a> SurfacePoint<'a> {
    pub fn new(triangle: &'a Triangle, position: Vec3) -> Self {
        Self { triangle, position }
    }

    /// Light emitted from this point toward `to_position`.
    ///
    /// Only the front face emits. With `is_solid_angle` the result is scaled
    /// by the projected area over distance squared, which turns it into the
    /// contribution of the whole triangle as seen from `to_position`.
    pub fn emission(&self, to_position: Vec3, out_direction: Vec3, is_solid_angle: bool) -> Color {
        let cos_area = out_direction.dot(self.triangle.normal()) * self.triangle.area();
        if cos_area <= 0.0 {
            return Color::ZERO;
        }

        let solid_angle = if is_solid_angle {
            let distance2 = (to_position - self.position).length_squared();
            cos_area / distance2.max(MIN_DISTANCE_SQUARED)
        } else {
            1.0
        };

        self.triangle.emissivity() * solid_angle
    }

    /// Lambertian reflection of `in_radiance` arriving from `in_direction`.
    ///
    /// Transmission is not modelled: directions on opposite sides reflect
    /// nothing.
    pub fn reflection(&self, in_direction: Vec3, in_radiance: Color, out_direction: Vec3) -> Color {
        let normal = self.triangle.normal();
        let in_dot = in_direction.dot(normal);
        let out_dot = out_direction.dot(normal);

        if (in_dot < 0.0) ^ (out_dot < 0.0) {
            return Color::ZERO;
        }

        in_radiance * self.triangle.reflectivity() * (in_dot.abs() / PI)
    }

    /// Russian roulette, then a cosine-weighted direction about the normal.
    ///
    /// `in_direction` points back toward where the path came from; the
    /// sampled hemisphere is on that side of the surface. `None` ends the
    /// path.
    pub fn next_direction(&self, in_direction: Vec3, rng: &mut dyn RngCore) -> Option<Bounce> {
        let reflectivity = self.triangle.reflectivity();
        let reflectivity_mean = reflectivity.element_sum() / 3.0;

        if gen_f32(rng) >= reflectivity_mean {
            return None;
        }

        let color = reflectivity / reflectivity_mean;

        // Cosine-weighted hemisphere sample
        let phi = 2.0 * PI * gen_f32(rng);
        let sr2 = gen_f32(rng).sqrt();
        let x = phi.cos() * sr2;
        let y = phi.sin() * sr2;
        let z = (1.0 - sr2 * sr2).sqrt();

        let tangent = self.triangle.tangent();
        let mut normal = self.triangle.normal();
        if normal.dot(in_direction) < 0.0 {
            normal = -normal;
        }

        let direction = tangent * x + normal.cross(tangent) * y + normal * z;
        Some(Bounce { direction, color })
    }

    pub fn triangle(&self) -> &'a Triangle {
        self.triangle
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }
}
