//! Camera for ray generation.

use crate::{gen_f32, Image, PathTracer};
use lumen_core::CameraDescription;
use lumen_math::{Ray, Vec3};
use rand::RngCore;

/// Field of view limits in degrees.
const MIN_ANGLE: f32 = 10.0;
const MAX_ANGLE: f32 = 160.0;

/// Pinhole camera generating one jittered ray per pixel per frame.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    direction: Vec3,
    right: Vec3,
    up: Vec3,
    /// Full field of view in radians
    angle: f32,
}

impl Camera {
    /// Create a camera.
    ///
    /// A zero `direction` looks along +Z. `angle_degrees` is clamped to
    /// [10, 160].
    pub fn new(position: Vec3, direction: Vec3, angle_degrees: f32) -> Self {
        let mut direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            direction = Vec3::Z;
        }
        let angle = angle_degrees.clamp(MIN_ANGLE, MAX_ANGLE).to_radians();

        let right = Vec3::Y.cross(direction).normalize_or_zero();
        let (right, up) = if right != Vec3::ZERO {
            (right, direction.cross(right).normalize_or_zero())
        } else {
            // Looking straight up or down
            let up = Vec3::new(0.0, 0.0, if direction.y < 0.0 { 1.0 } else { -1.0 });
            (up.cross(direction).normalize_or_zero(), up)
        };

        Self {
            position,
            direction,
            right,
            up,
            angle,
        }
    }

    pub fn from_description(desc: &CameraDescription) -> Self {
        Self::new(desc.position, desc.direction, desc.angle_degrees)
    }

    /// Ray through image coordinates `(x, y)` with sub-pixel offsets in [0, 1).
    ///
    /// `y` grows upward; row 0 is the bottom of the image.
    pub fn ray(&self, x: f32, y: f32, width: u32, height: u32) -> Ray {
        let xf = x * 2.0 / width as f32 - 1.0;
        let yf = y * 2.0 / height as f32 - 1.0;

        let offset = self.right * xf + self.up * (yf * height as f32 / width as f32);
        let direction = (self.direction + offset * (self.angle * 0.5).tan()).normalize_or_zero();

        Ray::new(self.position, direction)
    }

    /// Add one radiance sample per pixel to `image`.
    pub fn render_frame(&self, tracer: &PathTracer, image: &mut Image, rng: &mut dyn RngCore) {
        let (width, height) = (image.width(), image.height());

        for y in 0..height {
            for x in 0..width {
                let ray = self.ray(
                    x as f32 + gen_f32(rng),
                    y as f32 + gen_f32(rng),
                    width,
                    height,
                );
                let radiance = tracer.radiance(&ray, None, rng);
                image.add_sample(x, y, radiance);
            }
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Field of view in radians, after clamping.
    pub fn angle(&self) -> f32 {
        self.angle
    }
}
