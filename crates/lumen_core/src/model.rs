//! Scene description types for Lumen.
//!
//! This module defines the renderer-agnostic result of reading a model file:
//! image settings, the camera, the environment and a flat triangle soup.
//! Nothing here is clamped or validated beyond what the parser checks; the
//! renderer applies its own physical limits when it builds a scene.

use lumen_math::Vec3;

/// Camera placement as written in the model file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraDescription {
    /// Eye position
    pub position: Vec3,

    /// View direction (not necessarily unit length)
    pub direction: Vec3,

    /// Horizontal field of view in degrees
    pub angle_degrees: f32,
}

/// One triangle with its material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleDescription {
    /// Vertex positions, counter-clockwise seen from the emitting side
    pub vertices: [Vec3; 3],

    /// Diffuse reflectivity per channel (0-1)
    pub reflectivity: Vec3,

    /// Emitted radiance per channel
    pub emissivity: Vec3,
}

impl TriangleDescription {
    /// Build a triangle from the five vectors of a model file record.
    pub fn from_vectors(v: [Vec3; 5]) -> Self {
        Self {
            vertices: [v[0], v[1], v[2]],
            reflectivity: v[3],
            emissivity: v[4],
        }
    }

    /// Check if any channel of the emissivity is non-zero.
    pub fn is_emissive(&self) -> bool {
        self.emissivity != Vec3::ZERO
    }
}

/// A complete model: everything needed to set up a render.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelDescription {
    /// Number of frames to accumulate
    pub iterations: u32,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Camera placement
    pub camera: CameraDescription,

    /// Radiance of the sky hemisphere
    pub sky_emissivity: Vec3,

    /// Reflectivity of the implicit ground below the horizon
    pub ground_reflectivity: Vec3,

    /// Triangle soup
    pub triangles: Vec<TriangleDescription>,
}

impl ModelDescription {
    /// Replace the iteration count (command line override).
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Get triangle count.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Get the number of triangles with non-zero emissivity.
    pub fn emissive_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.is_emissive()).count()
    }
}
