//! Renderable scene: triangles, emitters, environment and the spatial index.

use crate::octree::{Hit, Octree};
use crate::triangle::Triangle;
use lumen_core::ModelDescription;
use lumen_math::{Ray, Vec3};
use rand::{Rng, RngCore};

/// Maximum number of triangles sampled as light sources.
pub const MAX_EMITTERS: usize = 1 << 16;

/// A point sampled on an emitting triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterSample {
    /// Index of the emitting triangle
    pub triangle: usize,
    /// Sampled position on its surface
    pub position: Vec3,
}

/// The scene the path tracer works against.
///
/// Built once per render and read-only afterwards, so it can be shared
/// between worker threads freely.
pub struct Scene {
    triangles: Vec<Triangle>,
    emitters: Vec<usize>,
    octree: Octree,
    sky_emission: Vec3,
    ground_reflection: Vec3,
}

impl Scene {
    /// Build a scene and its spatial index.
    ///
    /// - `eye`: camera position, folded into the index bound
    /// - `sky_emission`: negative channels are clamped to zero
    /// - `ground_reflectivity`: clamped to [0, 1]; the ground reflects the sky
    pub fn new(triangles: Vec<Triangle>, eye: Vec3, sky_emission: Vec3, ground_reflectivity: Vec3) -> Self {
        let sky_emission = sky_emission.max(Vec3::ZERO);
        let ground_reflection = sky_emission * ground_reflectivity.clamp(Vec3::ZERO, Vec3::ONE);

        let mut emitters: Vec<usize> = triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_emitter())
            .map(|(i, _)| i)
            .collect();
        if emitters.len() > MAX_EMITTERS {
            log::warn!(
                "{} emitting triangles, only the first {} are sampled",
                emitters.len(),
                MAX_EMITTERS
            );
            emitters.truncate(MAX_EMITTERS);
        }

        let octree = Octree::new(eye, &triangles);

        log::info!("Scene: {} triangles, {} emitters", triangles.len(), emitters.len());

        Self {
            triangles,
            emitters,
            octree,
            sky_emission,
            ground_reflection,
        }
    }

    /// Build the scene described by a parsed model.
    pub fn from_model(model: &ModelDescription) -> Self {
        let triangles = model.triangles.iter().map(Triangle::from_description).collect();
        Self::new(
            triangles,
            model.camera.position,
            model.sky_emissivity,
            model.ground_reflectivity,
        )
    }

    /// Nearest triangle along `ray`, ignoring `last_hit`.
    pub fn intersect(&self, ray: &Ray, last_hit: Option<usize>) -> Option<Hit> {
        self.octree.intersect(&self.triangles, ray, last_hit)
    }

    /// Pick an emitter uniformly and a uniform point on it.
    ///
    /// Returns `None` when the scene has no emitters.
    pub fn emitter(&self, rng: &mut dyn RngCore) -> Option<EmitterSample> {
        if self.emitters.is_empty() {
            return None;
        }

        let triangle = self.emitters[rng.gen_range(0..self.emitters.len())];
        let position = self.triangles[triangle].sample_point(rng);
        Some(EmitterSample { triangle, position })
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Indices of the sampled emitters, in triangle order.
    pub fn emitters(&self) -> &[usize] {
        &self.emitters
    }

    /// Radiance arriving from the environment along `-back_direction`.
    ///
    /// Looking up (`back_direction` pointing down) sees the sky, anything else
    /// sees the ground.
    pub fn default_emission(&self, back_direction: Vec3) -> Vec3 {
        if back_direction.y < 0.0 {
            self.sky_emission
        } else {
            self.ground_reflection
        }
    }

    pub fn triangle(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quad_light(y: f32, emissivity: Vec3) -> Triangle {
        Triangle::new(
            Vec3::new(-1.0, y, -1.0),
            Vec3::new(1.0, y, -1.0),
            Vec3::new(0.0, y, 1.0),
            Vec3::ZERO,
            emissivity,
        )
    }

    #[test]
    fn test_emitters_are_selected() {
        let triangles = vec![
            quad_light(0.0, Vec3::ZERO),
            quad_light(1.0, Vec3::ONE),
            // Degenerate emitters are never sampled
            Triangle::new(Vec3::ZERO, Vec3::X, Vec3::X * 2.0, Vec3::ZERO, Vec3::ONE),
        ];
        let scene = Scene::new(triangles, Vec3::new(0.0, 0.5, -3.0), Vec3::ZERO, Vec3::ZERO);

        assert_eq!(scene.emitter_count(), 1);

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let sample = scene.emitter(&mut rng).unwrap();
            assert_eq!(sample.triangle, 1);
            assert!((sample.position.y - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_emitter_cap_keeps_first() {
        // Small disjoint emitters on a grid, one more than the cap
        let count = MAX_EMITTERS + 1;
        let triangles: Vec<Triangle> = (0..count)
            .map(|i| {
                let corner = Vec3::new((i % 256) as f32, 0.0, (i / 256) as f32);
                Triangle::new(
                    corner,
                    corner + Vec3::new(0.0, 0.0, 0.1),
                    corner + Vec3::new(0.1, 0.0, 0.0),
                    Vec3::ZERO,
                    Vec3::ONE,
                )
            })
            .collect();
        assert!(triangles.iter().all(|t| t.is_emitter()));

        let scene = Scene::new(triangles, Vec3::new(128.0, 10.0, 128.0), Vec3::ZERO, Vec3::ZERO);

        assert_eq!(scene.emitter_count(), MAX_EMITTERS);
        assert_eq!(scene.emitters()[0], 0);
        assert_eq!(scene.emitters()[MAX_EMITTERS - 1], MAX_EMITTERS - 1);
        assert!(!scene.emitters().contains(&(count - 1)));
    }

    #[test]
    fn test_no_emitters() {
        let scene = Scene::new(vec![quad_light(0.0, Vec3::ZERO)], Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(scene.emitter_count(), 0);
        assert!(scene.emitter(&mut rng).is_none());
    }

    #[test]
    fn test_default_emission() {
        let scene = Scene::new(
            Vec::new(),
            Vec3::ZERO,
            Vec3::new(10.0, -5.0, 20.0),
            Vec3::new(0.5, 2.0, -1.0),
        );

        // Sky is clamped to be non-negative
        assert_eq!(scene.default_emission(-Vec3::Y), Vec3::new(10.0, 0.0, 20.0));
        // Ground reflects the clamped sky with clamped reflectivity
        assert_eq!(scene.default_emission(Vec3::Y), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_intersect_through_scene() {
        let scene = Scene::new(
            vec![quad_light(0.0, Vec3::ZERO), quad_light(1.0, Vec3::ONE)],
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
        );

        let ray = Ray::new(Vec3::new(0.0, 3.0, 0.0), -Vec3::Y);
        let hit = scene.intersect(&ray, None).unwrap();
        assert_eq!(hit.triangle, 1);
        assert!((hit.position - Vec3::Y).length() < 1e-5);

        let hit = scene.intersect(&Ray::new(hit.position, -Vec3::Y), Some(1)).unwrap();
        assert_eq!(hit.triangle, 0);
    }

    #[test]
    fn test_from_model() {
        let model = lumen_core::parse_model(
            "5 2 2 (0 0.5 -1) (0 0 1) 45 (1 1 1) (0.5 0.5 0.5)
             (0 0 0) (1 0 0) (0 1 0) (0.5 0.5 0.5) (1 1 1)",
        )
        .unwrap();
        let scene = Scene::from_model(&model);

        assert_eq!(scene.triangles().len(), 1);
        assert_eq!(scene.emitter_count(), 1);
        assert!(scene.octree().bound().contains_within(Vec3::new(0.0, 0.5, -1.0), 0.0));
    }
}
