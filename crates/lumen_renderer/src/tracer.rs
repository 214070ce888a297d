//! Monte Carlo radiance estimator.
//!
//! Each call traces one path: emission seen directly by primary rays, one
//! emitter sample per hit (next-event estimation) and an indirect bounce that
//! continues until Russian roulette ends it.

use crate::scene::Scene;
use crate::surface::SurfacePoint;
use crate::Color;
use lumen_math::{Ray, Vec3};
use rand::RngCore;

/// Hard cap on path length.
///
/// Termination is by Russian roulette; the cap only bounds recursion depth.
/// With mean reflectivity below one the probability of reaching it is
/// negligible.
pub const MAX_BOUNCES: u32 = 512;

/// Path tracer over a read-only scene.
#[derive(Clone, Copy)]
pub struct PathTracer<'a> {
    scene: &'a Scene,
}

impl<'a> PathTracer<'a> {
    pub fn new(scene: &'a Scene) -> Self {
        Self { scene }
    }

    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    /// Radiance arriving at the ray origin from along the ray.
    ///
    /// `last_hit` is the triangle the ray leaves from, or `None` for a
    /// camera ray.
    pub fn radiance(&self, ray: &Ray, last_hit: Option<usize>, rng: &mut dyn RngCore) -> Color {
        self.trace(ray, last_hit, 0, rng)
    }

    fn trace(&self, ray: &Ray, last_hit: Option<usize>, depth: u32, rng: &mut dyn RngCore) -> Color {
        let back = ray.reversed_direction();

        let Some(hit) = self.scene.intersect(ray, last_hit) else {
            return self.scene.default_emission(back);
        };

        let surface = SurfacePoint::new(self.scene.triangle(hit.triangle), hit.position);

        // Emitters seen through a bounce were already counted by sampling
        let mut radiance = if last_hit.is_none() {
            surface.emission(ray.origin(), back, false)
        } else {
            Color::ZERO
        };

        radiance += self.sample_emitters(&surface, hit.triangle, back, rng);

        if depth + 1 < MAX_BOUNCES {
            if let Some(bounce) = surface.next_direction(back, rng) {
                let next = Ray::new(hit.position, bounce.direction);
                radiance += bounce.color * self.trace(&next, Some(hit.triangle), depth + 1, rng);
            }
        }

        radiance
    }

    /// Direct light from one emitter sample, reflected toward `out_direction`.
    fn sample_emitters(
        &self,
        surface: &SurfacePoint,
        surface_triangle: usize,
        out_direction: Vec3,
        rng: &mut dyn RngCore,
    ) -> Color {
        let Some(sample) = self.scene.emitter(rng) else {
            return Color::ZERO;
        };

        let emit_direction = (sample.position - surface.position()).normalize_or_zero();

        let shadow = Ray::new(surface.position(), emit_direction);
        let unshadowed = match self.scene.intersect(&shadow, Some(surface_triangle)) {
            None => true,
            Some(blocker) => blocker.triangle == sample.triangle,
        };

        let emission_in = if unshadowed {
            SurfacePoint::new(self.scene.triangle(sample.triangle), sample.position).emission(
                surface.position(),
                -emit_direction,
                true,
            )
        } else {
            Color::ZERO
        };

        surface.reflection(
            emit_direction,
            emission_in * self.scene.emitter_count() as f32,
            out_direction,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Triangle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f32::consts::PI;

    fn floor(reflectivity: Vec3, emissivity: Vec3) -> Triangle {
        Triangle::new(
            Vec3::new(-10.0, 0.0, -10.0),
            Vec3::new(-10.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, -10.0),
            reflectivity,
            emissivity,
        )
    }

    #[test]
    fn test_miss_returns_environment() {
        let scene = Scene::new(Vec::new(), Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5));
        let tracer = PathTracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(1);

        let up = tracer.radiance(&Ray::new(Vec3::ZERO, Vec3::Y), None, &mut rng);
        assert_eq!(up, Vec3::new(1.0, 2.0, 3.0));

        let down = tracer.radiance(&Ray::new(Vec3::ZERO, -Vec3::Y), None, &mut rng);
        assert_eq!(down, Vec3::new(0.5, 1.0, 1.5));
    }

    #[test]
    fn test_emissive_floor_primary_ray() {
        let emissivity = Vec3::new(4.0, 5.0, 6.0);
        let eye = Vec3::new(0.0, 2.0, 0.0);
        let scene = Scene::new(vec![floor(Vec3::ZERO, emissivity)], eye, Vec3::ZERO, Vec3::ZERO);
        let tracer = PathTracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..10 {
            let ray = Ray::new(eye, Vec3::new(-0.1, -1.0, -0.2).normalize());
            let radiance = tracer.radiance(&ray, None, &mut rng);
            assert!((radiance - emissivity).length() < 1e-5, "{:?}", radiance);
        }
    }

    #[test]
    fn test_emission_not_counted_on_bounce() {
        let scene = Scene::new(
            vec![floor(Vec3::ZERO, Vec3::ONE)],
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
        );
        let tracer = PathTracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(3);

        // Pretend the ray left some other surface
        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y);
        assert_eq!(tracer.radiance(&ray, Some(usize::MAX), &mut rng), Vec3::ZERO);
    }

    #[test]
    fn test_back_face_does_not_emit() {
        let scene = Scene::new(
            vec![floor(Vec3::ZERO, Vec3::ONE)],
            Vec3::new(0.0, -2.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
        );
        let tracer = PathTracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(4);

        let ray = Ray::new(Vec3::new(0.0, -2.0, 0.0), Vec3::Y);
        assert_eq!(tracer.radiance(&ray, None, &mut rng), Vec3::ZERO);
    }

    #[test]
    fn test_direct_light_reaches_floor() {
        // Grey floor lit by an emitter facing down from above
        let light = Triangle::new(
            Vec3::new(-1.0, 2.0, -1.0),
            Vec3::new(1.0, 2.0, -1.0),
            Vec3::new(0.0, 2.0, 1.0),
            Vec3::ZERO,
            Vec3::splat(10.0),
        );
        let eye = Vec3::new(0.0, 1.0, -3.0);
        let scene = Scene::new(vec![floor(Vec3::splat(0.5), Vec3::ZERO), light], eye, Vec3::ZERO, Vec3::ZERO);
        assert!(scene.triangle(1).normal().y < 0.0);

        let tracer = PathTracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(5);

        let target = Vec3::new(-0.5, 0.0, -0.5);
        let ray = Ray::new(eye, (target - eye).normalize());
        let mut sum = Vec3::ZERO;
        for _ in 0..200 {
            let radiance = tracer.radiance(&ray, None, &mut rng);
            assert!(radiance.is_finite());
            assert!(radiance.min_element() >= 0.0);
            sum += radiance;
        }
        assert!(sum.x > 0.0);
    }

    /// Small emitter centred on `centre`, facing down.
    fn spot_light(centre: Vec3, emissivity: Vec3) -> Triangle {
        let s = 0.005;
        Triangle::new(
            centre + Vec3::new(-s, 0.0, -s),
            centre + Vec3::new(s, 0.0, -s),
            centre + Vec3::new(0.0, 0.0, s),
            Vec3::ZERO,
            emissivity,
        )
    }

    /// Two faces of an axis-aligned quad, wound so the normal faces `inside`.
    fn inward_quad(corners: [Vec3; 4], inside: Vec3, reflectivity: Vec3, emissivity: Vec3) -> [Triangle; 2] {
        let [a, b, c, d] = corners;
        let normal = Triangle::new(a, b, c, reflectivity, emissivity).normal();
        if normal.dot(inside - a) > 0.0 {
            [
                Triangle::new(a, b, c, reflectivity, emissivity),
                Triangle::new(a, c, d, reflectivity, emissivity),
            ]
        } else {
            [
                Triangle::new(a, c, b, reflectivity, emissivity),
                Triangle::new(a, d, c, reflectivity, emissivity),
            ]
        }
    }

    #[test]
    fn test_emitter_sampling_scales_by_count() {
        // One grey floor, two identical lights placed symmetrically above it.
        // Only one light is sampled per hit, so the estimate must be scaled
        // by the number of lights to see both.
        let floor = Triangle::new(
            Vec3::new(-10.0, 0.0, -10.0),
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(20.0, 0.0, -10.0),
            Vec3::splat(0.5),
            Vec3::ZERO,
        );
        let emissivity = Vec3::splat(10.0);
        let lights = [
            spot_light(Vec3::new(-0.5, 1.0, 0.0), emissivity),
            spot_light(Vec3::new(0.5, 1.0, 0.0), emissivity),
        ];
        let eye = Vec3::new(0.0, 2.0, -1.0);
        let scene = Scene::new(
            vec![floor, lights[0].clone(), lights[1].clone()],
            eye,
            Vec3::ZERO,
            Vec3::ZERO,
        );
        assert_eq!(scene.emitter_count(), 2);
        assert!(scene.triangle(0).normal().y > 0.0);
        assert!(lights.iter().all(|l| l.normal().y < 0.0));

        // Light reflected at the origin from one light, taken at its centroid
        let single = {
            let light = &lights[0];
            let centroid = light.vertices().iter().copied().sum::<Vec3>() / 3.0;
            let distance2 = centroid.length_squared();
            let direction = centroid / distance2.sqrt();
            let cos_emit = direction.dot(-light.normal());
            let cos_in = direction.y;
            emissivity * light.area() * cos_emit / distance2 * 0.5 * cos_in / PI
        };
        let expected = single * 2.0;

        let tracer = PathTracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(7);
        let ray = Ray::new(eye, (Vec3::ZERO - eye).normalize());

        let samples = 200;
        let mut sum = Vec3::ZERO;
        for _ in 0..samples {
            sum += tracer.radiance(&ray, None, &mut rng);
        }
        let mean = sum / samples as f32;

        let relative = (mean - expected).abs() / expected;
        assert!(relative.max_element() < 0.02, "mean {:?}, expected {:?}", mean, expected);
    }

    #[test]
    fn test_white_box_path_is_capped() {
        // Closed box that reflects everything: only the bounce cap ends paths.
        let corner = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
        let inside = Vec3::splat(0.5);
        let white = Vec3::ONE;
        let faces = [
            ([corner(0.0, 0.0, 0.0), corner(1.0, 0.0, 0.0), corner(1.0, 0.0, 1.0), corner(0.0, 0.0, 1.0)], Vec3::ZERO),
            ([corner(0.0, 1.0, 0.0), corner(1.0, 1.0, 0.0), corner(1.0, 1.0, 1.0), corner(0.0, 1.0, 1.0)], Vec3::ONE),
            ([corner(0.0, 0.0, 0.0), corner(0.0, 1.0, 0.0), corner(0.0, 1.0, 1.0), corner(0.0, 0.0, 1.0)], Vec3::ZERO),
            ([corner(1.0, 0.0, 0.0), corner(1.0, 1.0, 0.0), corner(1.0, 1.0, 1.0), corner(1.0, 0.0, 1.0)], Vec3::ZERO),
            ([corner(0.0, 0.0, 0.0), corner(1.0, 0.0, 0.0), corner(1.0, 1.0, 0.0), corner(0.0, 1.0, 0.0)], Vec3::ZERO),
            ([corner(0.0, 0.0, 1.0), corner(1.0, 0.0, 1.0), corner(1.0, 1.0, 1.0), corner(0.0, 1.0, 1.0)], Vec3::ZERO),
        ];
        let triangles: Vec<Triangle> = faces
            .into_iter()
            .flat_map(|(corners, emissivity)| inward_quad(corners, inside, white, emissivity))
            .collect();
        assert!(triangles
            .iter()
            .all(|t| t.normal().dot(inside - t.vertices()[0]) > 0.0));

        let scene = Scene::new(triangles, inside, Vec3::ZERO, Vec3::ZERO);
        assert_eq!(scene.emitter_count(), 2);
        let tracer = PathTracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(8);

        for direction in [-Vec3::Y, Vec3::X, Vec3::new(0.3, -0.4, 0.5).normalize()] {
            let radiance = tracer.radiance(&Ray::new(inside, direction), None, &mut rng);
            assert!(radiance.is_finite(), "{:?}", radiance);
            assert!(radiance.max_element() > 0.0, "{:?}", radiance);
        }
    }

    #[test]
    fn test_no_emitters_adds_nothing() {
        let eye = Vec3::new(0.0, 2.0, 0.0);
        let scene = Scene::new(vec![floor(Vec3::splat(0.9), Vec3::ZERO)], eye, Vec3::ZERO, Vec3::ZERO);
        let tracer = PathTracer::new(&scene);
        let mut rng = StdRng::seed_from_u64(6);

        // No lights and a black environment: nothing to see
        for _ in 0..50 {
            let radiance = tracer.radiance(&Ray::new(eye, -Vec3::Y), None, &mut rng);
            assert_eq!(radiance, Vec3::ZERO);
        }
    }
}
