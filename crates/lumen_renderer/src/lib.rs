//! Lumen renderer - unbiased CPU path tracing
//!
//! A Monte Carlo path tracer for triangle scenes with diffuse materials.
//! Light transport is estimated by recursive path tracing with next-event
//! estimation and Russian roulette termination; frames are accumulated into
//! an image that is tone mapped for display.
//!
//! The usual flow is:
//!
//! ```ignore
//! let model = lumen_core::load_model("cornellbox.ml.txt")?;
//! let scene = Scene::from_model(&model);
//! let camera = Camera::from_description(&model.camera);
//! let config = RenderConfig { iterations: model.iterations, ..Default::default() };
//! let image = render(&scene, &camera, model.width, model.height, &config, &NullObserver)?;
//! image.save("out.ppm", tone_map_iteration(config.iterations), config.display_luminance_max)?;
//! ```

mod camera;
mod film;
mod octree;
mod render;
mod scene;
mod surface;
mod tracer;
mod triangle;

pub use camera::Camera;
pub use film::{Image, ImageError, GAMMA_ENCODE};
pub use octree::{Hit, Octree, OctreeNode};
pub use render::{
    partition_iterations, render, tone_map_iteration, NullObserver, RenderConfig, RenderError,
    RenderObserver,
};
pub use scene::{EmitterSample, Scene, MAX_EMITTERS};
pub use surface::{Bounce, SurfacePoint};
pub use tracer::{PathTracer, MAX_BOUNCES};
pub use triangle::{Triangle, TOLERANCE};

/// Re-export Vec3 and common math types from lumen_math
pub use lumen_math::{Bound, Ray, Vec3};

/// RGB radiance or reflectance.
pub type Color = Vec3;

/// Uniform sample in [0, 1).
#[inline]
pub(crate) fn gen_f32(rng: &mut dyn rand::RngCore) -> f32 {
    use rand::Rng;
    rng.gen()
}
