//! Render drivers.
//!
//! A render accumulates `iterations` full frames. With one thread the frames
//! run in order on the calling thread and the observer gets periodic
//! checkpoints. With more, the frames are split across a rayon pool where
//! each worker owns its image and random source, and the partial images are
//! summed at the end.

use std::time::{Duration, Instant};

use crate::{Camera, Image, ImageError, PathTracer, Scene};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;

/// Errors that abort a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),
}

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Number of frames to accumulate
    pub iterations: u32,
    /// Worker threads; 1 renders sequentially with checkpoints
    pub threads: usize,
    /// Seed of the first worker's random source
    pub seed: u64,
    /// Minimum time between checkpoints in sequential mode
    pub save_period: Duration,
    /// Maximum display luminance for tone mapping, in cd/m^2
    pub display_luminance_max: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            threads: 1,
            seed: 42,
            save_period: Duration::from_secs(360),
            display_luminance_max: 200.0,
        }
    }
}

/// Receives progress from a running render.
///
/// Called from worker threads in parallel mode.
pub trait RenderObserver: Sync {
    /// One frame finished on some worker.
    fn frame_completed(&self) {}

    /// Sequential mode asks for the image to be saved. `iteration` is the
    /// tone mapping index of the image as it stands.
    fn checkpoint(&self, _image: &Image, _iteration: u32) -> Result<(), ImageError> {
        Ok(())
    }
}

/// Observer that ignores everything.
pub struct NullObserver;

impl RenderObserver for NullObserver {}

/// Tone mapping index for an image holding `frames` accumulated frames.
pub fn tone_map_iteration(frames: u32) -> u32 {
    frames.saturating_sub(1)
}

/// Split `total` iterations over `workers`; the last worker takes the
/// remainder.
pub fn partition_iterations(total: u32, workers: usize) -> Vec<u32> {
    let workers = workers.max(1);
    let share = total / workers as u32;
    let remainder = total % workers as u32;

    let mut shares = vec![share; workers];
    if let Some(last) = shares.last_mut() {
        *last += remainder;
    }
    shares
}

/// Render `config.iterations` frames of `width` x `height` pixels.
///
/// Returns the accumulated (not yet tone mapped) image.
pub fn render(
    scene: &Scene,
    camera: &Camera,
    width: u32,
    height: u32,
    config: &RenderConfig,
    observer: &dyn RenderObserver,
) -> Result<Image, RenderError> {
    log::info!(
        "Rendering {}x{}, {} iterations on {} thread(s)",
        width,
        height,
        config.iterations,
        config.threads.max(1)
    );
    let start = Instant::now();

    let image = if config.threads <= 1 {
        render_sequential(scene, camera, width, height, config, observer)
    } else {
        render_parallel(scene, camera, width, height, config, observer)?
    };

    log::info!("Render finished in {:.2?}", start.elapsed());
    Ok(image)
}

fn render_sequential(
    scene: &Scene,
    camera: &Camera,
    width: u32,
    height: u32,
    config: &RenderConfig,
    observer: &dyn RenderObserver,
) -> Image {
    let tracer = PathTracer::new(scene);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut image = Image::new(width, height);
    let mut last_save = Instant::now();

    for frame in 0..config.iterations {
        camera.render_frame(&tracer, &mut image, &mut rng);
        observer.frame_completed();

        if frame == 0 || last_save.elapsed() >= config.save_period {
            log::debug!("Checkpoint after {} frame(s)", frame + 1);
            if let Err(e) = observer.checkpoint(&image, frame) {
                log::warn!("Checkpoint failed: {}", e);
            }
            last_save = Instant::now();
        }
    }

    image
}

fn render_parallel(
    scene: &Scene,
    camera: &Camera,
    width: u32,
    height: u32,
    config: &RenderConfig,
    observer: &dyn RenderObserver,
) -> Result<Image, RenderError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;
    let shares = partition_iterations(config.iterations, config.threads);
    let tracer = PathTracer::new(scene);

    let images: Vec<Image> = pool.install(|| {
        shares
            .par_iter()
            .enumerate()
            .map(|(worker, &frames)| {
                log::debug!("Worker {} rendering {} frame(s)", worker, frames);
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(worker as u64));
                let mut image = Image::new(width, height);
                for _ in 0..frames {
                    camera.render_frame(&tracer, &mut image, &mut rng);
                    observer.frame_completed();
                }
                image
            })
            .collect()
    });

    Ok(Image::merge(&images)?)
}
