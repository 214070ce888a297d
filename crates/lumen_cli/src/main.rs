//! Lumen - command line batch renderer
//!
//! Reads a model file, path traces it for the requested number of iterations
//! and writes the tone mapped result as PPM (or PNG for a `.png` path).

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use lumen_renderer::{
    render, tone_map_iteration, Camera, Image, ImageError, RenderConfig, RenderObserver, Scene,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about = "Unbiased global illumination renderer")]
struct Options {
    /// Model file to render
    model: PathBuf,

    /// Seed of the random sources
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Worker threads; 1 renders sequentially with periodic saves
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    threads: u16,

    /// Seconds between intermediate saves (single thread only)
    #[arg(short, long, default_value_t = 360)]
    period: u64,

    /// Output image path [default: <model>.ppm]
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Maximum display luminance used for tone mapping
    #[arg(short, long, default_value_t = 200.0)]
    luminance: f32,

    /// Render this many iterations instead of the model's count
    #[arg(short = 'o', long = "override", value_name = "ITERATIONS")]
    iterations: Option<u32>,
}

impl Options {
    fn image_path(&self) -> PathBuf {
        self.image.clone().unwrap_or_else(|| {
            let mut path = self.model.clone().into_os_string();
            path.push(".ppm");
            PathBuf::from(path)
        })
    }

    fn render_config(&self, iterations: u32) -> RenderConfig {
        RenderConfig {
            iterations,
            threads: self.threads as usize,
            seed: self.seed,
            save_period: Duration::from_secs(self.period),
            display_luminance_max: self.luminance,
        }
    }
}

/// Progress bar that also writes checkpoints.
struct Progress {
    bar: ProgressBar,
    image_path: PathBuf,
    display_luminance_max: f32,
}

impl RenderObserver for Progress {
    fn frame_completed(&self) {
        self.bar.inc(1);
    }

    fn checkpoint(&self, image: &Image, iteration: u32) -> Result<(), ImageError> {
        image.save(&self.image_path, iteration, self.display_luminance_max)
    }
}

fn run(options: &Options) -> Result<()> {
    let start = Instant::now();

    let mut model = lumen_core::load_model(&options.model)
        .with_context(|| format!("Failed to load model {}", options.model.display()))?;
    if let Some(iterations) = options.iterations {
        log::info!("Overriding iterations: {} -> {}", model.iterations, iterations);
        model = model.with_iterations(iterations);
    }

    let scene = Scene::from_model(&model);
    let camera = Camera::from_description(&model.camera);
    let config = options.render_config(model.iterations);
    let image_path = options.image_path();

    let bar = ProgressBar::new(config.iterations as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {eta}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );
    let progress = Progress {
        bar,
        image_path: image_path.clone(),
        display_luminance_max: config.display_luminance_max,
    };

    let image = render(&scene, &camera, model.width, model.height, &config, &progress)?;
    progress.bar.finish();

    image
        .save(
            &image_path,
            tone_map_iteration(config.iterations),
            config.display_luminance_max,
        )
        .with_context(|| format!("Failed to save image {}", image_path.display()))?;

    log::info!("Saved {} in {:.1?}", image_path.display(), start.elapsed());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = Options::parse();
    if let Err(e) = run(&options) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::try_parse_from(["lumen", "scenes/box.ml.txt"]).unwrap();

        assert_eq!(options.image_path(), PathBuf::from("scenes/box.ml.txt.ppm"));
        assert!(options.iterations.is_none());

        let config = options.render_config(100);
        let defaults = RenderConfig::default();
        assert_eq!(config.iterations, 100);
        assert_eq!(config.threads, defaults.threads);
        assert_eq!(config.seed, defaults.seed);
        assert_eq!(config.save_period, defaults.save_period);
        assert_eq!(config.display_luminance_max, defaults.display_luminance_max);
    }

    #[test]
    fn test_all_options() {
        let options = Options::try_parse_from([
            "lumen",
            "box.txt",
            "--seed",
            "7",
            "--threads",
            "4",
            "--period",
            "10",
            "--image",
            "out.png",
            "--luminance",
            "100",
            "--override",
            "16",
        ])
        .unwrap();

        assert_eq!(options.image_path(), PathBuf::from("out.png"));
        assert_eq!(options.iterations, Some(16));

        let config = options.render_config(16);
        assert_eq!(config.threads, 4);
        assert_eq!(config.seed, 7);
        assert_eq!(config.save_period, Duration::from_secs(10));
        assert_eq!(config.display_luminance_max, 100.0);
    }

    #[test]
    fn test_rejects_bad_options() {
        assert!(Options::try_parse_from(["lumen"]).is_err());
        assert!(Options::try_parse_from(["lumen", "box.txt", "--threads", "0"]).is_err());
        assert!(Options::try_parse_from(["lumen", "box.txt", "--seed", "x"]).is_err());
    }

    #[test]
    fn test_missing_model_fails() {
        let options = Options::try_parse_from(["lumen", "/nonexistent/model.txt"]).unwrap();
        let err = run(&options).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load model"));
    }
}
