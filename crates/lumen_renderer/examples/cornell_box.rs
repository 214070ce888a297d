//! Cornell box example.
//!
//! Renders the bundled Cornell box scene on all cores and saves it as
//! `cornell_box.ppm` (or the path given as the first argument).
//!
//! Run with: cargo run -p lumen_renderer --example cornell_box --release -- [output] [iterations]

use lumen_renderer::{render, tone_map_iteration, Camera, NullObserver, RenderConfig, Scene};
use std::time::Instant;

const SCENE: &str = include_str!("../../../scenes/cornellbox.ml.txt");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "cornell_box.ppm".to_string());

    let mut model = lumen_core::parse_model(SCENE)?;
    if let Some(iterations) = args.next() {
        model = model.with_iterations(iterations.parse()?);
    }

    let start = Instant::now();
    let scene = Scene::from_model(&model);
    let camera = Camera::from_description(&model.camera);
    log::info!("Scene built in {:?}", start.elapsed());

    let config = RenderConfig {
        iterations: model.iterations,
        threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
        ..Default::default()
    };

    let image = render(&scene, &camera, model.width, model.height, &config, &NullObserver)?;
    image.save(
        &output,
        tone_map_iteration(config.iterations),
        config.display_luminance_max,
    )?;
    log::info!("Saved to {}", output);

    Ok(())
}
