//! Example: Load and inspect a model file.
//!
//! Run with: cargo run --example inspect_model -- scenes/cornellbox.ml.txt

use std::env;

use lumen_core::load_model;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_model <path-to-model-file>");
        println!("\nExample:");
        println!("  cargo run --example inspect_model -- scenes/cornellbox.ml.txt");
        return;
    }

    let path = &args[1];
    println!("Loading model file: {}", path);

    match load_model(path) {
        Ok(model) => {
            println!("\n=== Model ===");
            println!("Iterations: {}", model.iterations);
            println!("Image: {}x{}", model.width, model.height);
            println!(
                "Camera: {:?} -> {:?} ({} degrees)",
                model.camera.position, model.camera.direction, model.camera.angle_degrees
            );
            println!("Sky emissivity: {:?}", model.sky_emissivity);
            println!("Ground reflectivity: {:?}", model.ground_reflectivity);
            println!(
                "Triangles: {} ({} emissive)",
                model.triangle_count(),
                model.emissive_count()
            );
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
