//! Lumen Core - scene description for the Lumen renderer.
//!
//! This crate provides:
//!
//! - **Scene description types**: `ModelDescription`, `CameraDescription`,
//!   `TriangleDescription`
//! - **Model file support**: parsing the text model format
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::load_model;
//!
//! let model = load_model("cornellbox.ml.txt")?;
//! println!("Loaded {} triangles, {} emissive",
//!     model.triangle_count(),
//!     model.emissive_count());
//! ```

pub mod model;
pub mod parser;

// Re-export commonly used types
pub use model::{CameraDescription, ModelDescription, TriangleDescription};
pub use parser::{load_model, parse_model, ParseError, ParseResult};
