// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod bound;
mod ray;
pub use bound::Bound;
pub use ray::Ray;

/// ITU-R BT.709 RGB luminance weights.
pub const RGB_LUMINANCE: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);
