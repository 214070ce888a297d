//! Radiance accumulation, tone mapping and image encoding.
//!
//! Pixels hold the running sum of radiance samples. Encoding divides by the
//! frame count, applies Ward's contrast-based tone mapping for a display of
//! given maximum luminance, then gamma encodes and quantizes to 8 bits.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::Color;
use lumen_math::RGB_LUMINANCE;
use thiserror::Error;

/// ITU-R BT.709 gamma.
pub const GAMMA_ENCODE: f32 = 0.45;

/// Comment line written into PPM headers.
const PPM_ID: &str = "http://www.hxa7241.org/minilight/";

/// Luminance floor for the log average, keeps black pixels finite.
const MIN_LUMINANCE: f32 = 1e-4;

/// Errors from image merging and encoding.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("No images to merge")]
    NoImages,

    #[error("Image size mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
}

/// Accumulated radiance per pixel, stored top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Image {
    /// Create a new image filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel sums, row-major, top row first.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Add a radiance sample. `y` counts from the bottom row.
    ///
    /// Coordinates outside the image are a caller bug: they panic in debug
    /// builds and are ignored in release builds.
    pub fn add_sample(&mut self, x: u32, y: u32, radiance: Color) {
        debug_assert!(
            x < self.width && y < self.height,
            "sample ({}, {}) outside {}x{} image",
            x,
            y,
            self.width,
            self.height
        );
        if x >= self.width || y >= self.height {
            return;
        }
        let index = (x + (self.height - 1 - y) * self.width) as usize;
        self.pixels[index] += radiance;
    }

    /// Sum same-sized images elementwise.
    pub fn merge(images: &[Image]) -> Result<Image, ImageError> {
        let first = images.first().ok_or(ImageError::NoImages)?;
        let mut result = Image::new(first.width, first.height);

        for image in images {
            if (image.width, image.height) != (result.width, result.height) {
                return Err(ImageError::DimensionMismatch {
                    expected: (result.width, result.height),
                    found: (image.width, image.height),
                });
            }
            for (sum, pixel) in result.pixels.iter_mut().zip(&image.pixels) {
                *sum += *pixel;
            }
        }

        Ok(result)
    }

    /// Tone map, gamma encode and quantize to RGB bytes.
    ///
    /// `iteration` is the zero-based index of the last accumulated frame, so
    /// pixel sums are divided by `iteration + 1`.
    pub fn tone_map(&self, iteration: u32, display_luminance_max: f32) -> Vec<u8> {
        let divider = 1.0 / (iteration as f32 + 1.0);
        let scaling = self.tone_map_scaling(divider, display_luminance_max);

        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for pixel in &self.pixels {
            for c in 0..3 {
                let mapped = (pixel[c] * divider * scaling).max(0.0).powf(GAMMA_ENCODE);
                let quantized = (mapped * 255.0 + 0.5).floor();
                bytes.push(quantized.clamp(0.0, 255.0) as u8);
            }
        }
        bytes
    }

    /// Ward's contrast-preserving scale factor.
    fn tone_map_scaling(&self, divider: f32, display_luminance_max: f32) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }

        let sum_of_logs: f32 = self
            .pixels
            .iter()
            .map(|p| (p.dot(RGB_LUMINANCE) * divider).max(MIN_LUMINANCE).log10())
            .sum();
        let log_mean_luminance = 10f32.powf(sum_of_logs / self.pixels.len() as f32);

        let a = 1.219 + (display_luminance_max * 0.25).powf(0.4);
        let b = 1.219 + log_mean_luminance.powf(0.4);

        (a / b).powf(2.5) / display_luminance_max
    }

    /// Write a binary PPM (P6).
    pub fn write_ppm<W: Write>(
        &self,
        writer: &mut W,
        iteration: u32,
        display_luminance_max: f32,
    ) -> Result<(), ImageError> {
        write!(writer, "P6\n# {}\n\n{} {}\n255\n", PPM_ID, self.width, self.height)?;
        writer.write_all(&self.tone_map(iteration, display_luminance_max))?;
        writer.flush()?;
        Ok(())
    }

    /// Save to `path`: PNG for a `.png` extension, PPM otherwise.
    pub fn save<P: AsRef<Path>>(
        &self,
        path: P,
        iteration: u32,
        display_luminance_max: f32,
    ) -> Result<(), ImageError> {
        let path = path.as_ref();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("png"))
            .unwrap_or(false);

        if is_png {
            image::save_buffer_with_format(
                path,
                &self.tone_map(iteration, display_luminance_max),
                self.width,
                self.height,
                image::ColorType::Rgb8,
                image::ImageFormat::Png,
            )?;
        } else {
            let mut writer = BufWriter::new(File::create(path)?);
            self.write_ppm(&mut writer, iteration, display_luminance_max)?;
        }

        log::debug!("Saved {} (iteration {})", path.display(), iteration);
        Ok(())
    }
}
