//! Model file parser.
//!
//! The model format is a whitespace separated token stream:
//!
//! ```text
//! #MiniLight
//!
//! 100                                   iterations
//! 280 280                               image width and height
//! (0 0.75 -2) (0 0 1) 45                camera position, direction, angle
//! (3626 5572 5802) (0.1 0.09 0.07)      sky emissivity, ground reflectivity
//! (0 0 0) (0 1 0) (1 1 0)  (0.7 0.7 0.7) (0 0 0)
//! ^ triangle: three vertices, reflectivity, emissivity
//! ```
//!
//! Lines starting with `#` are comments. Vectors are written as `(x y z)` and
//! may not nest. Any malformed input is an error; there is no partial model.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use lumen_math::Vec3;
use thiserror::Error;

use crate::model::{CameraDescription, ModelDescription, TriangleDescription};

/// Errors that can occur while reading a model file.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unexpected end of file, expected {0}")]
    UnexpectedEof(&'static str),

    #[error("Invalid number at line {line}: {text:?}")]
    InvalidNumber { line: usize, text: String },

    #[error("Unclosed vector starting at line {0}")]
    UnclosedVector(usize),

    #[error("Image dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Triangle data needs a multiple of 5 vectors, found {0}")]
    IncompleteTriangle(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Scalar(String),
    Vector(Vec3),
}

/// Token-level model parser.
struct ModelParser {
    tokens: VecDeque<(usize, Token)>,
}

impl ModelParser {
    /// Tokenize the whole content up front.
    fn new(content: &str) -> ParseResult<Self> {
        let mut tokens = VecDeque::new();
        // Start line and collected text of a vector still waiting for ')'
        let mut open: Option<(usize, String)> = None;

        for (index, line) in content.lines().enumerate() {
            let line_num = index + 1;
            if open.is_none() && line.trim_start().starts_with('#') {
                continue;
            }

            let mut rest = line;
            loop {
                if let Some((start, mut body)) = open.take() {
                    match rest.find(')') {
                        Some(end) => {
                            body.push(' ');
                            body.push_str(&rest[..end]);
                            tokens.push_back((start, Token::Vector(parse_vector(&body, start)?)));
                            rest = &rest[end + 1..];
                        }
                        None => {
                            body.push(' ');
                            body.push_str(rest);
                            open = Some((start, body));
                            break;
                        }
                    }
                    continue;
                }

                let trimmed = rest.trim_start();
                if trimmed.is_empty() {
                    break;
                }

                if let Some(after) = trimmed.strip_prefix('(') {
                    open = Some((line_num, String::new()));
                    rest = after;
                    continue;
                }

                let end = trimmed
                    .find(|c: char| c.is_whitespace() || c == '(')
                    .unwrap_or(trimmed.len());
                let word = &trimmed[..end];
                if word.contains(')') {
                    return Err(ParseError::Parse {
                        line: line_num,
                        message: format!("unexpected ')' in {:?}", word),
                    });
                }
                tokens.push_back((line_num, Token::Scalar(word.to_string())));
                rest = &trimmed[end..];
            }
        }

        if let Some((start, _)) = open {
            return Err(ParseError::UnclosedVector(start));
        }

        Ok(Self { tokens })
    }

    fn next(&mut self, what: &'static str) -> ParseResult<(usize, Token)> {
        self.tokens.pop_front().ok_or(ParseError::UnexpectedEof(what))
    }

    fn expect_scalar(&mut self, what: &'static str) -> ParseResult<(usize, String)> {
        match self.next(what)? {
            (line, Token::Scalar(text)) => Ok((line, text)),
            (line, Token::Vector(_)) => Err(ParseError::Parse {
                line,
                message: format!("expected {}, found a vector", what),
            }),
        }
    }

    fn expect_integer(&mut self, what: &'static str) -> ParseResult<u32> {
        let (line, text) = self.expect_scalar(what)?;
        text.parse::<u32>()
            .map_err(|_| ParseError::InvalidNumber { line, text })
    }

    fn expect_number(&mut self, what: &'static str) -> ParseResult<f32> {
        let (line, text) = self.expect_scalar(what)?;
        parse_float(&text, line)
    }

    fn expect_vector(&mut self, what: &'static str) -> ParseResult<Vec3> {
        match self.next(what)? {
            (_, Token::Vector(v)) => Ok(v),
            (line, Token::Scalar(text)) => Err(ParseError::Parse {
                line,
                message: format!("expected {} vector, found {:?}", what, text),
            }),
        }
    }

    /// Parse the complete model.
    fn parse(&mut self) -> ParseResult<ModelDescription> {
        let iterations = self.expect_integer("iteration count")?;
        let width = self.expect_integer("image width")?;
        let height = self.expect_integer("image height")?;
        if width == 0 || height == 0 {
            return Err(ParseError::InvalidDimensions { width, height });
        }

        let camera = CameraDescription {
            position: self.expect_vector("camera position")?,
            direction: self.expect_vector("camera direction")?,
            angle_degrees: self.expect_number("camera angle")?,
        };

        let sky_emissivity = self.expect_vector("sky emissivity")?;
        let ground_reflectivity = self.expect_vector("ground reflectivity")?;

        let mut vectors = Vec::with_capacity(self.tokens.len());
        while !self.tokens.is_empty() {
            vectors.push(self.expect_vector("triangle")?);
        }

        if vectors.len() % 5 != 0 {
            return Err(ParseError::IncompleteTriangle(vectors.len()));
        }

        let triangles = vectors
            .chunks_exact(5)
            .map(|c| TriangleDescription::from_vectors([c[0], c[1], c[2], c[3], c[4]]))
            .collect();

        Ok(ModelDescription {
            iterations,
            width,
            height,
            camera,
            sky_emissivity,
            ground_reflectivity,
            triangles,
        })
    }
}

fn parse_float(text: &str, line: usize) -> ParseResult<f32> {
    match text.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::InvalidNumber {
            line,
            text: text.to_string(),
        }),
    }
}

fn parse_vector(body: &str, line: usize) -> ParseResult<Vec3> {
    let parts: Vec<&str> = body.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(ParseError::Parse {
            line,
            message: format!("vector needs 3 components, found {}", parts.len()),
        });
    }

    Ok(Vec3::new(
        parse_float(parts[0], line)?,
        parse_float(parts[1], line)?,
        parse_float(parts[2], line)?,
    ))
}

/// Parse model file content from a string.
pub fn parse_model(content: &str) -> ParseResult<ModelDescription> {
    ModelParser::new(content)?.parse()
}

/// Read and parse a model file.
///
/// # Example
///
/// ```ignore
/// use lumen_core::load_model;
///
/// let model = load_model("cornellbox.ml.txt")?;
/// println!("{} triangles", model.triangle_count());
/// ```
pub fn load_model<P: AsRef<Path>>(path: P) -> ParseResult<ModelDescription> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let model = parse_model(&content)?;

    log::info!(
        "Loaded {}: {} iterations, {}x{}, {} triangles ({} emissive)",
        path.display(),
        model.iterations,
        model.width,
        model.height,
        model.triangle_count(),
        model.emissive_count()
    );
    log::debug!(
        "Camera at {:?} looking {:?}, angle {}",
        model.camera.position,
        model.camera.direction,
        model.camera.angle_degrees
    );

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CORNER: &str = "#MiniLight

100

4 3

(0 0.75 -2) (0 0 1) 45

(3626 5572 5802) (0.1 0.09 0.07)

(0 0 0) (0 1 0) (1 1 0)  (0.7 0.7 0.7) (0 0 0)
(0 0 0) (1 1 0) (1 0 0)  (0.7 0.7 0.7) (10 10 10)
";

    #[test]
    fn test_parse_complete_model() {
        let model = parse_model(CORNER).unwrap();

        assert_eq!(model.iterations, 100);
        assert_eq!((model.width, model.height), (4, 3));
        assert_eq!(model.camera.position, Vec3::new(0.0, 0.75, -2.0));
        assert_eq!(model.camera.direction, Vec3::Z);
        assert_eq!(model.camera.angle_degrees, 45.0);
        assert_eq!(model.sky_emissivity, Vec3::new(3626.0, 5572.0, 5802.0));
        assert_eq!(model.ground_reflectivity, Vec3::new(0.1, 0.09, 0.07));
        assert_eq!(model.triangle_count(), 2);
        assert_eq!(model.triangles[1].vertices[1], Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(model.triangles[1].emissivity, Vec3::splat(10.0));
        assert_eq!(model.emissive_count(), 1);
    }

    #[test]
    fn test_parse_without_triangles() {
        let model = parse_model("1 2 2 (0 0 0) (0 0 1) 90 (1 1 1) (0.5 0.5 0.5)").unwrap();
        assert!(model.triangles.is_empty());
    }

    #[test]
    fn test_vector_may_span_lines() {
        let model = parse_model("1 2 2 (0\n 0 0) (0 0 1) 90 (1 1 1) (0.5 0.5 0.5)").unwrap();
        assert_eq!(model.camera.position, Vec3::ZERO);
    }

    #[test]
    fn test_incomplete_triangle() {
        let content = "1 2 2 (0 0 0) (0 0 1) 90 (1 1 1) (0 0 0) (1 2 3) (4 5 6)";
        assert!(matches!(
            parse_model(content),
            Err(ParseError::IncompleteTriangle(2))
        ));
    }

    #[test]
    fn test_missing_tokens() {
        assert!(matches!(
            parse_model("#MiniLight\n10 20"),
            Err(ParseError::UnexpectedEof("image height"))
        ));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(matches!(
            parse_model("ten 2 2"),
            Err(ParseError::InvalidNumber { line: 1, .. })
        ));

        let content = "1 2 2\n(0 zero 0) (0 0 1) 90 (1 1 1) (0 0 0)";
        assert!(matches!(
            parse_model(content),
            Err(ParseError::InvalidNumber { line: 2, .. })
        ));
    }

    #[test]
    fn test_malformed_vectors() {
        assert!(matches!(
            parse_model("1 2 2 (0 0) (0 0 1) 90 (1 1 1) (0 0 0)"),
            Err(ParseError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_model("1 2 2 (0 0 0) (0 0 1) 90 (1 1 1) (0 0 0"),
            Err(ParseError::UnclosedVector(1))
        ));
    }

    #[test]
    fn test_zero_dimensions() {
        assert!(matches!(
            parse_model("1 0 2 (0 0 0) (0 0 1) 90 (1 1 1) (0 0 0)"),
            Err(ParseError::InvalidDimensions { width: 0, height: 2 })
        ));
    }

    #[test]
    fn test_load_model_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CORNER.as_bytes()).unwrap();

        let model = load_model(file.path()).unwrap();
        assert_eq!(model.triangle_count(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_model("/nonexistent/model.txt"),
            Err(ParseError::Io(_))
        ));
    }
}
