use std::io;

use thiserror::Error;

/// Errors raised while assembling a scene or writing frames.
///
/// Rendering itself cannot fail; everything here happens before the first
/// ray is cast or after the last frame is delivered.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("scene description error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{what} is empty")]
    EmptyMap { what: &'static str },
    #[error("{what} has {actual} pixels, expected {width}x{height}")]
    MapSize {
        what: &'static str,
        width: usize,
        height: usize,
        actual: usize,
    },
    #[error("unknown material preset `{0}`")]
    UnknownMaterial(String),
    #[error("expected {expected} components for {field}, found {actual}")]
    Components {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("sphere radius must be positive, found {0}")]
    Radius(f64),
}

pub type Result<T> = std::result::Result<T, Error>;
