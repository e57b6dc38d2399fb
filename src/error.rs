use std::path::PathBuf;

use thiserror::Error;

/// Errors raised when constructing a pixel grid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Width or height was zero.
    #[error("canvas dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors at the image persistence boundary.
#[derive(Debug, Error)]
pub enum ImageIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("unsupported image extension `{0}` (expected png, jpg or jpeg)")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Errors while loading a font for the text rasterizer.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid font data")]
    Invalid(#[from] ab_glyph::InvalidFont),
}

/// Errors while parsing a replay script.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown operation `{op}`")]
    UnknownOp { line: usize, op: String },
    #[error("line {line}: {message}")]
    BadArguments { line: usize, message: String },
}

/// Failure to parse a color string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid color `{0}` (expected a palette name or #RRGGBB[AA])")]
pub struct ColorParseError(pub String);
