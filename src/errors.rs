use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for mask/contour conversion
#[derive(Error, Debug)]
pub enum ContourError {
    #[error("Degenerate contour: {0}")]
    DegenerateContour(String),

    #[error(
        "Round-trip mismatch on slice {slice}: original {original} px, reconstructed {reconstructed} px \
         (absolute {absolute} px, relative {relative:.3})"
    )]
    ReconciliationFailure {
        slice: usize,
        original: usize,
        reconstructed: usize,
        absolute: usize,
        relative: f64,
    },

    #[error("Too many connected components for the output id width (limit {limit})")]
    ComponentOverflow { limit: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Image output error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ContourError {
    /// True for the errors that stem from the geometry of a single slice
    pub fn is_slice_local(&self) -> bool {
        matches!(
            self,
            ContourError::DegenerateContour(_) | ContourError::ReconciliationFailure { .. }
        )
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, ContourError>;
