use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("need at least {required} correspondences, got {got}")]
    NotEnoughCorrespondences { required: usize, got: usize },
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("marker {index} was not located in the frame")]
    MarkerNotFound { index: usize },
    #[error("expected {expected} marker images, got {got}")]
    MarkerCount { expected: usize, got: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to {op} image {path}: {source}")]
    ImageCodec {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported image format for {path}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, AlignError>;
