pub mod config;
pub mod data_loader;
pub mod detected_points;
pub mod error;
pub mod features;
pub mod filters;
pub mod io;
pub mod matching;
pub mod optimization;
pub mod pipeline;
pub mod ssd;
pub mod tracker;
pub mod types;
pub mod visualization;
pub mod warp;

pub use error::{AlignError, Result};
