use std::path::{Path, PathBuf};

use image::Rgb32FImage;
use rayon::prelude::*;

use crate::error::{AlignError, Result};
use crate::io::read_image;
use crate::tracker::MARKER_COUNT;

pub const MAX_SEQUENCE_FRAMES: usize = 500;
pub const MAX_MARKER_IMAGES: usize = 50;

/// One frame of a numbered sequence and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFrame {
    pub index: usize,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// `<dir>/<base><index>.<ext>`
pub fn numbered_path(dir: &Path, base: &str, index: usize, ext: &str) -> PathBuf {
    dir.join(format!("{}{}.{}", base, index, ext))
}

/// Checks `<base>1`, `<base>2`, ... and stops at the first missing file or
/// after `max` files.
pub fn scan_numbered(dir: &Path, base: &str, ext: &str, max: usize) -> Vec<PathBuf> {
    (1..=max)
        .map(|i| numbered_path(dir, base, i, ext))
        .take_while(|p| p.is_file())
        .collect()
}

/// Lists the frames of a numbered sequence, pairing every input with the
/// same file name under `output_dir`.
pub fn discover_sequence(
    input_dir: &Path,
    base: &str,
    output_dir: &Path,
    ext: &str,
    max: usize,
) -> Vec<SequenceFrame> {
    let frames: Vec<SequenceFrame> = scan_numbered(input_dir, base, ext, max)
        .into_iter()
        .enumerate()
        .map(|(i, input)| SequenceFrame {
            index: i + 1,
            output: numbered_path(output_dir, base, i + 1, ext),
            input,
        })
        .collect();
    log::info!("found {} frames of {}{}", frames.len(), input_dir.display(), base);
    frames
}

/// Loads the marker images `<base>1..<base>4`, ordered bottom-left,
/// bottom-right, top-left, top-right.
pub fn load_markers(dir: &Path, base: &str, ext: &str) -> Result<Vec<Rgb32FImage>> {
    let paths = scan_numbered(dir, base, ext, MAX_MARKER_IMAGES);
    if paths.len() != MARKER_COUNT {
        return Err(AlignError::MarkerCount {
            expected: MARKER_COUNT,
            got: paths.len(),
        });
    }
    log::trace!("loading markers from {}", dir.display());
    paths.par_iter().map(|p| read_image(p)).collect()
}
