//! End-to-end operations built from the detector, matcher, consensus
//! fitter, warper and marker tracker.

use std::path::{Path, PathBuf};

use image::Rgb32FImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rand::Rng;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::data_loader::SequenceFrame;
use crate::detected_points::{Feature, FeatureMatch};
use crate::error::Result;
use crate::features::FeatureDetector;
use crate::filters;
use crate::io::{read_image, write_image};
use crate::matching::find_matches;
use crate::optimization::homography::{Homography, homography_from_feature_matches};
use crate::optimization::ransac::{classify_matches, verified_matches};
use crate::tracker::{MarkerTracker, to_points};
use crate::visualization;
use crate::warp::{place_image_in_frame, transform_image};

/// Matches `reference` features into `image` and classifies them.
pub fn classified_matches<R: Rng + ?Sized>(
    image: &Rgb32FImage,
    reference: &Rgb32FImage,
    feature_budget: usize,
    config: &PipelineConfig,
    rng: &mut R,
) -> Result<Vec<FeatureMatch>> {
    let detector = FeatureDetector::new(config.detector.clone());
    let mut matches = find_matches(
        &detector,
        &config.matcher,
        feature_budget,
        feature_budget,
        reference,
        image,
    );
    classify_matches(&mut matches, &config.ransac, rng)?;
    Ok(matches)
}

/// Draws the verified and rejected matches from `reference` onto a copy
/// of `image`.
pub fn track_features<R: Rng + ?Sized>(
    image: &Rgb32FImage,
    reference: &Rgb32FImage,
    feature_budget: usize,
    config: &PipelineConfig,
    rng: &mut R,
) -> Result<(Rgb32FImage, Vec<FeatureMatch>)> {
    let matches = classified_matches(image, reference, feature_budget, config, rng)?;
    let mut out = image.clone();
    visualization::draw_matches(&mut out, &matches);
    Ok((out, matches))
}

/// Aligns `image` to `reference`: the homography is re-fitted on the
/// verified matches only, then `image` is resampled into the reference
/// frame. With `blend` the result is averaged with `reference`.
pub fn match_homography<R: Rng + ?Sized>(
    image: &Rgb32FImage,
    reference: &Rgb32FImage,
    config: &PipelineConfig,
    blend: bool,
    rng: &mut R,
) -> Result<(Rgb32FImage, Homography)> {
    let matches = classified_matches(image, reference, config.feature_budget, config, rng)?;
    let good = verified_matches(&matches);
    info!("{} of {} matches verified", good.len(), matches.len());
    let homography = homography_from_feature_matches(&good)?;
    let aligned = transform_image(image, &homography)?;
    let out = if blend {
        filters::blend(&aligned, reference)?
    } else {
        aligned
    };
    Ok((out, homography))
}

/// Detects features and draws them onto a copy of `image`.
pub fn feature_overlay(
    image: &Rgb32FImage,
    count: usize,
    scale_invariant: bool,
    config: &PipelineConfig,
) -> (Rgb32FImage, Vec<Feature>) {
    let detector = FeatureDetector::new(config.detector.clone());
    let features = detector.find_features(count, config.matcher.min_separation, scale_invariant, image);
    let mut out = image.clone();
    visualization::draw_features(&mut out, &features);
    (out, features)
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub index: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub marker_locations: Option<Vec<[i32; 2]>>,
    pub homography: Option<Homography>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    pub processed: usize,
    pub failed: usize,
    pub frames: Vec<FrameReport>,
}

/// Locates the markers in one frame, inserts `picture` and writes the
/// result.
fn insert_into_frame(
    frame: &SequenceFrame,
    tracker: &mut MarkerTracker,
    picture: &Rgb32FImage,
    draw_markers: bool,
    report: &mut FrameReport,
) -> Result<()> {
    let mut image = read_image(&frame.input)?;
    let locations = tracker.track(&image)?;
    report.marker_locations = Some(locations.iter().map(|p| [p.x, p.y]).collect());
    let homography = place_image_in_frame(&mut image, &to_points(&locations), picture)?;
    report.homography = Some(homography);
    if draw_markers {
        visualization::draw_markers(&mut image, &locations);
    }
    write_image(&image, &frame.output)
}

/// Inserts `picture` into every frame of a sequence, tracking the four
/// markers from frame to frame.
///
/// A failing frame is recorded in the report and skipped unless
/// `config.fail_fast` is set, in which case its error is returned.
pub fn insert_into_sequence(
    frames: &[SequenceFrame],
    markers: Vec<Rgb32FImage>,
    picture: &Rgb32FImage,
    config: &PipelineConfig,
) -> Result<SequenceReport> {
    let mut tracker = MarkerTracker::new(markers, config.tracker.clone())?;
    let progress = ProgressBar::new(frames.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} frames {elapsed}") {
        progress.set_style(style);
    }

    let mut reports = Vec::with_capacity(frames.len());
    for frame in frames {
        let mut report = FrameReport {
            index: frame.index,
            input: frame.input.clone(),
            output: frame.output.clone(),
            marker_locations: None,
            homography: None,
            error: None,
        };
        if let Err(e) = insert_into_frame(frame, &mut tracker, picture, config.draw_markers, &mut report) {
            if config.fail_fast {
                progress.abandon();
                return Err(e);
            }
            warn!("frame {} ({}): {}", frame.index, frame.input.display(), e);
            report.error = Some(e.to_string());
        }
        reports.push(report);
        progress.inc(1);
    }
    progress.finish();

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    info!("sequence done: {} frames, {} failed", reports.len(), failed);
    Ok(SequenceReport {
        processed: reports.len() - failed,
        failed,
        frames: reports,
    })
}

pub fn write_report(output_path: &Path, report: &SequenceReport) -> Result<()> {
    crate::io::object_to_json(output_path, report)
}
