use image::Rgb32FImage;
use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::detected_points::{Feature, FeatureMatch};
use crate::features::FeatureDetector;
use crate::ssd::{max_patch_ssd, patch_ssd};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub min_separation: f64,
    /// Half-width of the search window as a fraction of the image size.
    pub search_reach: f64,
    pub patch_radius: i32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_separation: 10.0,
            search_reach: 0.3,
            patch_radius: 3,
        }
    }
}

/// Exhaustively searches `target` around the feature's own coordinates for
/// the lowest-ssd patch. Returns `None` only when the window is empty.
pub fn find_feature_match(
    feature: &Feature,
    reference: &Rgb32FImage,
    target: &Rgb32FImage,
    config: &MatcherConfig,
) -> Option<FeatureMatch> {
    let (w, h) = target.dimensions();
    let reach_x = (w as f64 * config.search_reach) as i32;
    let reach_y = (h as f64 * config.search_reach) as i32;
    let x_range = (feature.x - reach_x).max(0)..(feature.x + reach_x).min(w as i32);
    let y_range = (feature.y - reach_y).max(0)..(feature.y + reach_y).min(h as i32);
    trace!(
        "search ({}, {}) -> ({}, {})",
        x_range.start, y_range.start, x_range.end, y_range.end
    );

    let mut best: Option<(f32, i32, i32)> = None;
    let mut best_ssd = max_patch_ssd(config.patch_radius);
    for x in x_range {
        for y in y_range.clone() {
            let ssd = patch_ssd(target, x, y, reference, feature.x, feature.y, config.patch_radius);
            if ssd < best_ssd || best.is_none() {
                best_ssd = ssd;
                best = Some((ssd, x, y));
            }
        }
    }
    best.map(|(ssd, x, y)| {
        let b = Feature::new(*target.get_pixel(x as u32, y as u32), x, y);
        FeatureMatch::new(*feature, b, ssd)
    })
}

/// Detects up to `feature_budget` features in `reference` and matches the
/// first `match_budget` of them into `target`, one match per feature with
/// no quality filtering.
pub fn find_matches(
    detector: &FeatureDetector,
    config: &MatcherConfig,
    feature_budget: usize,
    match_budget: usize,
    reference: &Rgb32FImage,
    target: &Rgb32FImage,
) -> Vec<FeatureMatch> {
    let features = detector.find_features(feature_budget, config.min_separation, false, reference);
    let matches: Vec<FeatureMatch> = features
        .par_iter()
        .take(match_budget)
        .filter_map(|f| find_feature_match(f, reference, target, config))
        .collect();
    debug!("{} matches from {} features", matches.len(), features.len());
    matches
}
