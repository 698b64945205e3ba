use log::{debug, trace};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::detected_points::FeatureMatch;
use crate::error::{AlignError, Result};
use crate::optimization::homography::{Homography, MIN_CORRESPONDENCES, compute_homography};
use crate::types::PointMatch;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    pub trials: usize,
    /// Per-axis pixel deviation below which a match agrees with a model.
    pub threshold: f64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            threshold: 5.0,
        }
    }
}

/// Best model found by [`classify_matches`] and its final support.
#[derive(Debug, Clone, Copy)]
pub struct Consensus {
    pub homography: Homography,
    pub inliers: usize,
}

pub fn is_consistent(m: &FeatureMatch, h: &Homography, threshold: f64) -> bool {
    match h.transform_point(m.a.location()) {
        Ok(p) => (m.b.x as f64 - p.x).abs() < threshold && (m.b.y as f64 - p.y).abs() < threshold,
        Err(_) => false,
    }
}

pub fn count_consistent(matches: &[FeatureMatch], h: &Homography, threshold: f64) -> usize {
    matches.iter().filter(|m| is_consistent(m, h, threshold)).count()
}

/// Marks every match as verified or not against the best-supported of
/// `config.trials` four-point DLT models.
///
/// Samples are drawn without replacement from `rng`; a trial whose sample
/// is degenerate is skipped. The flags come from a final re-scoring pass
/// against the retained model.
pub fn classify_matches<R: Rng + ?Sized>(
    matches: &mut [FeatureMatch],
    config: &RansacConfig,
    rng: &mut R,
) -> Result<Consensus> {
    if matches.len() < MIN_CORRESPONDENCES {
        return Err(AlignError::NotEnoughCorrespondences {
            required: MIN_CORRESPONDENCES,
            got: matches.len(),
        });
    }
    let point_matches: Vec<PointMatch> = matches.iter().map(|m| m.point_match()).collect();
    let mut nums: Vec<usize> = (0..matches.len()).collect();

    let mut best: Option<(Homography, usize)> = None;
    for trial in 0..config.trials {
        let (sample, _) = nums.partial_shuffle(rng, MIN_CORRESPONDENCES);
        let subset: Vec<PointMatch> = sample.iter().map(|&i| point_matches[i]).collect();
        let candidate = match compute_homography(&subset) {
            Ok(h) => h,
            Err(e) => {
                trace!("trial {} skipped: {}", trial, e);
                continue;
            }
        };
        let support = count_consistent(matches, &candidate, config.threshold);
        if support > best.map_or(0, |(_, s)| s) {
            trace!("trial {} improves support to {}", trial, support);
            best = Some((candidate, support));
        }
    }

    let (homography, _) = best.ok_or_else(|| {
        AlignError::DegenerateGeometry("no sampled model is consistent with any match".to_string())
    })?;
    for m in matches.iter_mut() {
        m.verified_match = is_consistent(m, &homography, config.threshold);
    }
    let inliers = matches.iter().filter(|m| m.verified_match).count();
    debug!("ransac kept {} of {} matches", inliers, matches.len());
    Ok(Consensus {
        homography,
        inliers,
    })
}

pub fn verified_matches(matches: &[FeatureMatch]) -> Vec<FeatureMatch> {
    matches.iter().filter(|m| m.verified_match).copied().collect()
}
