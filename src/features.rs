//! Harris corner detection and well-separated feature selection.

use image::{Rgb, Rgb32FImage};
use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::detected_points::Feature;
use crate::filters::{self, luminance};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Blur applied to the gradient products of the structure tensor.
    pub sigma: f64,
    pub k: f32,
    /// Luminance a response must exceed to become a candidate.
    pub threshold: f32,
    /// Sigmas swept during scale-invariant detection, ascending.
    pub scale_ladder: Vec<f64>,
    /// Use the raw `min_separation * (scale - 1)` exclusion radius, which is
    /// zero for scale 1.
    pub legacy_separation: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            k: 0.04,
            threshold: 0.5,
            scale_ladder: (1..10).map(|s| 2.0 * s as f64).collect(),
            legacy_separation: false,
        }
    }
}

/// Harris response map, shifted by 0.5 per channel: flat regions read
/// mid-gray, corners bright and edges dark.
pub fn harris(img: &Rgb32FImage, sigma: f64, k: f32, clamped: bool) -> Rgb32FImage {
    let gx = filters::sobel_x(img);
    let gy = filters::sobel_y(img);
    let (w, h) = img.dimensions();

    let product = |f: fn(f32, f32) -> f32| {
        Rgb32FImage::from_par_fn(w, h, |x, y| {
            let a = gx.get_pixel(x, y).0;
            let b = gy.get_pixel(x, y).0;
            Rgb([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2])])
        })
    };
    let xx = filters::blur(&product(|a, _| a * a), sigma, false);
    let yy = filters::blur(&product(|_, b| b * b), sigma, false);
    let xy = filters::blur(&product(|a, b| a * b), sigma, false);

    Rgb32FImage::from_par_fn(w, h, |x, y| {
        let sxx = xx.get_pixel(x, y).0;
        let syy = yy.get_pixel(x, y).0;
        let sxy = xy.get_pixel(x, y).0;
        let mut out = [0.0f32; 3];
        for c in 0..3 {
            let det = sxx[c] * syy[c] - sxy[c] * sxy[c];
            let trace = sxx[c] + syy[c];
            out[c] = det - k * trace * trace + 0.5;
        }
        let p = Rgb(out);
        if clamped { filters::clamp_pixel(p) } else { p }
    })
}

pub struct FeatureDetector {
    pub config: DetectorConfig,
}

impl FeatureDetector {
    pub fn new(config: DetectorConfig) -> Self {
        FeatureDetector { config }
    }

    /// Exclusion radius around an accepted feature of the given scale.
    pub fn exclusion_radius(&self, min_separation: f64, scale: f64) -> f64 {
        if self.config.legacy_separation {
            min_separation * (scale - 1.0)
        } else {
            min_separation * (scale - 1.0).max(1.0)
        }
    }

    /// Selects up to `count` strong features of `img`, strongest first.
    ///
    /// A candidate is rejected when an accepted feature of the same
    /// characteristic scale lies within the exclusion radius.
    pub fn find_features(
        &self,
        count: usize,
        min_separation: f64,
        scale_invariant: bool,
        img: &Rgb32FImage,
    ) -> Vec<Feature> {
        let response = harris(img, self.config.sigma, self.config.k, false);
        let mut candidates: Vec<Feature> = response
            .enumerate_pixels()
            .filter(|(_, _, p)| scale_invariant || luminance(p) > self.config.threshold)
            .map(|(x, y, p)| {
                if scale_invariant {
                    Feature::with_scale(*p, x as i32, y as i32, self.config.sigma)
                } else {
                    Feature::new(*p, x as i32, y as i32)
                }
            })
            .collect();
        debug!("{} harris candidates", candidates.len());

        if scale_invariant {
            self.refine_characteristic_scales(&mut candidates, img);
        }

        candidates.sort_by(|a, b| a.response().total_cmp(&b.response()));

        let mut selected: Vec<Feature> = Vec::with_capacity(count.min(candidates.len()));
        for candidate in candidates.iter().rev() {
            if selected.len() >= count {
                break;
            }
            let radius = self.exclusion_radius(min_separation, candidate.characteristic_scale);
            let conflict = selected.iter().any(|f| {
                f.characteristic_scale == candidate.characteristic_scale
                    && candidate.close_to(f, radius)
            });
            if !conflict {
                selected.push(*candidate);
            }
        }
        debug!("selected {} features", selected.len());
        selected
    }

    /// Sweeps the scale ladder and keeps, per feature, the largest response
    /// seen together with the sigma that produced it. A feature keeps its
    /// current sample and scale unless a ladder sigma beats it.
    pub fn refine_characteristic_scales(&self, features: &mut [Feature], img: &Rgb32FImage) {
        for &sigma in &self.config.scale_ladder {
            let response = harris(img, sigma, self.config.k, false);
            features.par_iter_mut().for_each(|f| {
                let p = response.get_pixel(f.x as u32, f.y as u32);
                if luminance(p) > luminance(&f.sample) {
                    f.sample = *p;
                    f.characteristic_scale = sigma;
                }
            });
            trace!("scale sweep at sigma {} done", sigma);
        }
    }
}
