use std::cmp::Ordering;

use image::Rgb;

use crate::types::{Point, PointMatch};

/// Detected keypoint. `sample` is the response-map pixel found at the
/// keypoint, kept by value so later comparisons never alias a source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    pub sample: Rgb<f32>,
    pub x: i32,
    pub y: i32,
    pub characteristic_scale: f64,
}

impl Feature {
    pub fn new(sample: Rgb<f32>, x: i32, y: i32) -> Feature {
        Feature::with_scale(sample, x, y, 1.0)
    }

    pub fn with_scale(sample: Rgb<f32>, x: i32, y: i32, characteristic_scale: f64) -> Feature {
        Feature {
            sample,
            x,
            y,
            characteristic_scale,
        }
    }

    pub fn location(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    /// Sum of the sample channels, used to rank candidates.
    pub fn response(&self) -> f32 {
        self.sample.0.iter().sum()
    }

    /// True when `other` lies strictly within `radius` of this feature.
    pub fn close_to(&self, other: &Feature, radius: f64) -> bool {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx * dx + dy * dy < radius * radius
    }
}

/// Correspondence between feature `a` of the reference image and feature
/// `b` of the searched image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMatch {
    pub a: Feature,
    pub b: Feature,
    pub ssd: f32,
    pub verified_match: bool,
}

impl FeatureMatch {
    pub fn new(a: Feature, b: Feature, ssd: f32) -> FeatureMatch {
        FeatureMatch {
            a,
            b,
            ssd,
            verified_match: false,
        }
    }

    pub fn point_match(&self) -> PointMatch {
        PointMatch::new(self.a.location(), self.b.location())
    }

    pub fn flip_direction(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
    }

    /// Priority order: a lower ssd is the greater match.
    pub fn quality_cmp(&self, other: &FeatureMatch) -> Ordering {
        other.ssd.total_cmp(&self.ssd)
    }
}

/// Sorts matches so the best (lowest ssd) comes first.
pub fn sort_by_quality(matches: &mut [FeatureMatch]) {
    matches.sort_by(|a, b| b.quality_cmp(a));
}
