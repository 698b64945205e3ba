use log::trace;
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::detected_points::FeatureMatch;
use crate::error::{AlignError, Result};
use crate::optimization::linear::svd;
use crate::types::{Point, PointMatch};

pub const MIN_CORRESPONDENCES: usize = 4;

/// Relative size below which a second singular value means the DLT system
/// has more than one null direction.
const RANK_TOLERANCE: f64 = 1e-12;

/// Row-major 3x3 projective transform, defined up to scale. A source point
/// `(x, y, 1)` maps to `H (x, y, 1)^T` followed by division by `w`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: [f64; 9],
}

impl Homography {
    pub fn new(h: [f64; 9]) -> Homography {
        Homography { h }
    }

    pub fn identity() -> Homography {
        Homography::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    pub fn translation(dx: f64, dy: f64) -> Homography {
        Homography::new([1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0])
    }

    pub fn from_matrix(m: &na::Matrix3<f64>) -> Homography {
        let mut h = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                h[3 * r + c] = m[(r, c)];
            }
        }
        Homography::new(h)
    }

    pub fn matrix(&self) -> na::Matrix3<f64> {
        na::Matrix3::from_row_slice(&self.h)
    }

    /// Rescales so that `h[8] == 1`, or to unit norm when `h[8]` vanishes.
    pub fn normalized(&self) -> Homography {
        let scale = if self.h[8].abs() > f64::EPSILON {
            self.h[8]
        } else {
            self.h.iter().map(|v| v * v).sum::<f64>().sqrt()
        };
        if scale == 0.0 {
            return *self;
        }
        Homography::new(self.h.map(|v| v / scale))
    }

    pub fn inverse(&self) -> Result<Homography> {
        self.matrix()
            .try_inverse()
            .map(|m| Homography::from_matrix(&m).normalized())
            .ok_or_else(|| AlignError::DegenerateGeometry("homography is singular".to_string()))
    }

    /// Maps `p` through the transform. Fails when `p` lands on the line at
    /// infinity (`w` vanishes relative to the terms that form it).
    pub fn transform_point(&self, p: Point) -> Result<Point> {
        let h = &self.h;
        let x = h[0] * p.x + h[1] * p.y + h[2];
        let y = h[3] * p.x + h[4] * p.y + h[5];
        let w = h[6] * p.x + h[7] * p.y + h[8];
        let magnitude = (h[6] * p.x).abs().max((h[7] * p.y).abs()).max(h[8].abs());
        if !w.is_finite() || w.abs() <= RANK_TOLERANCE * magnitude {
            return Err(AlignError::DegenerateGeometry(format!(
                "homogeneous w = {} at ({}, {})",
                w, p.x, p.y
            )));
        }
        Ok(Point::new(x / w, y / w))
    }
}

/// Fits `H` with `b ~ H a` for every correspondence by the direct linear
/// transform: the right-singular vector of the smallest singular value.
pub fn compute_homography(matches: &[PointMatch]) -> Result<Homography> {
    if matches.len() < MIN_CORRESPONDENCES {
        return Err(AlignError::NotEnoughCorrespondences {
            required: MIN_CORRESPONDENCES,
            got: matches.len(),
        });
    }
    let mut a = na::DMatrix::<f64>::zeros(2 * matches.len(), 9);
    for (i, m) in matches.iter().enumerate() {
        let (ax, ay, bx, by) = (m.a.x, m.a.y, m.b.x, m.b.y);
        let row1 = [0.0, 0.0, 0.0, -ax, -ay, -1.0, by * ax, by * ay, by];
        let row2 = [ax, ay, 1.0, 0.0, 0.0, 0.0, -ax * bx, -ay * bx, -bx];
        for j in 0..9 {
            a[(2 * i, j)] = row1[j];
            a[(2 * i + 1, j)] = row2[j];
        }
    }

    let (singular_values, v) = svd(&a)?;

    let mut solution_col = 0;
    for i in 1..singular_values.len() {
        if singular_values[i] < singular_values[solution_col] {
            solution_col = i;
        }
    }

    let largest = singular_values.max();
    let second_smallest = singular_values
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != solution_col)
        .map(|(_, s)| *s)
        .fold(f64::MAX, f64::min);
    if !largest.is_finite() || largest <= 0.0 || second_smallest <= RANK_TOLERANCE * largest {
        return Err(AlignError::DegenerateGeometry(
            "correspondences do not determine a unique homography".to_string(),
        ));
    }
    trace!("dlt singular values {:?}", singular_values.as_slice());

    let mut h = [0.0; 9];
    for (i, value) in h.iter_mut().enumerate() {
        *value = v[(i, solution_col)];
    }
    Ok(Homography::new(h))
}

pub fn homography_from_feature_matches(matches: &[FeatureMatch]) -> Result<Homography> {
    let point_matches: Vec<PointMatch> = matches.iter().map(|m| m.point_match()).collect();
    compute_homography(&point_matches)
}
