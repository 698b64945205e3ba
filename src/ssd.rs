//! Sum-of-squared-differences patch comparison.
//!
//! Sample positions that fall outside either image are never skipped: each
//! one adds [`OUT_OF_BOUNDS_PENALTY`], the largest difference two pixels can
//! have, so windows near the border remain comparable with interior ones.

use image::{Rgb, Rgb32FImage};

use crate::filters::pixel_at;

/// Squared difference between pure white and pure black.
pub const OUT_OF_BOUNDS_PENALTY: f32 = 3.0;

pub fn pixel_ssd(a: &Rgb<f32>, b: &Rgb<f32>) -> f32 {
    a.0.iter().zip(b.0.iter()).map(|(ca, cb)| (ca - cb) * (ca - cb)).sum()
}

/// Largest score a patch of the given radius can reach.
pub fn max_patch_ssd(radius: i32) -> f32 {
    let side = (2 * radius + 1) as f32;
    side * side * OUT_OF_BOUNDS_PENALTY
}

/// Compares the `(2r+1)^2` patch around `(x0, y0)` in `a` with the patch
/// around `(x1, y1)` in `b`.
pub fn patch_ssd(
    a: &Rgb32FImage,
    x0: i32,
    y0: i32,
    b: &Rgb32FImage,
    x1: i32,
    y1: i32,
    radius: i32,
) -> f32 {
    let mut sum = 0.0;
    for i in -radius..=radius {
        for j in -radius..=radius {
            sum += match (pixel_at(a, x0 + i, y0 + j), pixel_at(b, x1 + i, y1 + j)) {
                (Some(pa), Some(pb)) => pixel_ssd(pa, pb),
                _ => OUT_OF_BOUNDS_PENALTY,
            };
        }
    }
    sum
}

/// Compares a whole marker image with the same-sized window of `frame`
/// centred on `(x0, y0)`.
pub fn marker_ssd(frame: &Rgb32FImage, x0: i32, y0: i32, marker: &Rgb32FImage) -> f32 {
    let x_reach = (marker.width() / 2) as i32;
    let y_reach = (marker.height() / 2) as i32;
    let mut sum = 0.0;
    for i in -x_reach..=x_reach {
        for j in -y_reach..=y_reach {
            sum += match (
                pixel_at(frame, x0 + i, y0 + j),
                pixel_at(marker, x_reach + i, y_reach + j),
            ) {
                (Some(pf), Some(pm)) => pixel_ssd(pf, pm),
                _ => OUT_OF_BOUNDS_PENALTY,
            };
        }
    }
    sum
}
