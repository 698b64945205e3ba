//! Homography-driven resampling and compositing.
//!
//! The homography maps destination pixel coordinates to source coordinates
//! (inverse mapping), so every destination pixel is visited exactly once.

use glam::IVec2;
use image::{Pixel, Rgb, Rgb32FImage};
use log::debug;
use rayon::prelude::*;

use crate::error::Result;
use crate::filters::{in_bounds, pixel_at};
use crate::optimization::homography::{Homography, compute_homography};
use crate::types::{Frame, Point, PointMatch};

/// Samples `src` at a sub-pixel location.
///
/// Interpolates bilinearly when the neighbours `(x0, y0)` and `(x0+1, y0+1)`
/// are both inside, which puts all four neighbours inside. Otherwise the
/// first of those two corners that is inside is returned raw, and `None`
/// when neither is.
pub fn sample_bilinear(src: &Rgb32FImage, p: Point) -> Option<Rgb<f32>> {
    let fx = p.x.floor();
    let fy = p.y.floor();
    if !fx.is_finite() || !fy.is_finite() || fx.abs() >= i32::MAX as f64 || fy.abs() >= i32::MAX as f64
    {
        return None;
    }
    let (x0, y0) = (fx as i32, fy as i32);
    let (x1, y1) = (x0 + 1, y0 + 1);

    if in_bounds(src, x0, y0) && in_bounds(src, x1, y1) {
        let alpha_x = (p.x - fx) as f32;
        let alpha_y = (p.y - fy) as f32;
        let get = |x: i32, y: i32| *src.get_pixel(x as u32, y as u32);
        let lerp = |a: Rgb<f32>, b: Rgb<f32>, t: f32| a.map2(&b, |ca, cb| (1.0 - t) * ca + t * cb);
        let upper = lerp(get(x0, y0), get(x1, y0), alpha_x);
        let lower = lerp(get(x0, y1), get(x1, y1), alpha_x);
        Some(lerp(upper, lower, alpha_y))
    } else {
        pixel_at(src, x0, y0).or_else(|| pixel_at(src, x1, y1)).copied()
    }
}

/// Resamples the pixels of the inclusive box `min..=max` of `dest` from
/// `src` through `h`. Pixels with no in-bounds source are left untouched.
fn warp_region(
    dest: &mut Rgb32FImage,
    src: &Rgb32FImage,
    h: &Homography,
    min: IVec2,
    max: IVec2,
) -> Result<usize> {
    let (w, ht) = dest.dimensions();
    let min = min.max(IVec2::ZERO);
    let max = max.min(IVec2::new(w as i32 - 1, ht as i32 - 1));
    if min.x > max.x || min.y > max.y {
        return Ok(0);
    }

    let coords: Vec<(u32, u32)> = (min.y..=max.y)
        .flat_map(|y| (min.x..=max.x).map(move |x| (x as u32, y as u32)))
        .collect();
    let samples = coords
        .par_iter()
        .map(|&(x, y)| {
            let p = h.transform_point(Point::new(x as f64, y as f64))?;
            Ok(sample_bilinear(src, p).map(|s| (x, y, s)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut written = 0;
    for (x, y, s) in samples.into_iter().flatten() {
        dest.put_pixel(x, y, s);
        written += 1;
    }
    Ok(written)
}

/// Produces a new image of `src`'s size whose pixel `(i, j)` is `src`
/// sampled at `h (i, j)`. Unreachable pixels are black.
pub fn transform_image(src: &Rgb32FImage, h: &Homography) -> Result<Rgb32FImage> {
    let (w, ht) = src.dimensions();
    let mut out = Rgb32FImage::new(w, ht);
    if w == 0 || ht == 0 {
        return Ok(out);
    }
    let written = warp_region(&mut out, src, h, IVec2::ZERO, IVec2::new(w as i32 - 1, ht as i32 - 1))?;
    debug!("transform_image wrote {} of {} pixels", written, w * ht);
    Ok(out)
}

/// Composites `src` into the bounding box of `frame` in `dest`, sampling
/// `src` at `h (i, j)` for each destination pixel.
pub fn warp_image_into_frame(
    dest: &mut Rgb32FImage,
    src: &Rgb32FImage,
    h: &Homography,
    frame: &Frame,
) -> Result<usize> {
    let (min, max) = frame.bounding_box();
    warp_region(dest, src, h, min, max)
}

/// Inserts `picture` into the quadrilateral spanned by four marker
/// locations ordered bottom-left, bottom-right, top-left, top-right.
///
/// Returns the frame-to-picture homography used for sampling.
pub fn place_image_in_frame(
    dest: &mut Rgb32FImage,
    marker_locations: &[Point],
    picture: &Rgb32FImage,
) -> Result<Homography> {
    let frame = Frame::from_corners(marker_locations)?;
    let (w, h) = (picture.width() as f64, picture.height() as f64);
    let point_matches = [
        PointMatch::new(frame.bottom_left, Point::new(0.0, h)),
        PointMatch::new(frame.bottom_right, Point::new(w, h)),
        PointMatch::new(frame.top_left, Point::new(0.0, 0.0)),
        PointMatch::new(frame.top_right, Point::new(w, 0.0)),
    ];
    let homography = compute_homography(&point_matches)?;
    let written = warp_image_into_frame(dest, picture, &homography, &frame)?;
    debug!("placed picture into frame, {} pixels written", written);
    Ok(homography)
}
