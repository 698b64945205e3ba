//! Linear filters and per-pixel helpers on normalised RGB images.
//!
//! Images are `Rgb32FImage` with channels nominally in `[0, 1]`. Filters do
//! not clamp unless asked to, so intermediate maps such as squared gradients
//! keep their full range.

use image::{Pixel, Rgb, Rgb32FImage};

use crate::error::{AlignError, Result};

pub const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
pub const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
pub const SHARPEN: [[f32; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];

const BLACK: Rgb<f32> = Rgb([0.0, 0.0, 0.0]);

pub fn luminance(p: &Rgb<f32>) -> f32 {
    0.30 * p.0[0] + 0.59 * p.0[1] + 0.11 * p.0[2]
}

pub fn in_bounds(img: &Rgb32FImage, x: i32, y: i32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height()
}

/// Pixel at signed coordinates, `None` outside the image.
pub fn pixel_at(img: &Rgb32FImage, x: i32, y: i32) -> Option<&Rgb<f32>> {
    if in_bounds(img, x, y) {
        Some(img.get_pixel(x as u32, y as u32))
    } else {
        None
    }
}

pub fn clamp_pixel(p: Rgb<f32>) -> Rgb<f32> {
    p.map(|c| c.clamp(0.0, 1.0))
}

/// 3x3 correlation, `kernel[row][col]` weighting pixel `(x + col - 1, y + row - 1)`.
/// The one-pixel border is left black.
pub fn convolve_3x3(img: &Rgb32FImage, kernel: &[[f32; 3]; 3]) -> Rgb32FImage {
    let (w, h) = img.dimensions();
    Rgb32FImage::from_par_fn(w, h, |x, y| {
        if x == 0 || y == 0 || x + 1 >= w || y + 1 >= h {
            return BLACK;
        }
        let mut acc = [0.0f32; 3];
        for (row, weights) in kernel.iter().enumerate() {
            for (col, weight) in weights.iter().enumerate() {
                let p = img.get_pixel(x + col as u32 - 1, y + row as u32 - 1);
                for c in 0..3 {
                    acc[c] += weight * p.0[c];
                }
            }
        }
        Rgb(acc)
    })
}

pub fn sobel_x(img: &Rgb32FImage) -> Rgb32FImage {
    convolve_3x3(img, &SOBEL_X)
}

pub fn sobel_y(img: &Rgb32FImage) -> Rgb32FImage {
    convolve_3x3(img, &SOBEL_Y)
}

/// Sharpens the interior; border pixels keep their input value.
pub fn sharpen(img: &Rgb32FImage) -> Rgb32FImage {
    let (w, h) = img.dimensions();
    let mut out = convolve_3x3(img, &SHARPEN);
    for (x, y, p) in out.enumerate_pixels_mut() {
        if x == 0 || y == 0 || x + 1 >= w || y + 1 >= h {
            *p = *img.get_pixel(x, y);
        }
    }
    out
}

fn gaussian(sigma: f64, x: i64) -> f64 {
    let frac = 1.0 / ((2.0 * std::f64::consts::PI).sqrt() * sigma);
    frac * (-((x * x) as f64) / (2.0 * sigma * sigma)).exp()
}

/// Sampled Gaussian of reach `floor(3 sigma)` on each side.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let reach = (3.0 * sigma) as i64;
    (-reach..=reach).map(|i| gaussian(sigma, i)).collect()
}

/// Separable Gaussian blur. Taps falling outside the image are dropped and
/// the remaining weights renormalised, so flat regions stay flat up to the
/// border.
pub fn blur(img: &Rgb32FImage, sigma: f64, clamped: bool) -> Rgb32FImage {
    if sigma <= 0.0 {
        return img.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let reach = (kernel.len() / 2) as i64;
    let (w, h) = img.dimensions();

    let pass = |src: &Rgb32FImage, vertical: bool| {
        Rgb32FImage::from_par_fn(w, h, |x, y| {
            let (pos, len) = if vertical {
                (y as i64, h as i64)
            } else {
                (x as i64, w as i64)
            };
            let lower = (-reach).max(-pos);
            let upper = (reach + 1).min(len - pos);
            let mut acc = [0.0f64; 3];
            let mut weight_sum = 0.0;
            for a in lower..upper {
                let weight = kernel[(a + reach) as usize];
                let p = if vertical {
                    src.get_pixel(x, (y as i64 + a) as u32)
                } else {
                    src.get_pixel((x as i64 + a) as u32, y)
                };
                for c in 0..3 {
                    acc[c] += weight * p.0[c] as f64;
                }
                weight_sum += weight;
            }
            let p = Rgb(acc.map(|v| (v / weight_sum) as f32));
            if clamped { clamp_pixel(p) } else { p }
        })
    };

    let vertical = pass(img, true);
    pass(&vertical, false)
}

pub fn brighten(img: &Rgb32FImage, factor: f32) -> Rgb32FImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        *p = clamp_pixel(p.map(|c| c * factor));
    }
    out
}

/// Low-pass plus `contrast` times the high-pass detail, clamped.
pub fn high_pass(img: &Rgb32FImage, sigma: f64, contrast: f32) -> Rgb32FImage {
    let low = blur(img, sigma, true);
    let mut out = low.clone();
    for (x, y, p) in out.enumerate_pixels_mut() {
        let detail = img.get_pixel(x, y).map2(low.get_pixel(x, y), |a, b| a - b);
        *p = clamp_pixel(p.map2(&detail, |l, d| l + d * contrast));
    }
    out
}

/// Averages two images of equal size with equal weight.
pub fn blend(a: &Rgb32FImage, b: &Rgb32FImage) -> Result<Rgb32FImage> {
    if a.dimensions() != b.dimensions() {
        return Err(AlignError::InvalidInput(format!(
            "cannot blend {:?} with {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }
    let mut out = a.clone();
    for (x, y, p) in out.enumerate_pixels_mut() {
        *p = p.map2(b.get_pixel(x, y), |pa, pb| 0.5 * pa + 0.5 * pb);
    }
    Ok(out)
}
