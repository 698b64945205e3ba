use glam::IVec2;
use image::{Rgb, Rgb32FImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::detected_points::{Feature, FeatureMatch};

pub const GREEN: Rgb<f32> = Rgb([0.0, 1.0, 0.0]);
pub const RED: Rgb<f32> = Rgb([1.0, 0.0, 0.0]);

/// Stable pseudo-random color per id.
pub fn id_to_color(id: usize) -> Rgb<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    Rgb([
        ((color_num >> 16) % 256) as f32 / 255.0,
        ((color_num >> 8) % 256) as f32 / 255.0,
        (color_num % 256) as f32 / 255.0,
    ])
}

/// Square spanning `center ± reach` on both axes.
fn square(center: IVec2, reach: i32) -> Rect {
    let side = (2 * reach + 1) as u32;
    Rect::at(center.x - reach, center.y - reach).of_size(side, side)
}

fn as_f32(p: IVec2) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

/// Circle of radius `10 * scale` around each feature.
pub fn draw_features(img: &mut Rgb32FImage, features: &[Feature]) {
    for f in features {
        let radius = (10.0 * f.characteristic_scale).round() as i32;
        draw_hollow_circle_mut(img, (f.x, f.y), radius, GREEN);
    }
}

/// Square at each match destination and a line from its source; green
/// when verified, red otherwise.
pub fn draw_matches(img: &mut Rgb32FImage, matches: &[FeatureMatch]) {
    for m in matches {
        let color = if m.verified_match { GREEN } else { RED };
        let a = IVec2::new(m.a.x, m.a.y);
        let b = IVec2::new(m.b.x, m.b.y);
        draw_hollow_rect_mut(img, square(b, 5), color);
        draw_line_segment_mut(img, as_f32(a), as_f32(b), color);
    }
}

pub fn draw_markers(img: &mut Rgb32FImage, locations: &[IVec2]) {
    for (i, p) in locations.iter().enumerate() {
        draw_filled_rect_mut(img, square(*p, 10), id_to_color(i));
    }
}
