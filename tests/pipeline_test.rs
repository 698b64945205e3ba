use glam::{DVec2, IVec2};
use homography_composite::AlignError;
use homography_composite::config::PipelineConfig;
use homography_composite::data_loader::{SequenceFrame, discover_sequence, numbered_path};
use homography_composite::io::{read_image, write_image};
use homography_composite::pipeline::{
    feature_overlay, insert_into_sequence, match_homography, track_features, write_report,
};
use homography_composite::visualization::GREEN;
use image::{Rgb, Rgb32FImage};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const BLACK: Rgb<f32> = Rgb([0.0, 0.0, 0.0]);
const YELLOW: Rgb<f32> = Rgb([1.0, 1.0, 0.0]);

/// 96x96 mosaic of 8 px blocks with random colours.
fn mosaic(seed: u64) -> Rgb32FImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let colors: Vec<Rgb<f32>> = (0..144)
        .map(|_| Rgb([rng.random(), rng.random(), rng.random()]))
        .collect();
    Rgb32FImage::from_fn(96, 96, |x, y| colors[(y / 8 * 12 + x / 8) as usize])
}

/// `img` moved right by `dx` and down by `dy`, uncovered pixels black.
fn shifted(img: &Rgb32FImage, dx: u32, dy: u32) -> Rgb32FImage {
    let (w, h) = img.dimensions();
    Rgb32FImage::from_fn(w, h, |x, y| {
        if x >= dx && y >= dy { *img.get_pixel(x - dx, y - dy) } else { BLACK }
    })
}

fn small_config() -> PipelineConfig {
    PipelineConfig {
        feature_budget: 30,
        ..Default::default()
    }
}

#[test]
fn test_match_homography_recovers_shift() {
    let reference = mosaic(11);
    let image = shifted(&reference, 4, 3);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let (aligned, h) = match_homography(&image, &reference, &small_config(), false, &mut rng).unwrap();

    let p = h.transform_point(DVec2::new(40.0, 40.0)).unwrap();
    assert!((p - DVec2::new(44.0, 43.0)).length() < 0.5, "{:?}", p);

    let a = aligned.get_pixel(42, 42).0;
    let r = reference.get_pixel(42, 42).0;
    for c in 0..3 {
        assert!((a[c] - r[c]).abs() < 1e-3);
    }
}

#[test]
fn test_match_homography_blend() {
    let reference = mosaic(5);
    let image = shifted(&reference, 2, 2);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let (blended, _) = match_homography(&image, &reference, &small_config(), true, &mut rng).unwrap();
    assert_eq!(blended.dimensions(), reference.dimensions());
}

#[test]
fn test_track_features_draws_verified_matches() {
    let reference = mosaic(11);
    let image = shifted(&reference, 4, 3);
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let (out, matches) = track_features(&image, &reference, 30, &small_config(), &mut rng).unwrap();
    assert!(matches.iter().filter(|m| m.verified_match).count() >= 4);
    assert!(out.pixels().any(|p| *p == GREEN));
}

#[test]
fn test_feature_overlay() {
    let img = Rgb32FImage::from_fn(64, 64, |x, y| {
        if (x < 32) == (y < 32) { Rgb([1.0, 1.0, 1.0]) } else { BLACK }
    });
    let (out, features) = feature_overlay(&img, 5, false, &PipelineConfig::default());
    assert!(!features.is_empty());
    assert!(out.pixels().any(|p| *p == GREEN));
}

fn marker_colors() -> [Rgb<f32>; 4] {
    [
        Rgb([1.0, 0.0, 0.0]),
        Rgb([0.0, 1.0, 0.0]),
        Rgb([0.0, 0.0, 1.0]),
        Rgb([1.0, 1.0, 1.0]),
    ]
}

fn marker_centers(offset: IVec2) -> Vec<IVec2> {
    [
        IVec2::new(30, 90),
        IVec2::new(130, 90),
        IVec2::new(30, 30),
        IVec2::new(130, 30),
    ]
    .iter()
    .map(|p| *p + offset)
    .collect()
}

fn frame_with_markers(centers: &[IVec2]) -> Rgb32FImage {
    let colors = marker_colors();
    Rgb32FImage::from_fn(160, 120, |x, y| {
        let p = IVec2::new(x as i32, y as i32);
        centers
            .iter()
            .zip(colors.iter())
            .find(|(c, _)| (p - **c).abs().max_element() <= 8)
            .map(|(_, color)| *color)
            .unwrap_or(BLACK)
    })
}

fn markers() -> Vec<Rgb32FImage> {
    marker_colors()
        .iter()
        .map(|c| Rgb32FImage::from_pixel(17, 17, *c))
        .collect()
}

#[test]
fn test_insert_into_sequence() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let offsets = [IVec2::ZERO, IVec2::new(5, -3)];
    for (i, offset) in offsets.iter().enumerate() {
        let frame = frame_with_markers(&marker_centers(*offset));
        write_image(&frame, &numbered_path(input.path(), "frame", i + 1, "png")).unwrap();
    }
    let frames = discover_sequence(input.path(), "frame", output.path(), "png", 500);
    let picture = Rgb32FImage::from_pixel(20, 20, YELLOW);

    let report = insert_into_sequence(&frames, markers(), &picture, &PipelineConfig::default()).unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 0);

    let expected: Vec<[i32; 2]> = marker_centers(offsets[1]).iter().map(|p| [p.x, p.y]).collect();
    assert_eq!(report.frames[1].marker_locations.as_ref(), Some(&expected));

    let out = read_image(&frames[1].output).unwrap();
    assert_eq!(*out.get_pixel(80, 60), YELLOW);
    assert_eq!(*out.get_pixel(5, 5), BLACK);

    let report_path = output.path().join("report.json");
    write_report(&report_path, &report).unwrap();
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["processed"], 2);
}

#[test]
fn test_sequence_failure_policy() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let frame = frame_with_markers(&marker_centers(IVec2::ZERO));
    write_image(&frame, &numbered_path(input.path(), "frame", 1, "png")).unwrap();
    let mut frames = discover_sequence(input.path(), "frame", output.path(), "png", 500);
    frames.push(SequenceFrame {
        index: 2,
        input: numbered_path(input.path(), "frame", 2, "png"),
        output: numbered_path(output.path(), "frame", 2, "png"),
    });
    let picture = Rgb32FImage::from_pixel(20, 20, YELLOW);

    let report = insert_into_sequence(&frames, markers(), &picture, &PipelineConfig::default()).unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 1);
    assert!(report.frames[1].error.is_some());
    assert!(report.frames[1].marker_locations.is_none());

    let strict = PipelineConfig {
        fail_fast: true,
        ..Default::default()
    };
    assert!(matches!(
        insert_into_sequence(&frames, markers(), &picture, &strict),
        Err(AlignError::ImageCodec { .. })
    ));
}

#[test]
fn test_sequence_needs_four_markers() {
    let mut three = markers();
    three.pop();
    let picture = Rgb32FImage::new(4, 4);
    assert!(matches!(
        insert_into_sequence(&[], three, &picture, &PipelineConfig::default()),
        Err(AlignError::MarkerCount { .. })
    ));
}
