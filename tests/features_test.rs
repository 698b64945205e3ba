use homography_composite::detected_points::{Feature, FeatureMatch, sort_by_quality};
use homography_composite::features::{DetectorConfig, FeatureDetector, harris};
use homography_composite::filters::luminance;
use image::{Rgb, Rgb32FImage};

const WHITE: Rgb<f32> = Rgb([1.0, 1.0, 1.0]);
const BLACK: Rgb<f32> = Rgb([0.0, 0.0, 0.0]);

/// 2x2 checkerboard with a single X-junction at (32, 32).
fn four_squares() -> Rgb32FImage {
    Rgb32FImage::from_fn(64, 64, |x, y| if (x < 32) == (y < 32) { WHITE } else { BLACK })
}

fn min_pairwise_distance(features: &[Feature]) -> f64 {
    let mut best = f64::MAX;
    for (i, a) in features.iter().enumerate() {
        for b in &features[i + 1..] {
            best = best.min(a.location().distance(b.location()));
        }
    }
    best
}

#[test]
fn test_harris_flat_image_is_mid_gray() {
    let img = Rgb32FImage::from_pixel(20, 20, Rgb([0.3, 0.6, 0.9]));
    let response = harris(&img, 2.0, 0.04, false);
    for p in response.pixels() {
        for c in p.0 {
            assert!((c - 0.5).abs() < 1e-6);
        }
    }
}

#[test]
fn test_harris_peaks_at_junction() {
    let response = harris(&four_squares(), 2.0, 0.04, false);
    let corner = luminance(response.get_pixel(31, 31));
    let edge = luminance(response.get_pixel(31, 10));
    let flat = luminance(response.get_pixel(10, 10));
    assert!(corner > 0.5, "corner {}", corner);
    assert!(corner > flat);
    assert!(edge < corner);
}

#[test]
fn test_strongest_feature_at_junction() {
    let detector = FeatureDetector::new(DetectorConfig::default());
    let features = detector.find_features(1, 10.0, false, &four_squares());
    assert_eq!(features.len(), 1);
    let f = features[0];
    assert!((f.x - 32).abs() <= 3 && (f.y - 32).abs() <= 3, "{:?}", f);
}

#[test]
fn test_features_respect_separation() {
    let detector = FeatureDetector::new(DetectorConfig::default());
    let features = detector.find_features(20, 10.0, false, &four_squares());
    assert!(!features.is_empty());
    assert!(min_pairwise_distance(&features) >= 10.0);
    for pair in features.windows(2) {
        assert!(pair[0].response() >= pair[1].response());
    }
}

#[test]
fn test_legacy_separation_allows_neighbours() {
    let detector = FeatureDetector::new(DetectorConfig {
        legacy_separation: true,
        ..Default::default()
    });
    assert_eq!(detector.exclusion_radius(10.0, 1.0), 0.0);
    let features = detector.find_features(20, 10.0, false, &four_squares());
    assert!(features.len() >= 2);
    assert!(min_pairwise_distance(&features) < 10.0);
}

#[test]
fn test_exclusion_radius_grows_with_scale() {
    let detector = FeatureDetector::new(DetectorConfig::default());
    assert_eq!(detector.exclusion_radius(10.0, 1.0), 10.0);
    assert_eq!(detector.exclusion_radius(10.0, 4.0), 30.0);
}

#[test]
fn test_scale_refinement_picks_ladder_sigma() {
    let config = DetectorConfig {
        scale_ladder: vec![2.0, 4.0],
        ..Default::default()
    };
    let detector = FeatureDetector::new(config);
    let img = four_squares();
    let mut features = vec![Feature::new(Rgb([0.0, 0.0, 0.0]), 32, 32)];
    detector.refine_characteristic_scales(&mut features, &img);
    assert!(features[0].characteristic_scale == 2.0 || features[0].characteristic_scale == 4.0);
    assert!(luminance(&features[0].sample) > 0.0);
}

/// Checkerboard of `cell` px squares.
fn checkerboard(size: u32, cell: u32) -> Rgb32FImage {
    Rgb32FImage::from_fn(size, size, |x, y| if (x / cell + y / cell) % 2 == 0 { WHITE } else { BLACK })
}

#[test]
fn test_scale_invariant_features_carry_ladder_scales() {
    let config = DetectorConfig {
        scale_ladder: vec![2.0, 4.0, 6.0],
        ..Default::default()
    };
    let detector = FeatureDetector::new(config.clone());
    let features = detector.find_features(30, 10.0, true, &checkerboard(48, 3));
    assert!(!features.is_empty());
    for f in &features {
        assert!(config.scale_ladder.contains(&f.characteristic_scale), "{:?}", f);
    }
    for (i, a) in features.iter().enumerate() {
        for b in &features[i + 1..] {
            if a.characteristic_scale == b.characteristic_scale {
                let radius = detector.exclusion_radius(10.0, a.characteristic_scale);
                assert!(
                    a.location().distance(b.location()) >= radius,
                    "{:?} {:?}",
                    a,
                    b
                );
            }
        }
    }
}

#[test]
fn test_uniform_features_keep_unit_scale() {
    let detector = FeatureDetector::new(DetectorConfig::default());
    let features = detector.find_features(10, 10.0, false, &checkerboard(48, 3));
    assert!(features.iter().all(|f| f.characteristic_scale == 1.0));
}

#[test]
fn test_match_ordering() {
    let f = Feature::new(WHITE, 0, 0);
    let mut matches = vec![
        FeatureMatch::new(f, f, 3.0),
        FeatureMatch::new(f, f, 0.5),
        FeatureMatch::new(f, f, 1.0),
    ];
    sort_by_quality(&mut matches);
    let order: Vec<f32> = matches.iter().map(|m| m.ssd).collect();
    assert_eq!(order, vec![0.5, 1.0, 3.0]);

    let mut m = FeatureMatch::new(Feature::new(WHITE, 1, 2), Feature::new(BLACK, 3, 4), 0.0);
    m.flip_direction();
    assert_eq!((m.a.x, m.b.x), (3, 1));
}
