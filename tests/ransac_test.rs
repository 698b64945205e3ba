use homography_composite::AlignError;
use homography_composite::detected_points::{Feature, FeatureMatch};
use homography_composite::optimization::ransac::{
    RansacConfig, classify_matches, count_consistent, verified_matches,
};
use image::Rgb;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const GRAY: Rgb<f32> = Rgb([0.5, 0.5, 0.5]);

/// 40 matches shifted by (7, -3) followed by 10 random ones.
fn planted_matches(rng: &mut ChaCha8Rng) -> Vec<FeatureMatch> {
    let mut matches = Vec::new();
    for _ in 0..40 {
        let x = rng.random_range(10..190);
        let y = rng.random_range(10..190);
        matches.push(FeatureMatch::new(
            Feature::new(GRAY, x, y),
            Feature::new(GRAY, x + 7, y - 3),
            0.0,
        ));
    }
    for _ in 0..10 {
        let a = Feature::new(GRAY, rng.random_range(0..200), rng.random_range(0..200));
        let b = Feature::new(GRAY, rng.random_range(0..200), rng.random_range(0..200));
        matches.push(FeatureMatch::new(a, b, 1.0));
    }
    matches
}

#[test]
fn test_planted_consensus_over_seeds() {
    for seed in 0..5u64 {
        let mut data_rng = ChaCha8Rng::seed_from_u64(100 + seed);
        let mut matches = planted_matches(&mut data_rng);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let consensus = classify_matches(&mut matches, &RansacConfig::default(), &mut rng).unwrap();

        let inliers_verified = matches[..40].iter().filter(|m| m.verified_match).count();
        let outliers_verified = matches[40..].iter().filter(|m| m.verified_match).count();
        assert!(inliers_verified >= 30, "seed {}: {} inliers verified", seed, inliers_verified);
        assert!(outliers_verified <= 2, "seed {}: {} outliers verified", seed, outliers_verified);
        assert_eq!(consensus.inliers, inliers_verified + outliers_verified);
    }
}

#[test]
fn test_flags_come_from_final_model() {
    let mut data_rng = ChaCha8Rng::seed_from_u64(7);
    let mut matches = planted_matches(&mut data_rng);
    let config = RansacConfig::default();
    let consensus = classify_matches(&mut matches, &config, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
    assert_eq!(
        count_consistent(&matches, &consensus.homography, config.threshold),
        verified_matches(&matches).len()
    );
}

#[test]
fn test_same_seed_same_result() {
    let mut data_rng = ChaCha8Rng::seed_from_u64(3);
    let base = planted_matches(&mut data_rng);
    let mut first = base.clone();
    let mut second = base;
    let config = RansacConfig {
        trials: 50,
        ..Default::default()
    };
    let c1 = classify_matches(&mut first, &config, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
    let c2 = classify_matches(&mut second, &config, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
    assert_eq!(c1.homography, c2.homography);
    assert_eq!(first, second);
}

#[test]
fn test_empty_and_short_lists() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut empty: Vec<FeatureMatch> = Vec::new();
    assert!(matches!(
        classify_matches(&mut empty, &RansacConfig::default(), &mut rng),
        Err(AlignError::NotEnoughCorrespondences { got: 0, .. })
    ));

    let f = Feature::new(GRAY, 1, 1);
    let mut three = vec![FeatureMatch::new(f, f, 0.0); 3];
    assert!(classify_matches(&mut three, &RansacConfig::default(), &mut rng).is_err());
}

#[test]
fn test_all_degenerate_samples() {
    // every sample repeats one point, so no trial produces a model
    let f = Feature::new(GRAY, 5, 5);
    let mut matches = vec![FeatureMatch::new(f, f, 0.0); 6];
    let config = RansacConfig {
        trials: 20,
        ..Default::default()
    };
    let result = classify_matches(&mut matches, &config, &mut ChaCha8Rng::seed_from_u64(0));
    assert!(matches!(result, Err(AlignError::DegenerateGeometry(_))));
}
