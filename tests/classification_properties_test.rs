//! Property tests for identity scoring, pose decomposition and classification


use proctor_monitor::{
    classifier::{classify_delta, HeadPoseClassifier, HeadPosition, PoseThresholds},
    encoding::{encode, Landmark},
    identity::{ReferenceSet, Verdict},
    pose_estimation::{PoseAngles, PoseEstimator},
};
use proptest::prelude::*;
use test_helpers::rotation_from_angles;

fn landmarks_strategy(len: usize) -> impl Strategy<Value = Vec<Landmark>> {
    prop::collection::vec((0.0f32..640.0, 0.0f32..480.0), len)
        .prop_map(|points| points.into_iter().map(|(x, y)| Landmark::new(x, y)).collect())
}

fn angle() -> impl Strategy<Value = f64> {
    -60.0f64..60.0
}

#[test]
fn test_baseline_scenarios() {
    let thresholds = PoseThresholds::default();
    let cases = [
        (PoseAngles::new(20.0, 0.0, 0.0), HeadPosition::TurnedRight),
        (PoseAngles::new(-20.0, 0.0, 0.0), HeadPosition::TurnedLeft),
        (PoseAngles::new(0.0, -25.0, 0.0), HeadPosition::LookingUp),
        (PoseAngles::new(0.0, 25.0, 0.0), HeadPosition::LookingDown),
        (PoseAngles::new(0.0, 0.0, -16.0), HeadPosition::TiltedLeft),
        (PoseAngles::new(0.0, 0.0, 16.0), HeadPosition::TiltedRight),
        (PoseAngles::new(5.0, 5.0, 5.0), HeadPosition::Centered),
        (PoseAngles::new(15.0, 20.0, -15.0), HeadPosition::Centered),
    ];

    for (delta, expected) in cases {
        assert_eq!(classify_delta(&delta, &thresholds), expected, "delta {delta}");
    }
}

#[test]
fn test_turn_wins_over_tilt_and_pitch() {
    let position = classify_delta(&PoseAngles::new(20.0, 25.0, 20.0), &PoseThresholds::default());
    assert_eq!(position, HeadPosition::TurnedRight);
}

#[test]
fn test_custom_thresholds() {
    let strict = PoseThresholds {
        turn_deg: 5.0,
        pitch_deg: 5.0,
    };
    assert_eq!(classify_delta(&PoseAngles::new(0.0, 6.0, 0.0), &strict), HeadPosition::LookingDown);
    assert_eq!(
        classify_delta(&PoseAngles::new(0.0, 6.0, 0.0), &PoseThresholds::default()),
        HeadPosition::Centered
    );
}

proptest! {
    #[test]
    fn prop_identical_encodings_match(landmarks in landmarks_strategy(68)) {
        let encoding = encode(&landmarks).unwrap();
        let mut references = ReferenceSet::new(0.6);
        references.enroll(encoding.clone());

        let score = references.evaluate(&encoding);
        prop_assert_eq!(score.distance, 0.0);
        prop_assert_eq!(score.verdict, Verdict::Match);
    }

    #[test]
    fn prop_empty_reference_set_is_suspicious(landmarks in landmarks_strategy(68), threshold in 0.0f64..1e6) {
        let references = ReferenceSet::new(threshold);
        let score = references.evaluate(&encode(&landmarks).unwrap());
        prop_assert!(score.distance.is_infinite());
        prop_assert_eq!(score.verdict, Verdict::Suspicious);
    }

    #[test]
    fn prop_enrollment_order_irrelevant(
        samples in prop::collection::vec(landmarks_strategy(20), 1..6),
        live in landmarks_strategy(20),
    ) {
        let encodings: Vec<_> = samples.iter().map(|s| encode(s).unwrap()).collect();
        let live = encode(&live).unwrap();

        let mut forward = ReferenceSet::new(0.6);
        let mut backward = ReferenceSet::new(0.6);
        for encoding in &encodings {
            forward.enroll(encoding.clone());
        }
        for encoding in encodings.iter().rev() {
            backward.enroll(encoding.clone());
        }

        prop_assert_eq!(forward.score(&live), backward.score(&live));
    }

    #[test]
    fn prop_score_is_minimum_distance(
        samples in prop::collection::vec(landmarks_strategy(12), 1..5),
        live in landmarks_strategy(12),
    ) {
        let live = encode(&live).unwrap();
        let mut references = ReferenceSet::new(0.6);
        let mut best = f64::INFINITY;
        for sample in &samples {
            let encoding = encode(sample).unwrap();
            best = best.min(encoding.distance(&live));
            references.enroll(encoding);
        }
        prop_assert_eq!(references.score(&live), best);
    }

    #[test]
    fn prop_euler_decomposition_recovers_angles(yaw in angle(), pitch in -80.0f64..80.0, roll in angle()) {
        let rotation = rotation_from_angles(yaw, pitch, roll);
        let first = PoseEstimator::rotation_matrix_to_euler(&rotation);
        let second = PoseEstimator::rotation_matrix_to_euler(&rotation);

        prop_assert_eq!(first, second);
        prop_assert!((first.yaw - yaw).abs() < 1e-6);
        prop_assert!((first.pitch - pitch).abs() < 1e-6);
        prop_assert!((first.roll - roll).abs() < 1e-6);
    }

    #[test]
    fn prop_baseline_set_once(observations in prop::collection::vec((angle(), angle(), angle()), 1..30)) {
        let mut classifier = HeadPoseClassifier::default();
        let (yaw, pitch, roll) = observations[0];
        let first = PoseAngles::new(yaw, pitch, roll);

        let calibrating = classifier.observe(first);
        prop_assert_eq!(calibrating.position, HeadPosition::Centered);

        for &(yaw, pitch, roll) in &observations[1..] {
            let pose = PoseAngles::new(yaw, pitch, roll);
            let classification = classifier.observe(pose);
            prop_assert_eq!(classifier.baseline(), Some(first));
            prop_assert_eq!(
                classification.position,
                classify_delta(&pose.delta_from(&first), classifier.thresholds())
            );
        }
    }

    #[test]
    fn prop_large_yaw_always_turns(yaw_delta in 15.001f64..90.0, pitch in angle(), roll in angle(), left in any::<bool>()) {
        let yaw = if left { -yaw_delta } else { yaw_delta };
        let position = classify_delta(&PoseAngles::new(yaw, pitch, roll), &PoseThresholds::default());
        let expected = if left { HeadPosition::TurnedLeft } else { HeadPosition::TurnedRight };
        prop_assert_eq!(position, expected);
    }
}
