//! Head pose recovery through the `OpenCV` solver and baseline classification


use nalgebra::Vector3;
use proctor_monitor::{
    classifier::{HeadPoseClassifier, HeadPosition},
    constants::{FACE_MODEL_POINTS, NUM_FACIAL_LANDMARKS, POSE_LANDMARK_INDICES},
    encoding::Landmark,
    pose_estimation::{CameraIntrinsics, PoseAngles, PoseEstimator},
    vision::pnp::OpenCvPnpSolver,
    Result,
};
use test_helpers::rotation_from_angles;

/// 68 landmarks whose pose correspondences are the projected face model
fn synthetic_landmarks(yaw: f64, pitch: f64, roll: f64) -> Vec<Landmark> {
    let intrinsics = CameraIntrinsics::default();
    let rotation = rotation_from_angles(yaw, pitch, roll);
    let translation = Vector3::new(0.0, 0.0, 2000.0);

    let mut landmarks = vec![Landmark::new(320.0, 240.0); NUM_FACIAL_LANDMARKS];
    for (&index, &[x, y, z]) in POSE_LANDMARK_INDICES.iter().zip(FACE_MODEL_POINTS.iter()) {
        let p = rotation * Vector3::new(x, y, z) + translation;
        landmarks[index] = Landmark::new(
            (intrinsics.focal_length_x * p.x / p.z + intrinsics.principal_x) as f32,
            (intrinsics.focal_length_y * p.y / p.z + intrinsics.principal_y) as f32,
        );
    }
    landmarks
}

fn assert_close(actual: PoseAngles, expected: PoseAngles) {
    let tolerance = 0.5;
    assert!(
        (actual.yaw - expected.yaw).abs() < tolerance
            && (actual.pitch - expected.pitch).abs() < tolerance
            && (actual.roll - expected.roll).abs() < tolerance,
        "recovered {actual}, expected {expected}"
    );
}

#[test]
fn test_recovers_frontal_pose() -> Result<()> {
    let estimator = PoseEstimator::new(Box::new(OpenCvPnpSolver::default()));
    let pose = estimator.estimate_from_landmarks(&synthetic_landmarks(0.0, 0.0, 0.0))?;
    assert_close(pose, PoseAngles::default());
    Ok(())
}

#[test]
fn test_recovers_combined_rotation() -> Result<()> {
    let estimator = PoseEstimator::new(Box::new(OpenCvPnpSolver::default()));
    let pose = estimator.estimate_from_landmarks(&synthetic_landmarks(20.0, -10.0, 5.0))?;
    assert_close(pose, PoseAngles::new(20.0, -10.0, 5.0));
    Ok(())
}

#[test]
fn test_estimation_is_deterministic() -> Result<()> {
    let estimator = PoseEstimator::new(Box::new(OpenCvPnpSolver::default()));
    let landmarks = synthetic_landmarks(-12.0, 8.0, 3.0);
    assert_eq!(
        estimator.estimate_from_landmarks(&landmarks)?,
        estimator.estimate_from_landmarks(&landmarks)?
    );
    Ok(())
}

#[test]
fn test_turning_away_from_calibrated_baseline() -> Result<()> {
    let estimator = PoseEstimator::new(Box::new(OpenCvPnpSolver::default()));
    let mut classifier = HeadPoseClassifier::default();

    let sequence = [
        ((3.0, 2.0, 1.0), HeadPosition::Centered),
        ((8.0, 6.0, -4.0), HeadPosition::Centered),
        ((30.0, 2.0, 1.0), HeadPosition::TurnedRight),
        ((-25.0, 2.0, 1.0), HeadPosition::TurnedLeft),
        ((3.0, 30.0, 1.0), HeadPosition::LookingDown),
    ];

    for ((yaw, pitch, roll), expected) in sequence {
        let pose = estimator.estimate_from_landmarks(&synthetic_landmarks(yaw, pitch, roll))?;
        assert_eq!(classifier.observe(pose).position, expected, "pose {pose}");
    }
    Ok(())
}
