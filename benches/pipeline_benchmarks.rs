//! Benchmarks for the per-face monitoring pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{Rotation3, Vector3};
use proctor_monitor::{
    classifier::{HeadPoseClassifier, PoseThresholds},
    constants::{FACE_MODEL_POINTS, NUM_FACIAL_LANDMARKS, POSE_LANDMARK_INDICES},
    encoding::{encode, Landmark},
    identity::ReferenceSet,
    pose_estimation::{CameraIntrinsics, PoseAngles, PoseEstimator},
    utils::expand_to_square,
    vision::pnp::OpenCvPnpSolver,
};
use opencv::core::Rect;

fn ring_landmarks(radius: f32) -> Vec<Landmark> {
    (0..NUM_FACIAL_LANDMARKS)
        .map(|i| {
            let angle = (i as f32) * 2.0 * std::f32::consts::PI / NUM_FACIAL_LANDMARKS as f32;
            Landmark::new(320.0 + radius * angle.cos(), 240.0 + radius * angle.sin())
        })
        .collect()
}

fn posed_landmarks() -> Vec<Landmark> {
    let intrinsics = CameraIntrinsics::default();
    let rotation = Rotation3::from_euler_angles(0.05, -0.1, 0.2);
    let mut landmarks = ring_landmarks(100.0);
    for (&index, &[x, y, z]) in POSE_LANDMARK_INDICES.iter().zip(FACE_MODEL_POINTS.iter()) {
        let p = rotation * Vector3::new(x, y, z) + Vector3::new(0.0, 0.0, 2000.0);
        landmarks[index] = Landmark::new(
            (intrinsics.focal_length_x * p.x / p.z + intrinsics.principal_x) as f32,
            (intrinsics.focal_length_y * p.y / p.z + intrinsics.principal_y) as f32,
        );
    }
    landmarks
}

fn benchmark_identity(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity");
    let live = encode(&ring_landmarks(100.0)).expect("non-empty landmarks");

    group.bench_function("encode_68_landmarks", |b| {
        let landmarks = ring_landmarks(100.0);
        b.iter(|| black_box(encode(black_box(&landmarks))));
    });

    for references in [1, 5, 20] {
        let mut set = ReferenceSet::new(0.6);
        for i in 0..references {
            set.enroll(encode(&ring_landmarks(90.0 + i as f32)).expect("non-empty landmarks"));
        }
        group.bench_with_input(BenchmarkId::new("score", references), &set, |b, set| {
            b.iter(|| black_box(set.evaluate(black_box(&live))));
        });
    }

    group.finish();
}

fn benchmark_pose(c: &mut Criterion) {
    let mut group = c.benchmark_group("pose_estimation");
    let estimator = PoseEstimator::new(Box::new(OpenCvPnpSolver::default()));
    let landmarks = posed_landmarks();

    group.bench_function("estimate_from_68_landmarks", |b| {
        b.iter(|| black_box(estimator.estimate_from_landmarks(black_box(&landmarks))));
    });

    let rotation = Rotation3::from_euler_angles(0.1, -0.2, 0.3).into_inner();
    group.bench_function("euler_angle_conversion", |b| {
        b.iter(|| black_box(PoseEstimator::rotation_matrix_to_euler(black_box(&rotation))));
    });

    group.finish();
}

fn benchmark_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier");

    group.bench_function("observe_calibrated", |b| {
        let mut classifier = HeadPoseClassifier::new(PoseThresholds::default());
        classifier.observe(PoseAngles::default());
        let pose = PoseAngles::new(12.0, -22.0, 4.0);
        b.iter(|| black_box(classifier.observe(black_box(pose))));
    });

    group.bench_function("expand_to_square", |b| {
        let bbox = Rect::new(200, 120, 180, 220);
        b.iter(|| black_box(expand_to_square(black_box(bbox), 640, 480, 0.2)));
    });

    group.finish();
}

criterion_group!(benches, benchmark_identity, benchmark_pose, benchmark_classifier);
criterion_main!(benches);
