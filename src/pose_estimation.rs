use crate::{
    constants::{
        DEFAULT_FOCAL_LENGTH, DEFAULT_PRINCIPAL_POINT, FACE_MODEL_POINTS, NUM_POSE_POINTS, POSE_LANDMARK_INDICES,
    },
    encoding::Landmark,
    vision::PnpSolver,
    Error, Result,
};
use nalgebra::{Matrix3, Point2, Point3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Head orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseAngles {
    /// Rotation about the vertical axis
    pub yaw: f64,
    /// Rotation about the lateral axis
    pub pitch: f64,
    /// Rotation about the viewing axis
    pub roll: f64,
}

impl PoseAngles {
    /// Create a new angle triple
    #[must_use]
    pub const fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Per-axis difference `self - baseline`
    #[must_use]
    pub fn delta_from(&self, baseline: &Self) -> Self {
        Self {
            yaw: self.yaw - baseline.yaw,
            pitch: self.pitch - baseline.pitch,
            roll: self.roll - baseline.roll,
        }
    }

    fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

impl fmt::Display for PoseAngles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Yaw: {:.1} Pitch: {:.1} Roll: {:.1}", self.yaw, self.pitch, self.roll)
    }
}

/// Pinhole camera approximation, no lens distortion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraIntrinsics {
    /// Focal length along x, in pixels
    pub focal_length_x: f64,
    /// Focal length along y, in pixels
    pub focal_length_y: f64,
    /// Principal point x
    pub principal_x: f64,
    /// Principal point y
    pub principal_y: f64,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            focal_length_x: DEFAULT_FOCAL_LENGTH,
            focal_length_y: DEFAULT_FOCAL_LENGTH,
            principal_x: DEFAULT_PRINCIPAL_POINT.0,
            principal_y: DEFAULT_PRINCIPAL_POINT.1,
        }
    }
}

impl CameraIntrinsics {
    /// The 3x3 camera matrix
    #[must_use]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focal_length_x,
            0.0,
            self.principal_x,
            0.0,
            self.focal_length_y,
            self.principal_y,
            0.0,
            0.0,
            1.0,
        )
    }
}

/// Head pose estimator from six landmark correspondences
pub struct PoseEstimator {
    model_points: [Point3<f64>; NUM_POSE_POINTS],
    landmark_indices: [usize; NUM_POSE_POINTS],
    intrinsics: CameraIntrinsics,
    solver: Box<dyn PnpSolver>,
}

impl PoseEstimator {
    /// Create an estimator with the default face model, intrinsics and 68-point indices
    #[must_use]
    pub fn new(solver: Box<dyn PnpSolver>) -> Self {
        Self::with_model(solver, FACE_MODEL_POINTS, POSE_LANDMARK_INDICES, CameraIntrinsics::default())
    }

    /// Create an estimator with an explicit face model, landmark index table and camera
    #[must_use]
    pub fn with_model(
        solver: Box<dyn PnpSolver>,
        model_points: [[f64; 3]; NUM_POSE_POINTS],
        landmark_indices: [usize; NUM_POSE_POINTS],
        intrinsics: CameraIntrinsics,
    ) -> Self {
        log::info!(
            "Initializing PoseEstimator (f={:.0}, c=({:.0}, {:.0}), landmarks {:?})",
            intrinsics.focal_length_x,
            intrinsics.principal_x,
            intrinsics.principal_y,
            landmark_indices
        );
        Self {
            model_points: model_points.map(|[x, y, z]| Point3::new(x, y, z)),
            landmark_indices,
            intrinsics,
            solver,
        }
    }

    /// Camera intrinsics used for solving
    #[must_use]
    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    /// Pick the six pose correspondences out of a dense landmark set
    ///
    /// # Errors
    ///
    /// Returns an error if the landmark set does not cover every index of the table
    pub fn select_pose_points(&self, landmarks: &[Landmark]) -> Result<[Point2<f64>; NUM_POSE_POINTS]> {
        let mut points = [Point2::origin(); NUM_POSE_POINTS];
        for (point, &index) in points.iter_mut().zip(&self.landmark_indices) {
            let landmark = landmarks.get(index).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Landmark index {index} out of range for {} landmarks",
                    landmarks.len()
                ))
            })?;
            *point = Point2::new(f64::from(landmark.x), f64::from(landmark.y));
        }
        Ok(points)
    }

    /// Estimate head pose from the six canonical image points
    ///
    /// Points are ordered nose tip, chin, left eye outer corner, right eye outer corner,
    /// left mouth corner, right mouth corner.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The solver fails or does not converge
    /// - The recovered rotation is not finite
    pub fn estimate(&self, image_points: &[Point2<f64>; NUM_POSE_POINTS]) -> Result<PoseAngles> {
        let estimate = self
            .solver
            .solve(&self.model_points, image_points, &self.intrinsics)?
            .ok_or_else(|| Error::PoseEstimation("PnP solver did not converge".to_string()))?;

        let angles = Self::rotation_matrix_to_euler(&estimate.rotation);
        if !angles.is_finite() {
            return Err(Error::PoseEstimation(format!("Non-finite pose recovered: {angles}")));
        }
        Ok(angles)
    }

    /// Select the pose correspondences from `landmarks` and estimate head pose
    ///
    /// # Errors
    ///
    /// Returns an error if point selection or estimation fails
    pub fn estimate_from_landmarks(&self, landmarks: &[Landmark]) -> Result<PoseAngles> {
        let image_points = self.select_pose_points(landmarks)?;
        self.estimate(&image_points)
    }

    /// Convert a rotation matrix to yaw/pitch/roll in degrees
    ///
    /// yaw = atan2(R10, R00), pitch = atan2(-R20, sqrt(R21² + R22²)), roll = atan2(R21, R22).
    /// The head position thresholds assume exactly this decomposition.
    #[must_use]
    pub fn rotation_matrix_to_euler(rotation: &Matrix3<f64>) -> PoseAngles {
        let r00 = rotation[(0, 0)];
        let r10 = rotation[(1, 0)];
        let r20 = rotation[(2, 0)];
        let r21 = rotation[(2, 1)];
        let r22 = rotation[(2, 2)];

        let yaw = r10.atan2(r00);
        let pitch = (-r20).atan2(r21.hypot(r22));
        let roll = r21.atan2(r22);

        PoseAngles::new(yaw.to_degrees(), pitch.to_degrees(), roll.to_degrees())
    }
}
