//! Capabilities the monitor consumes from computer-vision libraries.
//!
//! Each capability is a narrow trait so the session loop can run against any
//! detector, landmark model, solver or frame source. The submodules bind them to
//! ONNX Runtime and `OpenCV`.

/// Frame acquisition from cameras and video files
pub mod camera;

/// `highgui` window output for annotated frames
pub mod display;

/// SCRFD face detector
pub mod face_detection;

/// 68-point facial landmark detector
pub mod mark_detection;

/// Perspective-n-point solving with `calib3d`
pub mod pnp;

use crate::{encoding::Landmark, pose_estimation::CameraIntrinsics, Result};
use nalgebra::{Matrix3, Point2, Point3, Vector3};
use opencv::core::{Mat, Rect};

/// A face found in a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceRegion {
    /// Bounding box in frame pixels
    pub bbox: Rect,
    /// Detector confidence
    pub score: f32,
}

/// Finds face regions in a frame
pub trait FaceDetect {
    /// Detect every face in `frame`, most confident first
    ///
    /// # Errors
    ///
    /// Returns an error if the detector cannot process the frame
    fn detect_faces(&mut self, frame: &Mat) -> Result<Vec<FaceRegion>>;
}

/// Extracts dense facial landmarks for a detected face
///
/// Providers must deliver landmarks in frame coordinates, indexed so that
/// {1, 8, 36, 45, 48, 54} are nose tip, chin, left eye corner, right eye corner,
/// left mouth corner and right mouth corner, or the pose landmark table must be
/// remapped in the configuration.
pub trait LandmarkExtract {
    /// Landmarks for `region`, or `None` when none could be found
    ///
    /// # Errors
    ///
    /// Returns an error if the landmark model fails
    fn extract_landmarks(&mut self, frame: &Mat, region: &FaceRegion) -> Result<Option<Vec<Landmark>>>;
}

/// Camera-relative rotation and translation of the head model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationEstimate {
    /// Rotation matrix
    pub rotation: Matrix3<f64>,
    /// Translation in model units
    pub translation: Vector3<f64>,
}

/// Solves the perspective-n-point problem
pub trait PnpSolver: Send {
    /// Recover the model pose from 3D/2D correspondences
    ///
    /// Returns `Ok(None)` when the solver does not converge.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying library call fails
    fn solve(
        &self,
        model_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        intrinsics: &CameraIntrinsics,
    ) -> Result<Option<RotationEstimate>>;
}

/// Sequential source of video frames
pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be read
    fn next_frame(&mut self) -> Result<Option<Mat>>;

    /// Release the underlying device
    fn release(&mut self);
}
