//! Configuration management for the proctoring monitor

use crate::{
    classifier::PoseThresholds,
    constants::{
        DEFAULT_BOX_EXPANSION, DEFAULT_CAPTURE_INTERVAL_MS, DEFAULT_ENROLLMENT_SAMPLES, DEFAULT_MATCH_THRESHOLD,
        FACE_MODEL_POINTS, NUM_POSE_POINTS, POSE_LANDMARK_INDICES,
    },
    pose_estimation::CameraIntrinsics,
    vision::display::DEFAULT_WINDOW_TITLE,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration
    pub models: ModelConfig,

    /// Face detection configuration
    pub face_detection: FaceDetectionConfig,

    /// Identity matching configuration
    pub identity: IdentityConfig,

    /// Pose estimation configuration
    pub pose: PoseConfig,

    /// Head position thresholds
    pub classifier: PoseThresholds,

    /// Reference capture and enrollment
    pub enrollment: EnrollmentConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to face detection ONNX model
    pub face_detector: PathBuf,

    /// Path to facial landmarks ONNX model
    pub face_landmarks: PathBuf,
}

/// Face detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,

    /// Maximum number of faces to detect
    pub max_faces: usize,

    /// Face region expansion factor
    pub bbox_expansion: f32,
}

/// Identity matching parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Largest distance accepted as the enrolled person
    pub match_threshold: f64,
}

/// Pose estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Camera intrinsics
    pub intrinsics: CameraIntrinsics,

    /// 3D face model: nose tip, chin, eye corners, mouth corners
    pub model_points: [[f64; 3]; NUM_POSE_POINTS],

    /// Landmark index of each model point
    pub landmark_indices: [usize; NUM_POSE_POINTS],
}

/// Reference capture and enrollment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Folder holding the reference images
    pub reference_folder: PathBuf,

    /// Capture fresh references from the camera before enrolling
    pub capture: bool,

    /// Number of reference images to capture
    pub samples: usize,

    /// Pause between captures in milliseconds
    pub capture_interval_ms: u64,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the annotated stream in a window
    pub show_window: bool,

    /// Window title
    pub window_title: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_landmarks: PathBuf::from("assets/face_landmarks.onnx"),
        }
    }
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            iou_threshold: 0.4,
            max_faces: 10,
            bbox_expansion: DEFAULT_BOX_EXPANSION,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            intrinsics: CameraIntrinsics::default(),
            model_points: FACE_MODEL_POINTS,
            landmark_indices: POSE_LANDMARK_INDICES,
        }
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            reference_folder: PathBuf::from("reference_images"),
            capture: false,
            samples: DEFAULT_ENROLLMENT_SAMPLES,
            capture_interval_ms: DEFAULT_CAPTURE_INTERVAL_MS,
        }
    }
}

impl EnrollmentConfig {
    /// Pause between captures
    #[must_use]
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_window: true,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges. Model files are checked when they are loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the first invalid value
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.face_detection.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.face_detection.iou_threshold) {
            return Err(Error::ConfigError("IOU threshold must be between 0.0 and 1.0".to_string()));
        }
        if self.face_detection.max_faces == 0 {
            return Err(Error::ConfigError("Maximum faces must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.face_detection.bbox_expansion) {
            return Err(Error::ConfigError("Box expansion must be between 0.0 and 1.0".to_string()));
        }

        if !(self.identity.match_threshold.is_finite() && self.identity.match_threshold >= 0.0) {
            return Err(Error::ConfigError("Match threshold must be a non-negative number".to_string()));
        }

        let intrinsics = &self.pose.intrinsics;
        if !(intrinsics.focal_length_x > 0.0 && intrinsics.focal_length_y > 0.0) {
            return Err(Error::ConfigError("Focal lengths must be positive".to_string()));
        }
        let distinct: HashSet<usize> = self.pose.landmark_indices.iter().copied().collect();
        if distinct.len() != self.pose.landmark_indices.len() {
            return Err(Error::ConfigError(format!(
                "Landmark index table must hold distinct indices, got {:?}",
                self.pose.landmark_indices
            )));
        }

        let thresholds = &self.classifier;
        if !(thresholds.turn_deg > 0.0 && thresholds.pitch_deg > 0.0) {
            return Err(Error::ConfigError("Pose thresholds must be positive".to_string()));
        }

        if self.enrollment.samples == 0 {
            return Err(Error::ConfigError("Enrollment samples must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Proctoring Monitor Configuration

# Model paths
models:
  face_detector: "assets/face_detector.onnx"
  face_landmarks: "assets/face_landmarks.onnx"

# Face detection parameters
face_detection:
  confidence_threshold: 0.5
  iou_threshold: 0.4
  max_faces: 10
  bbox_expansion: 0.2

# Identity matching
identity:
  match_threshold: 0.6

# Pose estimation
pose:
  intrinsics:
    focal_length_x: 640.0
    focal_length_y: 640.0
    principal_x: 320.0
    principal_y: 240.0
  model_points:
    - [0.0, 0.0, 0.0]
    - [0.0, -330.0, -65.0]
    - [-225.0, 170.0, -135.0]
    - [225.0, 170.0, -135.0]
    - [-150.0, -150.0, -125.0]
    - [150.0, -150.0, -125.0]
  landmark_indices: [1, 8, 36, 45, 48, 54]

# Head position thresholds (degrees)
classifier:
  turn_deg: 15.0
  pitch_deg: 20.0

# Reference images
enrollment:
  reference_folder: "reference_images"
  capture: false
  samples: 5
  capture_interval_ms: 1000

# Display settings
display:
  show_window: true
  window_title: "Face Detection and Head Pose"
"#;
