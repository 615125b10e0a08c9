//! Constants used throughout the application

/// Number of facial landmarks produced by the bundled landmark model
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Minimum landmark count a provider must deliver for pose estimation
pub const MIN_POSE_LANDMARKS: usize = 49;

/// Number of correspondences used for head pose estimation
pub const NUM_POSE_POINTS: usize = 6;

/// Landmark indices of nose tip, chin, left eye outer corner, right eye outer corner,
/// left mouth corner and right mouth corner in the 68-point layout
pub const POSE_LANDMARK_INDICES: [usize; NUM_POSE_POINTS] = [1, 8, 36, 45, 48, 54];

/// Anthropometric 3D face model, same order as [`POSE_LANDMARK_INDICES`]
pub const FACE_MODEL_POINTS: [[f64; 3]; NUM_POSE_POINTS] = [
    [0.0, 0.0, 0.0],
    [0.0, -330.0, -65.0],
    [-225.0, 170.0, -135.0],
    [225.0, 170.0, -135.0],
    [-150.0, -150.0, -125.0],
    [150.0, -150.0, -125.0],
];

/// Approximate camera intrinsics for a 640x480 sensor
pub const DEFAULT_FOCAL_LENGTH: f64 = 640.0;
pub const DEFAULT_PRINCIPAL_POINT: (f64, f64) = (320.0, 240.0);

/// Maximum identity distance still accepted as the enrolled person
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Yaw and roll deviation from baseline (degrees) before a turn or tilt is reported
pub const DEFAULT_TURN_THRESHOLD_DEG: f64 = 15.0;

/// Pitch deviation from baseline (degrees) before looking up/down is reported
pub const DEFAULT_PITCH_THRESHOLD_DEG: f64 = 20.0;

/// Reference samples captured during enrollment
pub const DEFAULT_ENROLLMENT_SAMPLES: usize = 5;

/// Pause between reference captures
pub const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 1000;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Fraction of the face box added on every side before landmark detection
pub const DEFAULT_BOX_EXPANSION: f32 = 0.2;
