//! Landmark encoder: turns the landmark geometry of one face into a comparable matrix.
//!
//! The encoding is the raw landmark geometry, one row per point in provider order and
//! one column per coordinate. No learned embedding is involved, so two encodings are
//! only comparable when they come from the same landmark provider.

use ndarray::Array2;

/// A facial landmark in frame pixel coordinates, with optional depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
    /// Relative depth, when the provider estimates one
    pub z: Option<f32>,
}

impl Landmark {
    /// Create a 2D landmark
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: None }
    }

    /// Create a 3D landmark
    #[must_use]
    pub const fn with_depth(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z: Some(z) }
    }
}

/// Landmark geometry of one face as a `points × dims` matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEncoding {
    points: Array2<f64>,
}

impl FaceEncoding {
    /// Build an encoding from landmarks, preserving their order.
    ///
    /// Depth is kept only when every landmark carries it. Returns `None` for an empty
    /// landmark set.
    #[must_use]
    pub fn from_landmarks(landmarks: &[Landmark]) -> Option<Self> {
        if landmarks.is_empty() {
            return None;
        }

        let with_depth = landmarks.iter().all(|lm| lm.z.is_some());
        let dims = if with_depth { 3 } else { 2 };

        let mut points = Array2::zeros((landmarks.len(), dims));
        for (mut row, lm) in points.rows_mut().into_iter().zip(landmarks) {
            row[0] = f64::from(lm.x);
            row[1] = f64::from(lm.y);
            if let Some(z) = lm.z.filter(|_| with_depth) {
                row[2] = f64::from(z);
            }
        }

        Some(Self { points })
    }

    /// Number of encoded points
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    /// Whether the encoding holds no points
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// Coordinates per point (2 or 3)
    #[must_use]
    pub fn dims(&self) -> usize {
        self.points.ncols()
    }

    /// Underlying matrix
    #[must_use]
    pub fn as_array(&self) -> &Array2<f64> {
        &self.points
    }

    /// Euclidean distance between corresponding points of two encodings.
    ///
    /// This is the Frobenius norm of the element-wise difference. Encodings of
    /// different shape are maximally distant (`f64::INFINITY`).
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        if self.points.dim() != other.points.dim() {
            return f64::INFINITY;
        }

        self.points
            .iter()
            .zip(other.points.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Encode the landmarks of one detected face.
///
/// Returns `None` when no landmarks are available for the face.
#[must_use]
pub fn encode(landmarks: &[Landmark]) -> Option<FaceEncoding> {
    FaceEncoding::from_landmarks(landmarks)
}
