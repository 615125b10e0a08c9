//! Per-session monitoring state and the per-face status it produces.

use crate::{
    classifier::{HeadPoseClassifier, HeadPosition, PoseThresholds},
    encoding::FaceEncoding,
    identity::{IdentityScore, ReferenceSet, Verdict},
    pose_estimation::PoseAngles,
};
use opencv::core::Rect;

/// Status of one detected face in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FaceStatusRecord {
    /// Face bounding box in frame pixels
    pub region: Rect,
    /// Identity decision
    pub verdict: Verdict,
    /// Minimum distance to the enrolled references
    pub distance: f64,
    /// Head position, absent when the pose could not be estimated
    pub head_position: Option<HeadPosition>,
    /// Raw pose angles behind `head_position`
    pub pose: Option<PoseAngles>,
}

impl FaceStatusRecord {
    /// Whether this face warrants attention from a proctor
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.verdict == Verdict::Suspicious || self.head_position.is_some_and(|p| !p.is_attentive())
    }
}

/// Enrolled identity plus calibrated baseline for one proctoring session
#[derive(Debug, Clone)]
pub struct MonitorSession {
    references: ReferenceSet,
    classifier: HeadPoseClassifier,
}

impl MonitorSession {
    /// Create a session with no references and no baseline
    #[must_use]
    pub fn new(match_threshold: f64, thresholds: PoseThresholds) -> Self {
        Self {
            references: ReferenceSet::new(match_threshold),
            classifier: HeadPoseClassifier::new(thresholds),
        }
    }

    /// Enrolled references
    #[must_use]
    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    /// Mutable access for enrollment
    pub(crate) fn references_mut(&mut self) -> &mut ReferenceSet {
        &mut self.references
    }

    /// Baseline classifier
    #[must_use]
    pub fn classifier(&self) -> &HeadPoseClassifier {
        &self.classifier
    }

    /// Score identity and classify pose for one face.
    ///
    /// Identity is scored regardless of `pose`; a missing pose leaves the baseline
    /// untouched and yields no head position.
    pub fn assess(&mut self, region: Rect, encoding: &FaceEncoding, pose: Option<PoseAngles>) -> FaceStatusRecord {
        let IdentityScore { distance, verdict } = self.references.evaluate(encoding);
        let head_position = pose.map(|angles| self.classifier.observe(angles).position);

        FaceStatusRecord {
            region,
            verdict,
            distance,
            head_position,
            pose,
        }
    }
}
