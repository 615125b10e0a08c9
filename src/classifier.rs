//! Baseline calibration and head position classification.
//!
//! The first successful pose of a session becomes the baseline. Every later pose is
//! compared against it and mapped to a [`HeadPosition`] with priority-ordered
//! thresholds: yaw first, then roll, then pitch. Each frame is classified on its own,
//! so labels may flicker when a delta sits on a threshold.

use crate::{
    constants::{DEFAULT_PITCH_THRESHOLD_DEG, DEFAULT_TURN_THRESHOLD_DEG},
    pose_estimation::PoseAngles,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete head position relative to the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadPosition {
    /// Within every threshold
    Centered,
    /// Yaw decreased past the turn threshold
    TurnedLeft,
    /// Yaw increased past the turn threshold
    TurnedRight,
    /// Roll decreased past the turn threshold
    TiltedLeft,
    /// Roll increased past the turn threshold
    TiltedRight,
    /// Pitch decreased past the pitch threshold
    LookingUp,
    /// Pitch increased past the pitch threshold
    LookingDown,
}

impl HeadPosition {
    /// Whether the examinee is facing the screen
    #[must_use]
    pub fn is_attentive(self) -> bool {
        self == Self::Centered
    }
}

impl fmt::Display for HeadPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Centered => "Centered",
            Self::TurnedLeft => "Turned Left",
            Self::TurnedRight => "Turned Right",
            Self::TiltedLeft => "Tilted Left",
            Self::TiltedRight => "Tilted Right",
            Self::LookingUp => "Looking Up",
            Self::LookingDown => "Looking Down",
        };
        f.write_str(label)
    }
}

/// Angular thresholds in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseThresholds {
    /// Limit for |Δyaw| and |Δroll|
    pub turn_deg: f64,
    /// Limit for Δpitch in either direction
    pub pitch_deg: f64,
}

impl Default for PoseThresholds {
    fn default() -> Self {
        Self {
            turn_deg: DEFAULT_TURN_THRESHOLD_DEG,
            pitch_deg: DEFAULT_PITCH_THRESHOLD_DEG,
        }
    }
}

/// Map a pose delta to a head position. The first matching rule wins.
#[must_use]
pub fn classify_delta(delta: &PoseAngles, thresholds: &PoseThresholds) -> HeadPosition {
    if delta.yaw.abs() > thresholds.turn_deg {
        if delta.yaw < 0.0 {
            HeadPosition::TurnedLeft
        } else {
            HeadPosition::TurnedRight
        }
    } else if delta.roll.abs() > thresholds.turn_deg {
        if delta.roll < 0.0 {
            HeadPosition::TiltedLeft
        } else {
            HeadPosition::TiltedRight
        }
    } else if delta.pitch < -thresholds.pitch_deg {
        HeadPosition::LookingUp
    } else if delta.pitch > thresholds.pitch_deg {
        HeadPosition::LookingDown
    } else {
        HeadPosition::Centered
    }
}

/// Calibration state of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibration {
    /// No pose observed yet
    Uncalibrated,
    /// Baseline fixed for the rest of the session
    Calibrated(PoseAngles),
}

/// Result of classifying one pose observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Derived head position
    pub position: HeadPosition,
    /// Observation minus baseline
    pub delta: PoseAngles,
}

/// Set-once baseline and the classifier built on it
#[derive(Debug, Clone)]
pub struct HeadPoseClassifier {
    calibration: Calibration,
    thresholds: PoseThresholds,
}

impl Default for HeadPoseClassifier {
    fn default() -> Self {
        Self::new(PoseThresholds::default())
    }
}

impl HeadPoseClassifier {
    /// Create an uncalibrated classifier
    #[must_use]
    pub fn new(thresholds: PoseThresholds) -> Self {
        Self {
            calibration: Calibration::Uncalibrated,
            thresholds,
        }
    }

    /// Current calibration state
    #[must_use]
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Baseline pose, once calibrated
    #[must_use]
    pub fn baseline(&self) -> Option<PoseAngles> {
        match self.calibration {
            Calibration::Uncalibrated => None,
            Calibration::Calibrated(baseline) => Some(baseline),
        }
    }

    /// Thresholds in use
    #[must_use]
    pub fn thresholds(&self) -> &PoseThresholds {
        &self.thresholds
    }

    /// Classify a successful pose observation.
    ///
    /// The first observation of the session becomes the baseline and is classified
    /// against itself.
    pub fn observe(&mut self, pose: PoseAngles) -> Classification {
        let baseline = match self.calibration {
            Calibration::Calibrated(baseline) => baseline,
            Calibration::Uncalibrated => {
                log::info!("Baseline calibrated: {pose}");
                self.calibration = Calibration::Calibrated(pose);
                pose
            }
        };

        let delta = pose.delta_from(&baseline);
        Classification {
            position: classify_delta(&delta, &self.thresholds),
            delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated_at_zero() -> HeadPoseClassifier {
        let mut classifier = HeadPoseClassifier::default();
        classifier.observe(PoseAngles::new(0.0, 0.0, 0.0));
        classifier
    }

    #[test]
    fn test_first_observation_sets_baseline() {
        let mut classifier = HeadPoseClassifier::default();
        assert_eq!(classifier.calibration(), Calibration::Uncalibrated);
        assert!(classifier.baseline().is_none());

        let first = PoseAngles::new(3.0, -7.0, 1.5);
        let classification = classifier.observe(first);

        assert_eq!(classifier.baseline(), Some(first));
        assert_eq!(classification.position, HeadPosition::Centered);
        assert_eq!(classification.delta, PoseAngles::default());
    }

    #[test]
    fn test_baseline_never_overwritten() {
        let mut classifier = HeadPoseClassifier::default();
        let first = PoseAngles::new(10.0, 10.0, 10.0);
        classifier.observe(first);

        for i in 0..50 {
            let angle = f64::from(i) * 3.0 - 60.0;
            classifier.observe(PoseAngles::new(angle, -angle, angle / 2.0));
        }
        assert_eq!(classifier.baseline(), Some(first));
    }

    #[test]
    fn test_reference_scenarios() {
        let mut classifier = calibrated_at_zero();

        assert_eq!(
            classifier.observe(PoseAngles::new(20.0, 0.0, 0.0)).position,
            HeadPosition::TurnedRight
        );
        assert_eq!(
            classifier.observe(PoseAngles::new(0.0, -25.0, 0.0)).position,
            HeadPosition::LookingUp
        );
        assert_eq!(
            classifier.observe(PoseAngles::new(0.0, 0.0, -16.0)).position,
            HeadPosition::TiltedLeft
        );
        assert_eq!(
            classifier.observe(PoseAngles::new(5.0, 5.0, 5.0)).position,
            HeadPosition::Centered
        );
    }

    #[test]
    fn test_priority_yaw_over_roll_over_pitch() {
        let thresholds = PoseThresholds::default();

        let all_exceeded = PoseAngles::new(20.0, 25.0, 20.0);
        assert_eq!(classify_delta(&all_exceeded, &thresholds), HeadPosition::TurnedRight);

        let roll_and_pitch = PoseAngles::new(0.0, 25.0, -20.0);
        assert_eq!(classify_delta(&roll_and_pitch, &thresholds), HeadPosition::TiltedLeft);

        let yaw_left = PoseAngles::new(-15.5, -30.0, 0.0);
        assert_eq!(classify_delta(&yaw_left, &thresholds), HeadPosition::TurnedLeft);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let thresholds = PoseThresholds::default();
        assert_eq!(
            classify_delta(&PoseAngles::new(15.0, 0.0, 0.0), &thresholds),
            HeadPosition::Centered
        );
        assert_eq!(
            classify_delta(&PoseAngles::new(0.0, 0.0, 15.0), &thresholds),
            HeadPosition::Centered
        );
        assert_eq!(
            classify_delta(&PoseAngles::new(0.0, 20.0, 0.0), &thresholds),
            HeadPosition::Centered
        );
        assert_eq!(
            classify_delta(&PoseAngles::new(0.0, 20.1, 0.0), &thresholds),
            HeadPosition::LookingDown
        );
        assert_eq!(
            classify_delta(&PoseAngles::new(0.0, 0.0, 15.1), &thresholds),
            HeadPosition::TiltedRight
        );
    }

    #[test]
    fn test_deltas_relative_to_baseline() {
        let mut classifier = HeadPoseClassifier::default();
        classifier.observe(PoseAngles::new(-30.0, 10.0, 0.0));

        // Absolute yaw of -30 is the calibrated posture
        let classification = classifier.observe(PoseAngles::new(-28.0, 12.0, 1.0));
        assert_eq!(classification.position, HeadPosition::Centered);
        assert_eq!(classification.delta, PoseAngles::new(2.0, 2.0, 1.0));

        // Back to absolute zero yaw is a right turn from this baseline
        assert_eq!(
            classifier.observe(PoseAngles::new(0.0, 10.0, 0.0)).position,
            HeadPosition::TurnedRight
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let mut classifier = HeadPoseClassifier::new(PoseThresholds {
            turn_deg: 5.0,
            pitch_deg: 5.0,
        });
        classifier.observe(PoseAngles::default());
        assert_eq!(
            classifier.observe(PoseAngles::new(6.0, 0.0, 0.0)).position,
            HeadPosition::TurnedRight
        );
        assert_eq!(
            classifier.observe(PoseAngles::new(0.0, -6.0, 0.0)).position,
            HeadPosition::LookingUp
        );
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(HeadPosition::TurnedLeft.to_string(), "Turned Left");
        assert_eq!(HeadPosition::LookingDown.to_string(), "Looking Down");
        assert!(HeadPosition::Centered.is_attentive());
        assert!(!HeadPosition::TiltedRight.is_attentive());
    }
}
