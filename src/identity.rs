//! Identity matcher comparing live encodings against the enrolled references.

use crate::encoding::FaceEncoding;
use std::fmt;

/// Identity decision for one face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Close enough to an enrolled reference
    Match,
    /// Too far from every reference, or no references to compare against
    Suspicious,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => write!(f, "Match"),
            Self::Suspicious => write!(f, "Suspicious"),
        }
    }
}

/// Minimum distance to the reference set together with its verdict
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdentityScore {
    /// Smallest distance to any reference, infinite when undetermined
    pub distance: f64,
    /// Decision derived from `distance`
    pub verdict: Verdict,
}

/// Enrolled reference encodings of the examinee
///
/// Encodings are appended during enrollment only; the live loop reads the set through
/// a shared reference.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    references: Vec<FaceEncoding>,
    match_threshold: f64,
}

impl ReferenceSet {
    /// Create an empty reference set with the given match threshold
    #[must_use]
    pub fn new(match_threshold: f64) -> Self {
        Self {
            references: Vec::new(),
            match_threshold,
        }
    }

    /// Append a reference encoding
    pub fn enroll(&mut self, encoding: FaceEncoding) {
        log::debug!(
            "Enrolled reference #{} ({} points)",
            self.references.len() + 1,
            encoding.len()
        );
        self.references.push(encoding);
    }

    /// Number of enrolled references
    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Whether nothing has been enrolled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Distance threshold at or below which a face is a match
    #[must_use]
    pub fn match_threshold(&self) -> f64 {
        self.match_threshold
    }

    /// Minimum distance from `live` to any reference.
    ///
    /// Returns `f64::INFINITY` when the set is empty. References whose shape differs
    /// from `live` count as infinitely distant.
    #[must_use]
    pub fn score(&self, live: &FaceEncoding) -> f64 {
        self.references
            .iter()
            .map(|reference| reference.distance(live))
            .fold(f64::INFINITY, f64::min)
    }

    /// Decide whether `distance` identifies the enrolled person
    #[must_use]
    pub fn verdict(&self, distance: f64) -> Verdict {
        if distance.is_finite() && distance <= self.match_threshold {
            Verdict::Match
        } else {
            Verdict::Suspicious
        }
    }

    /// Score and decide in one step
    #[must_use]
    pub fn evaluate(&self, live: &FaceEncoding) -> IdentityScore {
        let distance = self.score(live);
        IdentityScore {
            distance,
            verdict: self.verdict(distance),
        }
    }
}
