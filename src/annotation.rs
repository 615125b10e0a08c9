//! Minimal status overlay drawn onto monitored frames.

use crate::{identity::Verdict, session::FaceStatusRecord, Result};
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
};

const BOX_THICKNESS: i32 = 2;
const VERDICT_FONT_SCALE: f64 = 0.9;
const POSE_FONT_SCALE: f64 = 0.8;

/// BGR color for a verdict: green on match, red otherwise
#[must_use]
pub fn verdict_color(verdict: Verdict) -> Scalar {
    match verdict {
        Verdict::Match => Scalar::new(0.0, 255.0, 0.0, 0.0),
        Verdict::Suspicious => Scalar::new(0.0, 0.0, 255.0, 0.0),
    }
}

/// Label drawn above the face box
#[must_use]
pub fn verdict_text(record: &FaceStatusRecord) -> String {
    format!("{} - Dist: {:.2}", record.verdict, record.distance)
}

/// Label drawn below the face box, absent when the pose is unknown
#[must_use]
pub fn pose_text(record: &FaceStatusRecord) -> Option<String> {
    record.head_position.map(|position| format!("Head Pose: {position}"))
}

/// Draw every record onto `frame`
///
/// # Errors
///
/// Returns an error if an `OpenCV` drawing call fails
pub fn annotate(frame: &mut Mat, records: &[FaceStatusRecord]) -> Result<()> {
    for record in records {
        let color = verdict_color(record.verdict);
        let region = record.region;

        imgproc::rectangle(frame, region, color, BOX_THICKNESS, LINE_8, 0)?;
        imgproc::put_text(
            frame,
            &verdict_text(record),
            Point::new(region.x, region.y - 10),
            FONT_HERSHEY_SIMPLEX,
            VERDICT_FONT_SCALE,
            color,
            2,
            LINE_8,
            false,
        )?;

        if let Some(text) = pose_text(record) {
            imgproc::put_text(
                frame,
                &text,
                Point::new(region.x, region.y + region.height + 20),
                FONT_HERSHEY_SIMPLEX,
                POSE_FONT_SCALE,
                color,
                2,
                LINE_8,
                false,
            )?;
        }
    }

    Ok(())
}
