//! Geometry and casting helpers shared by the vision bindings.

use crate::{Error, Result};
use opencv::core::Rect;

/// Safely convert usize to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds `i32::MAX`
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Clamp and convert f32 to i32 for pixel coordinates
#[must_use]
#[allow(clippy::cast_precision_loss)] // Acceptable for clamping bounds
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    (value.clamp(min as f32, max as f32) as i32).clamp(min, max)
}

/// Grow a face box by `shift` of its size on every side and make it square.
///
/// The result always lies inside a `frame_width` x `frame_height` frame. Returns
/// `None` when the box does not overlap the frame.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss acceptable for box dimensions
pub fn expand_to_square(bbox: Rect, frame_width: i32, frame_height: i32, shift: f32) -> Option<Rect> {
    let x_shift = f32_to_i32_clamp(bbox.width as f32 * shift, 0, frame_width);
    let y_shift = f32_to_i32_clamp(bbox.height as f32 * shift, 0, frame_height);

    let x1 = (bbox.x - x_shift).max(0);
    let y1 = (bbox.y - y_shift).max(0);
    let x2 = (bbox.x + bbox.width + x_shift).min(frame_width);
    let y2 = (bbox.y + bbox.height + y_shift).min(frame_height);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    // Square around the clipped box, shrunk only if the frame is too small
    let side = (x2 - x1).max(y2 - y1).min(frame_width).min(frame_height);
    let x = x1.min(frame_width - side);
    let y = y1.min(frame_height - side);

    Some(Rect::new(x, y, side, side))
}
