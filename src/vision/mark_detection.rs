use super::{FaceRegion, LandmarkExtract};
use crate::{
    constants::{DEFAULT_BOX_EXPANSION, NUM_FACIAL_LANDMARKS},
    encoding::Landmark,
    utils::{expand_to_square, usize_to_i32},
    Error, Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Rect, Size, Vec3f, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Default landmark detector input size
const DEFAULT_LANDMARK_INPUT_SIZE: i32 = 128;

/// 68-point facial landmark detector using `ONNX` Runtime
pub struct OnnxLandmarkDetector {
    session: Session,
    input_size: i32,
    box_expansion: f32,
}

impl OnnxLandmarkDetector {
    /// Create a new landmark detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The model has no inputs or outputs
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        log::info!(
            "Initializing OnnxLandmarkDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("mark_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
            box_expansion: DEFAULT_BOX_EXPANSION,
        })
    }

    /// Fraction of the face box added on each side before cropping
    #[must_use]
    pub fn with_box_expansion(mut self, box_expansion: f32) -> Self {
        self.box_expansion = box_expansion;
        self
    }

    /// Landmarks of the face inside `bbox`, in frame coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cropping or preprocessing fails
    /// - The ONNX model inference fails
    pub fn detect(&self, frame: &Mat, bbox: Rect) -> Result<Option<Vec<Landmark>>> {
        let Some(roi) = expand_to_square(bbox, frame.cols(), frame.rows(), self.box_expansion) else {
            log::debug!("Face box {:?} lies outside the frame", bbox);
            return Ok(None);
        };

        let face = Mat::roi(frame, roi)?.try_clone()?;
        let tensor = self.preprocess(&face)?;
        let marks = self.forward(tensor)?;

        Ok(marks_to_frame(&marks, roi, self.input_size))
    }

    /// Resize to the model input, convert to RGB in [0, 1], NHWC layout
    #[allow(clippy::cast_sign_loss)] // Input size is positive
    fn preprocess(&self, face: &Mat) -> Result<Array4<f32>> {
        let mut resized = Mat::default();
        imgproc::resize(
            face,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let size = self.input_size as usize;
        let mut tensor = Array4::zeros((1, size, size, 3));
        for row in 0..size {
            for col in 0..size {
                let pixel = float_image.at_2d::<Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..3 {
                    tensor[[0, row, col, ch]] = pixel[ch];
                }
            }
        }

        Ok(tensor)
    }

    /// Run the model, returning the flat `[x0, y0, x1, y1, ...]` output
    fn forward(&self, inputs: Array4<f32>) -> Result<Vec<f32>> {
        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let marks_output = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?;
        let marks_tensor = marks_output.try_extract::<f32>()?;
        let marks_view = marks_tensor.view();

        Ok(marks_view.iter().copied().collect())
    }
}

impl LandmarkExtract for OnnxLandmarkDetector {
    fn extract_landmarks(&mut self, frame: &Mat, region: &FaceRegion) -> Result<Option<Vec<Landmark>>> {
        self.detect(frame, region.bbox)
    }
}

/// Map model-space landmarks of a square crop back into the frame.
///
/// Returns `None` when the output holds fewer than the full landmark set.
#[allow(clippy::cast_precision_loss)] // Precision loss acceptable for pixel coordinates
pub(crate) fn marks_to_frame(marks: &[f32], roi: Rect, input_size: i32) -> Option<Vec<Landmark>> {
    if marks.len() < NUM_FACIAL_LANDMARKS * 2 {
        log::warn!(
            "Landmark model returned {} values, expected {}",
            marks.len(),
            NUM_FACIAL_LANDMARKS * 2
        );
        return None;
    }

    let scale_x = roi.width as f32 / input_size as f32;
    let scale_y = roi.height as f32 / input_size as f32;

    Some(
        marks
            .chunks_exact(2)
            .take(NUM_FACIAL_LANDMARKS)
            .map(|xy| Landmark::new(roi.x as f32 + xy[0] * scale_x, roi.y as f32 + xy[1] * scale_y))
            .collect(),
    )
}
