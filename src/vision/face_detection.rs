use super::{FaceDetect, FaceRegion};
use crate::{
    constants::{IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE},
    utils::usize_to_i32,
    Error, Result,
};
use ndarray::{Array2, Array4, CowArray};
use opencv::core::{Mat, Rect, Scalar, Size, Vec3f, CV_32F, CV_8UC3};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Default SCRFD input resolution
const DEFAULT_INPUT_SIZE: (i32, i32) = (640, 640);

/// A decoded box before non-maximum suppression, in detector input pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1 + 1.0) * (self.y2 - self.y1 + 1.0)
    }

    fn iou(&self, other: &Self) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1) + 1.0).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1) + 1.0).max(0.0);
        let inter = w * h;
        inter / (self.area() + other.area() - inter)
    }
}

/// How the SCRFD variant lays out its outputs
#[derive(Debug, Clone, PartialEq)]
struct OutputLayout {
    strides: Vec<i32>,
    anchors_per_cell: usize,
}

impl OutputLayout {
    /// Infer the layout from the number of model outputs
    fn from_output_count(count: usize) -> Self {
        match count {
            6 | 9 => Self {
                strides: vec![8, 16, 32],
                anchors_per_cell: 2,
            },
            10 | 15 => Self {
                strides: vec![8, 16, 32, 64, 128],
                anchors_per_cell: 1,
            },
            _ => {
                log::warn!("Unknown SCRFD configuration with {} outputs, using defaults", count);
                Self {
                    strides: vec![8, 16, 32],
                    anchors_per_cell: 2,
                }
            }
        }
    }

    /// Output index of the box distances for the stride at `level`
    fn bbox_output(&self, level: usize) -> usize {
        level + self.strides.len()
    }
}

/// SCRFD face detector using ONNX Runtime
pub struct ScrfdFaceDetector {
    session: Session,
    input_size: (i32, i32),
    conf_threshold: f32,
    nms_threshold: f32,
    max_faces: usize,
    layout: OutputLayout,
    center_cache: HashMap<(i32, i32, i32), Array2<f32>>,
}

impl ScrfdFaceDetector {
    /// Create a new face detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The model has no inputs
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32, max_faces: usize) -> Result<Self> {
        log::info!("Initializing ScrfdFaceDetector with model: {}", model_path.as_ref().display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelError("Model has no inputs".to_string()))?;

        // [batch, channels, height, width], dynamic axes fall back to the default
        let input_size = match input.dimensions.as_slice() {
            [_, _, height, width] => (
                width.and_then(|w| i32::try_from(w).ok()).unwrap_or(DEFAULT_INPUT_SIZE.0),
                height.and_then(|h| i32::try_from(h).ok()).unwrap_or(DEFAULT_INPUT_SIZE.1),
            ),
            _ => DEFAULT_INPUT_SIZE,
        };

        let layout = OutputLayout::from_output_count(session.outputs.len());
        log::debug!("SCRFD input {:?}, strides {:?}", input_size, layout.strides);

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            nms_threshold,
            max_faces,
            layout,
            center_cache: HashMap::new(),
        })
    }

    /// Detect faces in an image, most confident first
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<FaceRegion>> {
        if image.empty() {
            return Ok(Vec::new());
        }

        let (det_img, det_scale) = self.letterbox(image)?;
        let tensor = Self::to_tensor(&det_img)?;
        let candidates = self.infer(tensor)?;

        let mut kept = non_max_suppression(candidates, self.nms_threshold);
        kept.truncate(self.max_faces);

        Ok(kept
            .into_iter()
            .map(|c| FaceRegion {
                bbox: scale_to_frame(&c, det_scale, image.cols(), image.rows()),
                score: c.score,
            })
            .filter(|region| region.bbox.width > 0 && region.bbox.height > 0)
            .collect())
    }

    /// Resize keeping aspect ratio and pad to the model input size
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn letterbox(&self, image: &Mat) -> Result<(Mat, f32)> {
        let (input_width, input_height) = self.input_size;
        let ratio_img = image.rows() as f32 / image.cols() as f32;
        let ratio_model = input_height as f32 / input_width as f32;

        let (new_width, new_height) = if ratio_img > ratio_model {
            ((input_height as f32 / ratio_img) as i32, input_height)
        } else {
            (input_width, (input_width as f32 * ratio_img) as i32)
        };
        let det_scale = new_height as f32 / image.rows() as f32;

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut det_img = Mat::new_rows_cols_with_default(input_height, input_width, CV_8UC3, Scalar::all(0.0))?;
        let mut roi = det_img.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        Ok((det_img, det_scale))
    }

    /// BGR image to a normalized NCHW RGB tensor
    #[allow(clippy::cast_sign_loss)] // OpenCV dimensions are positive
    fn to_tensor(image: &Mat) -> Result<Array4<f32>> {
        let mut rgb_image = Mat::default();
        imgproc::cvt_color(image, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;
        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0, 0.0)?;

        let height = float_image.rows() as usize;
        let width = float_image.cols() as usize;
        let mut tensor = Array4::zeros((1, 3, height, width));

        for row in 0..height {
            for col in 0..width {
                let pixel = float_image.at_2d::<Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..3 {
                    tensor[[0, ch, row, col]] = (pixel[ch] - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE;
                }
            }
        }

        Ok(tensor)
    }

    /// Run the model and decode every stride into confident candidates
    #[allow(clippy::cast_precision_loss)]
    fn infer(&mut self, tensor: Array4<f32>) -> Result<Vec<Candidate>> {
        let input_height = usize_to_i32(tensor.shape()[2])?;
        let input_width = usize_to_i32(tensor.shape()[3])?;

        let cow_array = CowArray::from(tensor.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut candidates = Vec::new();
        for (level, &stride) in self.layout.strides.iter().enumerate() {
            let scores_tensor = outputs
                .get(level)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing score output {level}")))?
                .try_extract::<f32>()?;
            let bbox_tensor = outputs
                .get(self.layout.bbox_output(level))
                .ok_or_else(|| Error::ModelOutputError(format!("Missing bbox output for stride {stride}")))?
                .try_extract::<f32>()?;

            let scores_view = scores_tensor.view();
            let scores = scores_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous score output".to_string()))?;
            let bbox_view = bbox_tensor.view();
            let distances = bbox_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous bbox output".to_string()))?;

            let key = (input_height / stride, input_width / stride, stride);
            let anchors_per_cell = self.layout.anchors_per_cell;
            let centers = self
                .center_cache
                .entry(key)
                .or_insert_with(|| anchor_centers(key.0, key.1, stride, anchors_per_cell));

            candidates.extend(decode_stride(centers, scores, distances, stride as f32, self.conf_threshold));
        }

        Ok(candidates)
    }
}

impl FaceDetect for ScrfdFaceDetector {
    fn detect_faces(&mut self, frame: &Mat) -> Result<Vec<FaceRegion>> {
        self.detect(frame)
    }
}

/// Anchor centers of a `height` x `width` feature map, repeated per anchor
#[allow(clippy::cast_precision_loss)]
pub(crate) fn anchor_centers(height: i32, width: i32, stride: i32, anchors_per_cell: usize) -> Array2<f32> {
    let cells = usize::try_from(height.max(0) * width.max(0)).unwrap_or(0);
    let mut centers = Array2::zeros((cells * anchors_per_cell, 2));

    let mut row = 0;
    for y in 0..height {
        for x in 0..width {
            for _ in 0..anchors_per_cell {
                centers[[row, 0]] = (x * stride) as f32;
                centers[[row, 1]] = (y * stride) as f32;
                row += 1;
            }
        }
    }
    centers
}

/// Turn left/top/right/bottom distances around each anchor into candidates
pub(crate) fn decode_stride(
    centers: &Array2<f32>,
    scores: &[f32],
    distances: &[f32],
    stride: f32,
    threshold: f32,
) -> Vec<Candidate> {
    scores
        .iter()
        .enumerate()
        .filter(|&(_, &score)| score >= threshold)
        .filter_map(|(i, &score)| {
            let d = distances.get(i * 4..i * 4 + 4)?;
            let cx = *centers.get([i, 0])?;
            let cy = *centers.get([i, 1])?;
            Some(Candidate {
                x1: cx - d[0] * stride,
                y1: cy - d[1] * stride,
                x2: cx + d[2] * stride,
                y2: cy + d[3] * stride,
                score,
            })
        })
        .collect()
}

/// Greedy non-maximum suppression, returns survivors by descending score
pub(crate) fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep.iter().all(|kept| kept.iou(&candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

/// Map a candidate back to frame pixels, clipped to the frame
#[allow(clippy::cast_possible_truncation)]
fn scale_to_frame(candidate: &Candidate, det_scale: f32, frame_width: i32, frame_height: i32) -> Rect {
    let clip = |v: f32, max: i32| crate::utils::f32_to_i32_clamp(v / det_scale, 0, max);
    let x1 = clip(candidate.x1, frame_width);
    let y1 = clip(candidate.y1, frame_height);
    let x2 = clip(candidate.x2, frame_width);
    let y2 = clip(candidate.y2, frame_height);
    Rect::new(x1, y1, x2 - x1, y2 - y1)
}
