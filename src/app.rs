//! Session orchestration: enrollment followed by the live monitoring loop.

use crate::{
    config::Config,
    encoding::encode,
    enrollment::{enroll_from_images, list_images},
    error::{Error, Result},
    pose_estimation::PoseEstimator,
    session::{FaceStatusRecord, MonitorSession},
    vision::{
        camera::ScopedSource, face_detection::ScrfdFaceDetector, mark_detection::OnnxLandmarkDetector,
        pnp::OpenCvPnpSolver, FaceDetect, FrameSource, LandmarkExtract,
    },
};
use log::{debug, info, warn};
use opencv::core::Mat;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between the loop and its controllers
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the loop stops before its next frame
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Receives the status records of every processed frame
pub trait StatusSink {
    /// Handle the records produced for `frame`
    ///
    /// # Errors
    ///
    /// An error ends the session
    fn emit(&mut self, frame: &Mat, records: &[FaceStatusRecord]) -> Result<()>;
}

/// Sink that reports flagged faces through the log
#[derive(Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn emit(&mut self, _frame: &Mat, records: &[FaceStatusRecord]) -> Result<()> {
        for record in records {
            let position = record
                .head_position
                .map_or_else(|| "Unknown".to_string(), |p| p.to_string());
            if record.is_flagged() {
                info!(
                    "{} (dist {:.2}), head {} at {:?}",
                    record.verdict, record.distance, position, record.region
                );
            } else {
                debug!("{} (dist {:.2}), head {}", record.verdict, record.distance, position);
            }
        }
        Ok(())
    }
}

/// Why a monitoring session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCause {
    /// The cancellation token was raised
    Cancelled,
    /// The frame source ran out of frames
    EndOfStream,
    /// Reading a frame failed
    AcquisitionFailed,
}

impl fmt::Display for ExitCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::EndOfStream => write!(f, "end of stream"),
            Self::AcquisitionFailed => write!(f, "frame acquisition failed"),
        }
    }
}

/// Totals reported when a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames that went through detection
    pub frames_processed: usize,
    /// Face status records handed to the sink
    pub records_emitted: usize,
    /// Reason the loop stopped
    pub exit_cause: ExitCause,
}

/// Identity and attention monitor over a stream of frames
pub struct ProctorMonitor {
    face_detector: Box<dyn FaceDetect + Send>,
    landmark_extractor: Box<dyn LandmarkExtract + Send>,
    pose_estimator: PoseEstimator,
    session: MonitorSession,
    started: bool,
}

impl ProctorMonitor {
    /// Assemble a monitor from its vision capabilities and an empty session
    #[must_use]
    pub fn new(
        face_detector: Box<dyn FaceDetect + Send>,
        landmark_extractor: Box<dyn LandmarkExtract + Send>,
        pose_estimator: PoseEstimator,
        session: MonitorSession,
    ) -> Self {
        Self {
            face_detector,
            landmark_extractor,
            pose_estimator,
            session,
            started: false,
        }
    }

    /// Load the ONNX models and build a monitor from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if a model cannot be loaded
    pub fn from_config(config: &Config) -> Result<Self> {
        info!("Initializing proctoring monitor");

        let detection = &config.face_detection;
        let face_detector = ScrfdFaceDetector::new(
            &config.models.face_detector,
            detection.confidence_threshold,
            detection.iou_threshold,
            detection.max_faces,
        )?;
        let landmark_extractor =
            OnnxLandmarkDetector::new(&config.models.face_landmarks)?.with_box_expansion(detection.bbox_expansion);
        let pose_estimator = PoseEstimator::with_model(
            Box::new(OpenCvPnpSolver::default()),
            config.pose.model_points,
            config.pose.landmark_indices,
            config.pose.intrinsics,
        );
        let session = MonitorSession::new(config.identity.match_threshold, config.classifier);

        Ok(Self::new(
            Box::new(face_detector),
            Box::new(landmark_extractor),
            pose_estimator,
            session,
        ))
    }

    /// Session state: references and baseline
    #[must_use]
    pub fn session(&self) -> &MonitorSession {
        &self.session
    }

    /// Enroll the first face of each image
    ///
    /// # Errors
    ///
    /// Returns [`Error::Enrollment`] if monitoring has already started or no
    /// reference encoding results
    pub fn enroll(&mut self, images: &[Mat]) -> Result<usize> {
        if self.started {
            return Err(Error::Enrollment(
                "references are read-only once monitoring has started".to_string(),
            ));
        }
        enroll_from_images(
            images,
            self.face_detector.as_mut(),
            self.landmark_extractor.as_mut(),
            self.session.references_mut(),
        )
    }

    /// Enroll every readable image in `folder`
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be read or no reference encoding results
    pub fn load_reference_images(&mut self, folder: &Path) -> Result<usize> {
        let images = list_images(folder)?;
        self.enroll(&images)
    }

    /// Status records for every face in `frame`.
    ///
    /// Faces without landmarks are skipped. A face whose pose cannot be estimated
    /// still gets an identity verdict.
    pub fn process_frame(&mut self, frame: &Mat) -> Vec<FaceStatusRecord> {
        let faces = match self.face_detector.detect_faces(frame) {
            Ok(faces) => faces,
            Err(e) => {
                warn!("Face detection failed: {}", e);
                return Vec::new();
            }
        };

        let mut records = Vec::with_capacity(faces.len());
        for face in &faces {
            let landmarks = match self.landmark_extractor.extract_landmarks(frame, face) {
                Ok(Some(landmarks)) => landmarks,
                Ok(None) => {
                    debug!("No landmarks for face at {:?}", face.bbox);
                    continue;
                }
                Err(e) => {
                    warn!("Landmark extraction failed for face at {:?}: {}", face.bbox, e);
                    continue;
                }
            };

            let Some(encoding) = encode(&landmarks) else {
                debug!("Empty landmark set for face at {:?}", face.bbox);
                continue;
            };

            let pose = match self.pose_estimator.estimate_from_landmarks(&landmarks) {
                Ok(angles) => Some(angles),
                Err(e) => {
                    debug!("Skipping head pose for face at {:?}: {}", face.bbox, e);
                    None
                }
            };

            records.push(self.session.assess(face.bbox, &encoding, pose));
        }

        records
    }

    /// Run the monitoring loop until cancellation or the end of the stream.
    ///
    /// `source` is released exactly once on every exit path. Cancellation is checked
    /// before each frame. A monitor runs a single session: the baseline set here is
    /// never reset, so a second call is refused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Enrollment`] without reading a frame if no reference is
    /// enrolled, [`Error::InvalidInput`] if this monitor already ran, and propagates
    /// errors raised by `sink`
    pub fn run<S: FrameSource>(
        &mut self,
        source: S,
        sink: &mut dyn StatusSink,
        cancel: &CancellationToken,
    ) -> Result<SessionSummary> {
        let mut source = ScopedSource::new(source);

        if self.session.references().is_empty() {
            return Err(Error::Enrollment(
                "no reference encodings enrolled, refusing to monitor".to_string(),
            ));
        }
        if self.started {
            return Err(Error::InvalidInput(
                "monitor already ran its session".to_string(),
            ));
        }
        self.started = true;

        info!("Starting monitoring loop with {} references", self.session.references().len());
        let mut frames_processed = 0;
        let mut records_emitted = 0;

        let exit_cause = loop {
            if cancel.is_cancelled() {
                break ExitCause::Cancelled;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break ExitCause::EndOfStream,
                Err(e) => {
                    warn!("Failed to read frame {}: {}", frames_processed, e);
                    break ExitCause::AcquisitionFailed;
                }
            };

            let records = self.process_frame(&frame);
            frames_processed += 1;
            records_emitted += records.len();

            sink.emit(&frame, &records)?;
        };

        source.release();

        let summary = SessionSummary {
            frames_processed,
            records_emitted,
            exit_cause,
        };
        info!(
            "Session ended ({}): {} frames, {} records",
            summary.exit_cause, summary.frames_processed, summary.records_emitted
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_shared() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let token = CancellationToken::new();
        let handle = token.clone();
        std::thread::spawn(move || handle.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_exit_cause_display() {
        assert_eq!(ExitCause::Cancelled.to_string(), "cancelled");
        assert_eq!(ExitCause::EndOfStream.to_string(), "end of stream");
    }
}
