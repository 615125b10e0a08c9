//! Real-time identity and attention monitor for remote proctoring.
//!
//! Given a live video stream and a few enrolled reference samples of the examinee,
//! the monitor continuously:
//! - scores how closely each observed face matches the enrolled identity, and
//! - classifies head orientation relative to a calibrated baseline
//!   (centered, turned, tilted, looking up or down).
//!
//! The per-frame pipeline consists of:
//! 1. Face detection (SCRFD via ONNX Runtime)
//! 2. Facial landmark detection (68 key points)
//! 3. Landmark encoding and identity scoring against the references
//! 4. Head pose estimation with `PnP` (Perspective-n-Point) and Euler decomposition
//! 5. Baseline-relative head position classification
//!
//! Every computer-vision capability sits behind a trait in [`vision`], so the core
//! runs against any detector, landmark model, solver or frame source.
//!
//! # Examples
//!
//! ## Classifying poses against a baseline
//!
//! ```
//! use proctor_monitor::classifier::{HeadPoseClassifier, HeadPosition};
//! use proctor_monitor::pose_estimation::PoseAngles;
//!
//! let mut classifier = HeadPoseClassifier::default();
//!
//! // The first observation becomes the baseline
//! let first = classifier.observe(PoseAngles::new(2.0, -4.0, 1.0));
//! assert_eq!(first.position, HeadPosition::Centered);
//!
//! let turned = classifier.observe(PoseAngles::new(25.0, -4.0, 1.0));
//! assert_eq!(turned.position, HeadPosition::TurnedRight);
//! ```
//!
//! ## Monitoring a webcam
//!
//! ```no_run
//! use proctor_monitor::{
//!     app::{CancellationToken, LogSink, ProctorMonitor},
//!     config::Config,
//!     vision::camera::{CameraSource, VideoSource},
//! };
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut monitor = ProctorMonitor::from_config(&config)?;
//! monitor.load_reference_images(Path::new("reference_images"))?;
//!
//! let camera = CameraSource::open(&VideoSource::Camera(0))?;
//! let summary = monitor.run(camera, &mut LogSink, &CancellationToken::new())?;
//! println!("Processed {} frames", summary.frames_processed);
//! # Ok(())
//! # }
//! ```

/// Status overlay for annotated frames
pub mod annotation;

/// Main application module
pub mod app;

/// Baseline calibration and head position classification
pub mod classifier;

/// Configuration management
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Landmark encodings for identity comparison
pub mod encoding;

/// Reference capture and enrollment
pub mod enrollment;

/// Error types and result handling
pub mod error;

/// Identity matching against enrolled references
pub mod identity;

/// Head pose estimation module using `PnP` algorithm
pub mod pose_estimation;

/// Per-session monitoring state
pub mod session;

/// Utility functions for coordinate transformations
pub mod utils;

/// Computer-vision capabilities and their `OpenCV` / ONNX Runtime bindings
pub mod vision;

pub use error::{Error, Result};
