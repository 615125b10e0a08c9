//! Reference capture and enrollment of the examinee's face.

use crate::{
    encoding::encode,
    identity::ReferenceSet,
    vision::{camera::ScopedSource, FaceDetect, FrameSource, LandmarkExtract},
    Error, Result,
};
use log::{debug, info, warn};
use opencv::{
    core::{Mat, Vector},
    imgcodecs,
    prelude::*,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::InvalidInput(format!("Non UTF-8 path: {}", path.display())))
}

/// Capture `count` frames into `folder` as `reference_{i}.jpg`.
///
/// The source is released before returning, whatever the outcome. Capture stops
/// early when the source runs out of frames.
///
/// # Errors
///
/// Returns an error if the folder cannot be created, a frame cannot be read, or an
/// image cannot be written
pub fn capture_reference_images<S: FrameSource>(
    source: S,
    folder: &Path,
    count: usize,
    interval: Duration,
) -> Result<Vec<PathBuf>> {
    let mut source = ScopedSource::new(source);
    fs::create_dir_all(folder)?;
    info!("Capturing {} reference images into {}", count, folder.display());

    let mut written = Vec::with_capacity(count);
    for i in 0..count {
        let Some(frame) = source.next_frame()? else {
            warn!("Frame source exhausted after {} reference images", written.len());
            break;
        };

        let path = folder.join(format!("reference_{i}.jpg"));
        if !imgcodecs::imwrite(path_str(&path)?, &frame, &Vector::new())? {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Could not write {}", path.display()),
            )));
        }
        info!("Captured: {}", path.display());
        written.push(path);

        if i + 1 < count && !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    source.release();
    Ok(written)
}

/// Regular files in `folder`, sorted by name
///
/// # Errors
///
/// Returns an error if the folder cannot be read
pub fn image_paths(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every readable image in `folder`; unreadable files are skipped
///
/// # Errors
///
/// Returns an error if the folder cannot be read
pub fn list_images(folder: &Path) -> Result<Vec<Mat>> {
    let mut images = Vec::new();
    for path in image_paths(folder)? {
        let image = imgcodecs::imread(path_str(&path)?, imgcodecs::IMREAD_COLOR)?;
        if image.empty() {
            debug!("Skipping unreadable file {}", path.display());
            continue;
        }
        images.push(image);
    }
    info!("Loaded {} reference images from {}", images.len(), folder.display());
    Ok(images)
}

/// Enroll the first face of every image into `references`.
///
/// Images without a detectable face or landmarks are skipped, as are images on which
/// a vision call fails. Returns the number of encodings added.
///
/// # Errors
///
/// Returns [`Error::Enrollment`] if the reference set is still empty afterwards
pub fn enroll_from_images(
    images: &[Mat],
    detector: &mut dyn FaceDetect,
    extractor: &mut dyn LandmarkExtract,
    references: &mut ReferenceSet,
) -> Result<usize> {
    let mut enrolled = 0;

    for (i, image) in images.iter().enumerate() {
        let faces = match detector.detect_faces(image) {
            Ok(faces) => faces,
            Err(e) => {
                warn!("Face detection failed on reference image {}: {}", i, e);
                continue;
            }
        };
        let Some(face) = faces.first() else {
            debug!("No face in reference image {}", i);
            continue;
        };

        let landmarks = match extractor.extract_landmarks(image, face) {
            Ok(Some(landmarks)) => landmarks,
            Ok(None) => {
                debug!("No landmarks in reference image {}", i);
                continue;
            }
            Err(e) => {
                warn!("Landmark extraction failed on reference image {}: {}", i, e);
                continue;
            }
        };

        if let Some(encoding) = encode(&landmarks) {
            references.enroll(encoding);
            enrolled += 1;
        }
    }

    if references.is_empty() {
        return Err(Error::Enrollment(format!(
            "no usable face in {} reference images",
            images.len()
        )));
    }

    info!("Enrolled {} of {} reference images", enrolled, images.len());
    Ok(enrolled)
}
