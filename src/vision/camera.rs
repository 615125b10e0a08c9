//! Camera and video file frame sources.

use super::FrameSource;
use crate::{Error, Result};
use log::{info, warn};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};
use std::ops::{Deref, DerefMut};

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// `OpenCV` video capture as a [`FrameSource`]
pub struct CameraSource {
    capture: VideoCapture,
    source: VideoSource,
}

impl CameraSource {
    /// Open a camera or a video file
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened
    pub fn open(source: &VideoSource) -> Result<Self> {
        let capture = match source {
            VideoSource::Camera(index) => {
                info!("Opening camera {}", index);
                let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;

                // Reduce buffer size for lower latency (webcam only)
                if !cap.set(CAP_PROP_BUFFERSIZE, 1.0)? {
                    warn!("Camera {} ignored buffer size request", index);
                }
                cap
            }
            VideoSource::File(path) => {
                info!("Opening video file: {}", path);
                VideoCapture::from_file(path, videoio::CAP_ANY)?
            }
        };

        if !capture.is_opened()? {
            return Err(Error::Acquisition(format!("Could not open {source:?}")));
        }

        Ok(Self {
            capture,
            source: source.clone(),
        })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) {
        info!("Releasing {:?}", self.source);
        if let Err(e) = self.capture.release() {
            warn!("Failed to release {:?}: {}", self.source, e);
        }
    }
}

/// Frame source that is released exactly once, on explicit release or on drop
pub struct ScopedSource<S: FrameSource> {
    source: S,
    released: bool,
}

impl<S: FrameSource> ScopedSource<S> {
    /// Take ownership of `source` for the duration of a scope
    pub fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    /// Whether the source has been released
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release now instead of at end of scope
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
        }
    }

    /// Next frame, `None` after release
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be read
    pub fn next_frame(&mut self) -> Result<Option<Mat>> {
        if self.released {
            return Ok(None);
        }
        self.source.next_frame()
    }
}

impl<S: FrameSource> Deref for ScopedSource<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.source
    }
}

impl<S: FrameSource> DerefMut for ScopedSource<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: FrameSource> Drop for ScopedSource<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingSource {
        frames: usize,
        releases: Rc<Cell<usize>>,
    }

    impl FrameSource for CountingSource {
        fn next_frame(&mut self) -> Result<Option<Mat>> {
            if self.frames == 0 {
                return Ok(None);
            }
            self.frames -= 1;
            Ok(Some(Mat::default()))
        }

        fn release(&mut self) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    #[test]
    fn test_released_once_on_drop() {
        let releases = Rc::new(Cell::new(0));
        {
            let mut scoped = ScopedSource::new(CountingSource {
                frames: 2,
                releases: Rc::clone(&releases),
            });
            assert!(scoped.next_frame().unwrap().is_some());
            assert!(!scoped.is_released());
        }
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_explicit_release_not_repeated() {
        let releases = Rc::new(Cell::new(0));
        {
            let mut scoped = ScopedSource::new(CountingSource {
                frames: 5,
                releases: Rc::clone(&releases),
            });
            scoped.release();
            scoped.release();
            assert!(scoped.next_frame().unwrap().is_none());
        }
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_released_during_unwind() {
        let releases = Rc::new(Cell::new(0));
        let counter = Rc::clone(&releases);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _scoped = ScopedSource::new(CountingSource {
                frames: 1,
                releases: counter,
            });
            panic!("downstream failure");
        }));
        assert!(result.is_err());
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let result = CameraSource::open(&VideoSource::File("does/not/exist.mp4".to_string()));
        assert!(result.is_err());
    }
}
