use crate::{
    annotation::annotate,
    app::{CancellationToken, StatusSink},
    session::FaceStatusRecord,
    Result,
};
use log::{info, warn};
use opencv::{
    core::Mat,
    highgui::{self, WINDOW_NORMAL},
    prelude::*,
};

/// Default window title
pub const DEFAULT_WINDOW_TITLE: &str = "Face Detection and Head Pose";

const KEY_ESCAPE: i32 = 27;

/// `highgui` window showing the annotated stream.
///
/// Pressing `q` or ESC cancels the session. The window is destroyed on drop.
pub struct WindowSink {
    title: String,
    cancel: CancellationToken,
}

impl WindowSink {
    /// Open a window named `title`
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be created
    pub fn open(title: &str, cancel: CancellationToken) -> Result<Self> {
        highgui::named_window(title, WINDOW_NORMAL)?;
        info!("Opened display window '{}'", title);
        Ok(Self {
            title: title.to_string(),
            cancel,
        })
    }

    /// Window title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

impl StatusSink for WindowSink {
    fn emit(&mut self, frame: &Mat, records: &[FaceStatusRecord]) -> Result<()> {
        let mut display_frame = frame.try_clone()?;
        annotate(&mut display_frame, records)?;
        highgui::imshow(&self.title, &display_frame)?;

        let key = highgui::wait_key(1)?;
        if key == KEY_ESCAPE || key == i32::from(b'q') {
            info!("Exit requested by user");
            self.cancel.cancel();
        }
        Ok(())
    }
}

impl Drop for WindowSink {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            warn!("Failed to destroy window '{}': {}", self.title, e);
        }
    }
}
