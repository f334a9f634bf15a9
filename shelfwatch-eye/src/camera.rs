//! Interactive webcam capture for the console

use crate::error::VisionError;
use shelfwatch_core::config::CameraConfig;
use std::path::PathBuf;

const KEY_ESC: i32 = 27;
const KEY_SPACE: i32 = 32;

/// How an interactive capture ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Frame written to this path. The file is kept.
    Captured(PathBuf),
    /// Operator pressed ESC or the stream ended
    Cancelled,
    /// The device could not be opened
    Unavailable(String),
}

/// What a pressed key means while the preview is up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    Capture,
    Exit,
    Continue,
}

pub(crate) fn key_action(key: i32) -> KeyAction {
    match key & 0xFF {
        KEY_SPACE => KeyAction::Capture,
        KEY_ESC => KeyAction::Exit,
        _ => KeyAction::Continue,
    }
}

/// Opens the webcam, shows a live preview and blocks until the operator
/// captures (SPACE) or leaves (ESC). The device is released before returning.
#[derive(Debug, Clone)]
pub struct WebcamCapture {
    config: CameraConfig,
}

impl WebcamCapture {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    pub fn capture_path(&self) -> &PathBuf {
        &self.config.capture_path
    }

    #[cfg(feature = "webcam")]
    pub fn capture_interactive(&self) -> Result<CaptureOutcome, VisionError> {
        use crate::utils::mat_to_rgb_image;
        use opencv::{
            core::Mat,
            highgui,
            prelude::*,
            videoio::{VideoCapture, CAP_ANY},
        };
        use tracing::{info, warn};

        let mut capture = match VideoCapture::new(self.config.camera_id as i32, CAP_ANY) {
            Ok(capture) => capture,
            Err(e) => return Ok(CaptureOutcome::Unavailable(e.message)),
        };
        if !capture.is_opened().unwrap_or(false) {
            return Ok(CaptureOutcome::Unavailable(format!(
                "Camera {} failed to open",
                self.config.camera_id
            )));
        }
        info!("Camera {} opened", self.config.camera_id);

        let title = self.config.window_title.as_str();
        let result = (|| -> Result<CaptureOutcome, VisionError> {
            loop {
                let mut frame = Mat::default();
                if !capture.read(&mut frame)? || frame.rows() <= 0 {
                    warn!("Camera stream ended");
                    return Ok(CaptureOutcome::Cancelled);
                }

                highgui::imshow(title, &frame)?;
                match key_action(highgui::wait_key(1)?) {
                    KeyAction::Exit => return Ok(CaptureOutcome::Cancelled),
                    KeyAction::Capture => {
                        let image = mat_to_rgb_image(&frame)?;
                        image.save(&self.config.capture_path)?;
                        info!("Frame saved to {:?}", self.config.capture_path);
                        return Ok(CaptureOutcome::Captured(self.config.capture_path.clone()));
                    }
                    KeyAction::Continue => {}
                }
            }
        })();

        let _ = capture.release();
        let _ = highgui::destroy_all_windows();
        result
    }

    #[cfg(not(feature = "webcam"))]
    pub fn capture_interactive(&self) -> Result<CaptureOutcome, VisionError> {
        Ok(CaptureOutcome::Unavailable(
            "built without webcam support (enable the `webcam` feature)".to_string(),
        ))
    }
}
