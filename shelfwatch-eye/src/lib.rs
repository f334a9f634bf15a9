//! shelfwatch-eye: shelf vision for shelfwatch
//!
//! Fetches and loads the shelf detection model, runs it on single images,
//! draws the detections and turns the count into a stock decision. Also
//! owns the interactive webcam capture used by the console.

pub mod camera;
pub mod error;
pub mod models;
pub mod monitor;
pub mod processing;
#[cfg(feature = "webcam")]
mod utils;

pub use camera::{CaptureOutcome, WebcamCapture};
pub use error::VisionError;
pub use models::{shared_detector, Detector, ModelManager, YoloDetector};
pub use monitor::{Inspection, InspectionResult, ShelfMonitor};
