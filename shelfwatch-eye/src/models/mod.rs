//! Detection model management and inference

pub mod detector;
pub mod manager;
pub mod yolo;

pub use detector::{shared_detector, Detector};
pub use manager::ModelManager;
pub use yolo::YoloDetector;
