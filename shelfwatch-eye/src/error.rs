//! Error types for shelfwatch-eye

use shelfwatch_core::ConfigError;
use shelfwatch_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),

    #[error("OpenCV error: {0}")]
    OpenCv(String),

    #[error("Stock log error: {0}")]
    Storage(#[from] StorageError),
}

impl From<ConfigError> for VisionError {
    fn from(err: ConfigError) -> Self {
        VisionError::Config(err.to_string())
    }
}

impl From<ort::Error> for VisionError {
    fn from(err: ort::Error) -> Self {
        VisionError::Ort(err.to_string())
    }
}

#[cfg(feature = "webcam")]
impl From<opencv::Error> for VisionError {
    fn from(err: opencv::Error) -> Self {
        VisionError::OpenCv(err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::Model("Test error".to_string());
        assert!(err.to_string().contains("Model error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        assert!(matches!(vision_err, VisionError::Io(_)));
    }

    #[test]
    fn test_vision_error_from_storage() {
        let err: VisionError = StorageError::Auth("expired".to_string()).into();
        assert!(err.to_string().contains("Stock log error"));
    }

    #[test]
    fn test_vision_error_from_config() {
        let err: VisionError = ConfigError::ValidationError("bad url".to_string()).into();
        assert!(matches!(err, VisionError::Config(ref msg) if msg.contains("bad url")));
    }
}
