//! YOLO shelf detector on ONNX Runtime

use crate::error::VisionError;
use crate::models::Detector;
use crate::processing::{decode_output, letterbox, DecodeParams};
use image::DynamicImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use shelfwatch_core::config::ModelConfig;
use shelfwatch_core::DetectionSet;
use std::path::Path;
use tracing::{debug, info};

/// Exported YOLO model.
///
/// `ort` needs exclusive access to run a session, so concurrent callers
/// take turns on the mutex.
pub struct YoloDetector {
    session: Mutex<Session>,
    config: ModelConfig,
}

impl YoloDetector {
    pub fn load(model_path: &Path, config: &ModelConfig) -> Result<Self, VisionError> {
        let session = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::Ort(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;

        info!("YOLO model loaded from {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
            config: config.clone(),
        })
    }

    fn infer(&self, input: Vec<f32>, size: usize) -> Result<(Vec<i64>, Vec<f32>), VisionError> {
        let tensor = Tensor::from_array(([1usize, 3, size, size], input))
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| VisionError::Ort(format!("YOLO inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to extract output tensor: {}", e)))?;

        Ok((shape.iter().copied().collect(), data.to_vec()))
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &DynamicImage) -> Result<DetectionSet, VisionError> {
        let mut prepared = letterbox(image, self.config.input_size)?;
        let input = std::mem::take(&mut prepared.tensor);

        let (dims, data) = self.infer(input, prepared.size as usize)?;
        debug!("YOLO output shape: {:?}", dims);

        let detections = decode_output(
            &data,
            &dims,
            &prepared,
            DecodeParams::from(&self.config),
            |class_id| self.config.label_for(class_id),
        )?;

        debug!("YOLO detected {} objects", detections.len());
        Ok(DetectionSet::new(detections, image.width(), image.height()))
    }
}
