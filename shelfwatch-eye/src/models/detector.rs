//! The detection seam and the process-wide model handle

use crate::error::VisionError;
use crate::models::{ModelManager, YoloDetector};
use image::DynamicImage;
use shelfwatch_core::config::ModelConfig;
use shelfwatch_core::DetectionSet;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Maps one image to every object the model found in it
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<DetectionSet, VisionError>;
}

static SHARED: OnceCell<Arc<YoloDetector>> = OnceCell::const_new();

/// The process-wide detector, downloaded and loaded on first use only.
///
/// Later calls return the same handle and ignore `config`.
pub async fn shared_detector(config: &ModelConfig) -> Result<Arc<YoloDetector>, VisionError> {
    let detector = SHARED
        .get_or_try_init(|| async {
            let path = ModelManager::new(config.clone()).ensure_model_available().await?;
            let model_config = config.clone();
            let detector = tokio::task::spawn_blocking(move || YoloDetector::load(&path, &model_config))
                .await
                .map_err(|e| VisionError::Model(format!("Model loading task failed: {}", e)))??;
            info!("Detector ready");
            Ok::<_, VisionError>(Arc::new(detector))
        })
        .await?;
    Ok(detector.clone())
}
