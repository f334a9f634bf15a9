//! The inspect pipeline shared by the console and the web front end

use crate::error::VisionError;
use crate::models::Detector;
use crate::processing::{annotate, encode_png};
use image::{DynamicImage, ImageReader, RgbImage};
use shelfwatch_core::{DetectionSet, ImageSource, LogRecord, StockReport, Threshold};
use shelfwatch_storage::StockLog;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of inspecting one image
#[derive(Debug)]
pub enum Inspection {
    /// Nothing exists at the requested path. Detection never ran.
    NotFound(PathBuf),
    Detected(InspectionResult),
}

#[derive(Debug)]
pub struct InspectionResult {
    pub report: StockReport,
    pub detections: DetectionSet,
    pub annotated: RgbImage,
    /// Key assigned by the stock log, when one is attached
    pub log_key: Option<String>,
}

impl InspectionResult {
    pub fn annotated_png(&self) -> Result<Vec<u8>, VisionError> {
        encode_png(&self.annotated)
    }
}

/// Content wins over the extension; uploads are often mislabeled
fn decode_image(path: &Path) -> Result<DynamicImage, VisionError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image)
}

/// Detect, annotate, classify and (optionally) log
pub struct ShelfMonitor {
    detector: Arc<dyn Detector>,
    log: Option<Arc<dyn StockLog>>,
}

impl ShelfMonitor {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self { detector, log: None }
    }

    pub fn with_log(mut self, log: Option<Arc<dyn StockLog>>) -> Self {
        self.log = log;
        self
    }

    pub async fn inspect_path(
        &self,
        path: &Path,
        threshold: Threshold,
        source: ImageSource,
    ) -> Result<Inspection, VisionError> {
        if !path.exists() {
            debug!("No image at {:?}", path);
            return Ok(Inspection::NotFound(path.to_path_buf()));
        }

        let owned = path.to_path_buf();
        let image = tokio::task::spawn_blocking(move || decode_image(&owned))
            .await
            .map_err(|e| VisionError::Processing(format!("Image decoding task failed: {}", e)))??;

        let image_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let result = self.inspect_image(image, threshold, source, image_name).await?;
        Ok(Inspection::Detected(result))
    }

    /// Run the pipeline on an already decoded image
    pub async fn inspect_image(
        &self,
        image: DynamicImage,
        threshold: Threshold,
        source: ImageSource,
        image_name: Option<String>,
    ) -> Result<InspectionResult, VisionError> {
        let detector = self.detector.clone();
        let (detections, annotated) = tokio::task::spawn_blocking(move || {
            let detections = detector.detect(&image)?;
            let annotated = annotate(&image, &detections);
            Ok::<_, VisionError>((detections, annotated))
        })
        .await
        .map_err(|e| VisionError::Processing(format!("Detection task failed: {}", e)))??;

        let report = StockReport::new(detections.len(), threshold);
        info!(
            "{} detected {} products (threshold {}): {}",
            source.as_str(),
            report.count,
            report.threshold,
            report.tier
        );

        let log_key = match &self.log {
            Some(log) => {
                let record = LogRecord::from_report(&report, source, image_name);
                let key = log.append(&record).await?;
                debug!("Logged to {} as {}", log.name(), key);
                Some(key)
            }
            None => None,
        };

        Ok(InspectionResult {
            report,
            detections,
            annotated,
            log_key,
        })
    }
}
