//! Tests for the shared inspect pipeline, using a stand-in detector

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use shelfwatch_core::{
    BoundingBox, Detection, DetectionSet, ImageSource, LogRecord, StockTier, Threshold,
};
use shelfwatch_eye::{Detector, Inspection, ShelfMonitor, VisionError};
use shelfwatch_storage::{MemoryLog, StockLog, StorageError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Reports a fixed number of boxes and counts how often it ran
struct MockDetector {
    boxes: usize,
    calls: AtomicUsize,
}

impl MockDetector {
    fn new(boxes: usize) -> Arc<Self> {
        Arc::new(Self { boxes, calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Detector for MockDetector {
    fn detect(&self, image: &DynamicImage) -> Result<DetectionSet, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let detections = (0..self.boxes)
            .map(|i| Detection {
                bbox: BoundingBox::new(i as f32 * 6.0, 2.0, i as f32 * 6.0 + 5.0, 10.0),
                class_id: 0,
                label: "product".to_string(),
                confidence: 0.9,
            })
            .collect();
        Ok(DetectionSet::new(detections, image.width(), image.height()))
    }
}

struct FailingLog;

#[async_trait]
impl StockLog for FailingLog {
    async fn append(&self, _record: &LogRecord) -> Result<String, StorageError> {
        Err(StorageError::Rejected { status: 401, body: "Permission denied".to_string() })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

fn write_shelf_image(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    RgbImage::from_pixel(64, 32, Rgb([200, 200, 200])).save(&path).unwrap();
    path
}

fn threshold(value: u32) -> Threshold {
    Threshold::new(value).unwrap()
}

#[tokio::test]
async fn test_missing_file_never_runs_detector() {
    let detector = MockDetector::new(3);
    let monitor = ShelfMonitor::new(detector.clone());

    let missing = std::path::Path::new("/nonexistent/shelf.jpg");
    let outcome = monitor
        .inspect_path(missing, threshold(5), ImageSource::File)
        .await
        .unwrap();

    assert!(matches!(outcome, Inspection::NotFound(ref p) if p == missing));
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_inspect_classifies_count() {
    let dir = TempDir::new().unwrap();
    let path = write_shelf_image(&dir, "shelf.png");

    for (boxes, expected) in [
        (3, StockTier::Understocked),
        (5, StockTier::AtThreshold),
        (8, StockTier::Sufficient),
    ] {
        let monitor = ShelfMonitor::new(MockDetector::new(boxes));
        match monitor.inspect_path(&path, threshold(5), ImageSource::File).await.unwrap() {
            Inspection::Detected(result) => {
                assert_eq!(result.report.count, boxes);
                assert_eq!(result.report.tier, expected);
                assert_eq!(result.detections.len(), boxes);
                assert_eq!(result.annotated.dimensions(), (64, 32));
                assert!(result.log_key.is_none());
            }
            other => panic!("Expected detection, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_inspect_appends_log_record() {
    let dir = TempDir::new().unwrap();
    let path = write_shelf_image(&dir, "aisle_4.png");
    let log = Arc::new(MemoryLog::new());
    let sink: Arc<dyn StockLog> = log.clone();
    let monitor = ShelfMonitor::new(MockDetector::new(2)).with_log(Some(sink));

    let outcome = monitor
        .inspect_path(&path, threshold(4), ImageSource::Webcam)
        .await
        .unwrap();

    let Inspection::Detected(result) = outcome else {
        panic!("Expected detection");
    };
    assert_eq!(result.log_key.as_deref(), Some("memory-1"));

    let records = log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].count, 2);
    assert_eq!(records[0].threshold, 4);
    assert_eq!(records[0].tier, StockTier::Understocked);
    assert_eq!(records[0].source, ImageSource::Webcam);
    assert_eq!(records[0].image_name.as_deref(), Some("aisle_4.png"));
}

#[tokio::test]
async fn test_log_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write_shelf_image(&dir, "shelf.png");
    let sink: Arc<dyn StockLog> = Arc::new(FailingLog);
    let monitor = ShelfMonitor::new(MockDetector::new(1)).with_log(Some(sink));

    let err = monitor
        .inspect_path(&path, threshold(5), ImageSource::Upload)
        .await
        .unwrap_err();
    assert!(matches!(err, VisionError::Storage(StorageError::Rejected { status: 401, .. })));
}

#[tokio::test]
async fn test_undecodable_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"not an image").unwrap();
    let detector = MockDetector::new(1);
    let monitor = ShelfMonitor::new(detector.clone());

    let err = monitor
        .inspect_path(&path, threshold(5), ImageSource::File)
        .await
        .unwrap_err();
    assert!(matches!(err, VisionError::Image(_)));
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_annotated_png_encodes() {
    let monitor = ShelfMonitor::new(MockDetector::new(1));
    let image = DynamicImage::ImageRgb8(RgbImage::new(16, 16));
    let result = monitor
        .inspect_image(image, threshold(1), ImageSource::Camera, None)
        .await
        .unwrap();

    assert_eq!(result.report.tier, StockTier::AtThreshold);
    let png = result.annotated_png().unwrap();
    assert_eq!(&png[..4], b"\x89PNG");
}
