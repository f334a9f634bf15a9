// Shelfwatch interactive console
// Numbered menu: inspect a file, capture from the webcam, or exit

use anyhow::Result;
use shelfwatch_core::config::CameraConfig;
use shelfwatch_core::{ImageSource, StockTier, Threshold};
use shelfwatch_eye::{CaptureOutcome, Inspection, ShelfMonitor, VisionError, WebcamCapture};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// One line of menu input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Upload,
    Capture,
    Exit,
    Invalid,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "1" => MenuChoice::Upload,
            "2" => MenuChoice::Capture,
            "3" => MenuChoice::Exit,
            _ => MenuChoice::Invalid,
        }
    }
}

pub struct ShelfConsole {
    monitor: Arc<ShelfMonitor>,
    webcam: WebcamCapture,
    threshold: Threshold,
    annotated_output: Option<PathBuf>,
}

impl ShelfConsole {
    pub fn new(
        monitor: Arc<ShelfMonitor>,
        camera: CameraConfig,
        threshold: Threshold,
        annotated_output: Option<PathBuf>,
    ) -> Self {
        Self {
            monitor,
            webcam: WebcamCapture::new(camera),
            threshold,
            annotated_output,
        }
    }

    /// Run the menu until the operator exits or input ends
    pub async fn run<R: BufRead, W: Write>(&self, mut input: R, out: &mut W) -> Result<()> {
        loop {
            writeln!(out, "\nChoose an option:")?;
            writeln!(out, "1. Upload an image for detection")?;
            writeln!(out, "2. Capture an image with camera")?;
            writeln!(out, "3. Exit")?;
            write!(out, "Enter choice (1/2/3): ")?;
            out.flush()?;

            let Some(line) = read_line(&mut input)? else {
                return Ok(());
            };

            match MenuChoice::parse(&line) {
                MenuChoice::Upload => {
                    write!(out, "Enter image file path: ")?;
                    out.flush()?;
                    let Some(path) = read_line(&mut input)? else {
                        return Ok(());
                    };
                    self.report(out, Path::new(path.trim()), ImageSource::File).await?;
                }
                MenuChoice::Capture => self.capture_and_detect(out).await?,
                MenuChoice::Exit => {
                    writeln!(out, "Exiting program.")?;
                    return Ok(());
                }
                MenuChoice::Invalid => writeln!(out, "Invalid choice. Try again.")?,
            }
        }
    }

    async fn capture_and_detect<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Press SPACE to capture image | Press ESC to exit")?;
        out.flush()?;

        // The preview loop blocks until a key press
        let webcam = self.webcam.clone();
        let captured = tokio::task::spawn_blocking(move || webcam.capture_interactive())
            .await
            .map_err(|e| VisionError::Processing(format!("Webcam task failed: {}", e)))
            .and_then(|outcome| outcome);

        match captured {
            Ok(CaptureOutcome::Captured(path)) => {
                writeln!(out, "Image saved as {}", path.display())?;
                self.report(out, &path, ImageSource::Webcam).await
            }
            Ok(CaptureOutcome::Cancelled) => {
                writeln!(out, "Exiting without capture.")?;
                Ok(())
            }
            Ok(CaptureOutcome::Unavailable(reason)) => {
                debug!("Webcam unavailable: {}", reason);
                writeln!(out, "Could not access webcam.")?;
                Ok(())
            }
            Err(e) => {
                error!("Webcam capture failed: {}", e);
                writeln!(out, "Error: {}", e)?;
                Ok(())
            }
        }
    }

    /// Inspect one image and print the outcome. Pipeline errors end the
    /// operation only; write errors on `out` end the console.
    async fn report<W: Write>(&self, out: &mut W, path: &Path, source: ImageSource) -> Result<()> {
        let result = match self.monitor.inspect_path(path, self.threshold, source).await {
            Ok(Inspection::Detected(result)) => result,
            Ok(Inspection::NotFound(_)) => {
                writeln!(out, "File not found.")?;
                return Ok(());
            }
            Err(e) => {
                error!("Detection failed for {:?}: {}", path, e);
                writeln!(out, "Error: {}", e)?;
                return Ok(());
            }
        };

        writeln!(out, "Detected Products: {}", result.report.count)?;
        let marker = match result.report.tier {
            StockTier::Sufficient => "[OK]",
            StockTier::AtThreshold => "[WARN]",
            StockTier::Understocked => "[ALERT]",
        };
        writeln!(out, "{} {}", marker, result.report.message())?;

        if let Some(target) = &self.annotated_output {
            match result.annotated.save(target) {
                Ok(()) => writeln!(out, "Annotated image saved to {}", target.display())?,
                Err(e) => {
                    error!("Failed to write annotated image: {}", e);
                    writeln!(out, "Error: could not save annotated image: {}", e)?;
                }
            }
        }
        if let Some(key) = &result.log_key {
            debug!("Stock decision logged as {}", key);
        }
        Ok(())
    }
}

/// `None` once input is exhausted
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use shelfwatch_core::{BoundingBox, Detection, DetectionSet};
    use shelfwatch_eye::Detector;
    use std::io::Cursor;
    use tempfile::TempDir;

    struct FixedDetector(usize);

    impl Detector for FixedDetector {
        fn detect(&self, image: &DynamicImage) -> Result<DetectionSet, VisionError> {
            let detections = (0..self.0)
                .map(|i| Detection {
                    bbox: BoundingBox::new(i as f32 * 4.0, 0.0, i as f32 * 4.0 + 3.0, 3.0),
                    class_id: 0,
                    label: "product".to_string(),
                    confidence: 0.7,
                })
                .collect();
            Ok(DetectionSet::new(detections, image.width(), image.height()))
        }
    }

    fn console(boxes: usize, annotated_output: Option<PathBuf>) -> ShelfConsole {
        let monitor = Arc::new(ShelfMonitor::new(Arc::new(FixedDetector(boxes))));
        ShelfConsole::new(monitor, CameraConfig::default(), Threshold::default(), annotated_output)
    }

    async fn run_with(console: &ShelfConsole, input: &str) -> String {
        let mut out = Vec::new();
        console.run(Cursor::new(input.to_string()), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_menu_choice_parse() {
        assert_eq!(MenuChoice::parse("1\n"), MenuChoice::Upload);
        assert_eq!(MenuChoice::parse(" 2 "), MenuChoice::Capture);
        assert_eq!(MenuChoice::parse("3"), MenuChoice::Exit);
        assert_eq!(MenuChoice::parse("4"), MenuChoice::Invalid);
        assert_eq!(MenuChoice::parse(""), MenuChoice::Invalid);
        assert_eq!(MenuChoice::parse("exit"), MenuChoice::Invalid);
    }

    #[tokio::test]
    async fn test_invalid_choice_then_exit() {
        let output = run_with(&console(0, None), "9\n3\n").await;
        assert!(output.contains("Invalid choice. Try again."));
        assert!(output.ends_with("Exiting program.\n"));
    }

    #[tokio::test]
    async fn test_missing_file_returns_to_menu() {
        let output = run_with(&console(0, None), "1\n/nonexistent/shelf.jpg\n3\n").await;
        assert!(output.contains("File not found."));
        assert!(output.contains("Exiting program."));
        assert!(!output.contains("Detected Products"));
    }

    #[tokio::test]
    async fn test_upload_reports_stock_and_saves_annotation() {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("shelf.png");
        RgbImage::from_pixel(32, 16, Rgb([90, 90, 90])).save(&image_path).unwrap();
        let annotated = dir.path().join("annotated.png");

        let console = console(6, Some(annotated.clone()));
        let output = run_with(&console, &format!("1\n{}\n3\n", image_path.display())).await;

        assert!(output.contains("Detected Products: 6"));
        assert!(output.contains("[OK] Stock level is sufficient: 6 products detected."));
        assert!(annotated.exists());
        // the inspected file is left alone
        assert!(image_path.exists());
    }

    #[tokio::test]
    async fn test_understocked_alert() {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("shelf.png");
        RgbImage::new(16, 16).save(&image_path).unwrap();

        let output = run_with(&console(2, None), &format!("1\n{}\n3\n", image_path.display())).await;
        assert!(output.contains("[ALERT] ALERT: Only 2 products detected. Restock needed!"));
    }

    #[tokio::test]
    async fn test_end_of_input_stops_quietly() {
        let output = run_with(&console(0, None), "1\n").await;
        assert!(output.contains("Enter image file path: "));
        assert!(!output.contains("Exiting program."));
    }

    #[cfg(not(feature = "webcam"))]
    #[tokio::test]
    async fn test_webcam_unavailable_without_feature() {
        // twice: each capture round-trips through the blocking pool
        let output = run_with(&console(0, None), "2\n2\n3\n").await;
        assert_eq!(output.matches("Could not access webcam.").count(), 2);
        assert!(output.contains("Exiting program."));
    }
}
