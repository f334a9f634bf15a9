//! OpenCV frame conversion

use crate::error::VisionError;
use image::RgbImage;
use opencv::{core::Mat, imgproc, prelude::*};

/// Convert an 8-bit BGR camera frame into an RGB image
pub fn mat_to_rgb_image(mat: &Mat) -> Result<RgbImage, VisionError> {
    let (width, height) = (mat.cols(), mat.rows());
    if width <= 0 || height <= 0 {
        return Err(VisionError::Processing("Invalid frame dimensions".to_string()));
    }
    if mat.channels() != 3 || mat.depth() != opencv::core::CV_8U {
        return Err(VisionError::Processing(format!(
            "Expected an 8-bit 3-channel frame, got {} channels",
            mat.channels()
        )));
    }

    let mut rgb = Mat::default();
    imgproc::cvt_color(mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

    // Camera frames may be views into a larger buffer
    let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };
    let bytes = rgb.data_bytes()?.to_vec();

    RgbImage::from_raw(width as u32, height as u32, bytes)
        .ok_or_else(|| VisionError::Processing("Frame buffer size mismatch".to_string()))
}
