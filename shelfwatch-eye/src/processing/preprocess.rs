//! Letterbox resize into the square model input

use crate::error::VisionError;
use image::{imageops, imageops::FilterType, DynamicImage, Rgb, RgbImage};

/// Grey used by the upstream library for padding
const PAD_VALUE: u8 = 114;

/// A letterboxed tensor plus what is needed to map boxes back
#[derive(Debug, Clone)]
pub struct Letterbox {
    /// CHW, RGB, values in [0, 1]
    pub tensor: Vec<f32>,
    pub size: u32,
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    /// Map a point from model input space back to source pixels
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

pub fn letterbox(image: &DynamicImage, size: u32) -> Result<Letterbox, VisionError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(VisionError::Processing("Invalid image dimensions".to_string()));
    }
    if size == 0 {
        return Err(VisionError::Processing("Model input size cannot be zero".to_string()));
    }

    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let resized = imageops::resize(&image.to_rgb8(), new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    let plane = (size * size) as usize;
    let mut tensor = vec![0.0f32; plane * 3];
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let idx = (y * size + x) as usize;
        for c in 0..3 {
            tensor[c * plane + idx] = pixel[c] as f32 / 255.0;
        }
    }

    Ok(Letterbox {
        tensor,
        size,
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        source_width: width,
        source_height: height,
    })
}
