//! Draw detections onto the inspected image

use crate::error::VisionError;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use shelfwatch_core::DetectionSet;
use std::io::Cursor;

const PALETTE: [[u8; 3]; 6] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [72, 249, 10],
    [26, 147, 52],
];

const LINE_WIDTH: i32 = 3;

/// Copy of `image` with one box per detection, coloured by class
pub fn annotate(image: &DynamicImage, detections: &DetectionSet) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let (width, height) = canvas.dimensions();

    for detection in detections {
        let bbox = detection.bbox.clamp_to(width, height);
        let color = Rgb(PALETTE[detection.class_id % PALETTE.len()]);

        for inset in 0..LINE_WIDTH {
            let x = bbox.x1.round() as i32 + inset;
            let y = bbox.y1.round() as i32 + inset;
            let w = bbox.width().round() as i32 - 2 * inset;
            let h = bbox.height().round() as i32 - 2 * inset;
            if w < 1 || h < 1 {
                break;
            }
            draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(w as u32, h as u32), color);
        }
    }

    canvas
}

/// PNG bytes for embedding in a page
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, VisionError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
