//! Decoding of YOLO detection heads

use crate::error::VisionError;
use crate::processing::preprocess::Letterbox;
use shelfwatch_core::config::ModelConfig;
use shelfwatch_core::{BoundingBox, Detection};

/// Cut-offs applied while decoding, mirroring the upstream library defaults
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    pub confidence: f32,
    pub iou: f32,
    pub max_detections: usize,
}

impl From<&ModelConfig> for DecodeParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            confidence: config.confidence,
            iou: config.iou,
            max_detections: config.max_detections,
        }
    }
}

/// Decode a `[1, 4 + classes, anchors]` (or transposed `[1, anchors, 4 + classes]`)
/// output into detections in source-image pixels.
pub fn decode_output(
    data: &[f32],
    dims: &[i64],
    letterbox: &Letterbox,
    params: DecodeParams,
    label_for: impl Fn(usize) -> String,
) -> Result<Vec<Detection>, VisionError> {
    if dims.len() != 3 || dims[0] != 1 {
        return Err(VisionError::Model(format!("Unexpected output shape {:?}", dims)));
    }

    let (a, b) = (dims[1] as usize, dims[2] as usize);
    // Attributes are always fewer than anchors
    let (attrs, anchors, transposed) = if a <= b { (a, b, false) } else { (b, a, true) };
    if attrs < 5 {
        return Err(VisionError::Model(format!("Output has no class scores: {:?}", dims)));
    }
    let expected = attrs
        .checked_mul(anchors)
        .ok_or_else(|| VisionError::Model("Output shape overflows".to_string()))?;
    if data.len() != expected {
        return Err(VisionError::Model(format!(
            "Output holds {} values, shape {:?} needs {}",
            data.len(),
            dims,
            expected
        )));
    }

    let at = |attr: usize, anchor: usize| -> f32 {
        if transposed {
            data[anchor * attrs + attr]
        } else {
            data[attr * anchors + anchor]
        }
    };

    let num_classes = attrs - 4;
    let mut candidates = Vec::new();

    for anchor in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for class in 0..num_classes {
            let score = at(4 + class, anchor);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }

        if !best_score.is_finite() || best_score <= params.confidence {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        let boxed = BoundingBox::from_center(cx, cy, w, h);
        let (x1, y1) = letterbox.to_source(boxed.x1, boxed.y1);
        let (x2, y2) = letterbox.to_source(boxed.x2, boxed.y2);
        let bbox = BoundingBox::new(x1, y1, x2, y2)
            .clamp_to(letterbox.source_width, letterbox.source_height);

        candidates.push(Detection {
            bbox,
            class_id: best_class,
            label: label_for(best_class),
            confidence: best_score.min(1.0),
        });
    }

    Ok(non_max_suppression(candidates, params.iou, params.max_detections))
}

/// Greedy per-class suppression, highest confidence first
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32, max_detections: usize) -> Vec<Detection> {
    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        if keep.len() >= max_detections {
            break;
        }
        let overlaps = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && kept.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}
