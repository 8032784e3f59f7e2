//! Lesion Detector - YOLOv8 ONNX export
//!
//! Output tensor is `[1, 4 + classes, anchors]` (cx, cy, w, h, class scores)
//! in input-pixel space. Decode keeps each anchor's best class, applies the
//! confidence floor, runs class-wise greedy NMS and rescales boxes back to
//! the source image.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::artifact::{load_session, ArtifactInfo};
use super::{InferenceError, LesionDetector};
use crate::logic::detection::{BoundingBox, RawDetection};
use crate::logic::error::{DiagnosticError, DiagnosticResult};

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Square network input side in pixels
    pub input_size: u32,
    /// Anchors below this score are discarded before NMS
    pub confidence_min: f32,
    pub iou_threshold: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_min: 0.10,
            iou_threshold: 0.7,
        }
    }
}

// ============================================================================
// ONNX DETECTOR
// ============================================================================

pub struct OnnxLesionDetector {
    session: Mutex<Session>,
    output_name: String,
    settings: DetectorSettings,
    info: ArtifactInfo,
}

impl OnnxLesionDetector {
    pub fn load(
        path: &std::path::Path,
        expected_sha256: Option<&str>,
        settings: DetectorSettings,
    ) -> DiagnosticResult<Self> {
        let (session, info) = load_session("detector", path, expected_sha256)?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| DiagnosticError::model_unavailable("detector", "no output defined"))?;

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            settings,
            info,
        })
    }

    pub fn info(&self) -> &ArtifactInfo {
        &self.info
    }
}

impl LesionDetector for OnnxLesionDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, InferenceError> {
        let (width, height) = image.dimensions();
        let input = preprocess(image, self.settings.input_size)?;
        let scale = (
            width as f32 / self.settings.input_size as f32,
            height as f32 / self.settings.input_size as f32,
        );

        let input_tensor = Value::from_array(input)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError("No output".to_string()))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();

        decode_yolo_output(data, &dims, &self.settings, scale)
    }
}

/// RGB, stretched to `size`×`size`, scaled to [0,1], NCHW
fn preprocess(image: &DynamicImage, size: u32) -> Result<Array4<f32>, InferenceError> {
    let resized = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let side = size as usize;

    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = pixel.0[c] as f32 / 255.0;
        }
    }
    Ok(input)
}

// ============================================================================
// DECODE
// ============================================================================

/// Turn a raw YOLOv8 output into detections in source-image coordinates.
///
/// Accepts `[1, 4 + classes, anchors]` and the transposed
/// `[1, anchors, 4 + classes]` layout.
pub fn decode_yolo_output(
    data: &[f32],
    shape: &[usize],
    settings: &DetectorSettings,
    scale: (f32, f32),
) -> Result<Vec<RawDetection>, InferenceError> {
    let (rows, cols) = match shape {
        [1, rows, cols] => (*rows, *cols),
        _ => return Err(InferenceError(format!("unexpected detector output shape {:?}", shape))),
    };
    if data.len() != rows * cols {
        return Err(InferenceError(format!(
            "detector output has {} values, shape {:?} needs {}",
            data.len(),
            shape,
            rows * cols
        )));
    }

    // Fewer attributes than anchors is the usual case
    let transposed = rows > cols;
    let (attributes, anchors) = if transposed { (cols, rows) } else { (rows, cols) };
    if attributes < 5 {
        return Err(InferenceError(format!("detector output has {} attributes", attributes)));
    }
    let at = |attr: usize, anchor: usize| -> f32 {
        if transposed {
            data[anchor * attributes + attr]
        } else {
            data[attr * anchors + anchor]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for class in 0..attributes - 4 {
            let score = at(4 + class, anchor);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }
        if !best_score.is_finite() || best_score < settings.confidence_min {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        let bbox = BoundingBox::new(
            (cx - w / 2.0) * scale.0,
            (cy - h / 2.0) * scale.1,
            (cx + w / 2.0) * scale.0,
            (cy + h / 2.0) * scale.1,
        );
        candidates.push(RawDetection::new(best_class as i64, best_score, bbox));
    }

    Ok(non_max_suppression(candidates, settings.iou_threshold))
}

/// Class-wise greedy NMS, highest confidence first
fn non_max_suppression(mut candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.class_id.cmp(&b.class_id))
    });

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
