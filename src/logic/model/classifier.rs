//! Skin-Type Classifier - EfficientNet ONNX export
//!
//! 224×224 RGB, ImageNet mean/std, logits → softmax over {Dry, Normal, Oily}.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use parking_lot::Mutex;

use super::artifact::{load_session, ArtifactInfo};
use super::{InferenceError, SkinTypeClassifier};
use crate::logic::error::{DiagnosticError, DiagnosticResult};
use crate::logic::skin::SKIN_TYPE_COUNT;

pub const CLASSIFIER_INPUT_SIZE: u32 = 224;
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

pub struct OnnxSkinTypeClassifier {
    session: Mutex<Session>,
    output_name: String,
    info: ArtifactInfo,
}

impl OnnxSkinTypeClassifier {
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> DiagnosticResult<Self> {
        let (session, info) = load_session("classifier", path, expected_sha256)?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| DiagnosticError::model_unavailable("classifier", "no output defined"))?;

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            info,
        })
    }

    pub fn info(&self) -> &ArtifactInfo {
        &self.info
    }
}

impl SkinTypeClassifier for OnnxSkinTypeClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
        let input_tensor = Value::from_array(preprocess(image))
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError("No output".to_string()))?;

        let (_, logits) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        if logits.len() != SKIN_TYPE_COUNT {
            return Err(InferenceError(format!(
                "classifier returned {} logits, expected {}",
                logits.len(),
                SKIN_TYPE_COUNT
            )));
        }

        softmax(logits)
    }
}

/// Resize, scale to [0,1], normalize per channel, NCHW
pub fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let size = CLASSIFIER_INPUT_SIZE;
    let resized = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let side = size as usize;

    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            input[[0, c, y as usize, x as usize]] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    input
}

/// Numerically stable softmax. Non-finite logits are an error.
pub fn softmax(logits: &[f32]) -> Result<Vec<f32>, InferenceError> {
    if let Some(bad) = logits.iter().find(|l| !l.is_finite()) {
        return Err(InferenceError(format!("non-finite logit {} in {:?}", bad, logits)));
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return Err(InferenceError(format!("softmax is undefined for {:?}", logits)));
    }
    Ok(exps.into_iter().map(|e| e / sum).collect())
}
