//! Contextual Corrector - tree-ensemble ONNX export
//!
//! Input is the aligned vector as `[1, N]`. Converters emit a label output
//! (int64) and a probability output (float, `[1, K]`); when the label output
//! is absent the label is the arg-max of the probabilities.

use std::path::Path;

use ndarray::Array2;
use ort::session::Session;
use ort::value::Value;
use parking_lot::Mutex;

use super::artifact::{load_session, ArtifactInfo};
use super::{ContextualCorrector, Correction, InferenceError};
use crate::logic::error::{DiagnosticError, DiagnosticResult};

pub struct OnnxContextualCorrector {
    session: Mutex<Session>,
    probability_output: String,
    label_output: Option<String>,
    info: ArtifactInfo,
}

impl OnnxContextualCorrector {
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> DiagnosticResult<Self> {
        let (session, info) = load_session("corrector", path, expected_sha256)?;

        let names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let label_output = names.iter().find(|n| n.to_ascii_lowercase().contains("label")).cloned();
        let probability_output = names
            .iter()
            .find(|n| n.to_ascii_lowercase().contains("prob"))
            .or_else(|| names.iter().find(|n| Some(*n) != label_output.as_ref()))
            .cloned()
            .ok_or_else(|| DiagnosticError::model_unavailable("corrector", "no probability output"))?;

        log::debug!(
            "Corrector outputs: probabilities='{}', label={:?}",
            probability_output,
            label_output
        );

        Ok(Self {
            session: Mutex::new(session),
            probability_output,
            label_output,
            info,
        })
    }

    pub fn info(&self) -> &ArtifactInfo {
        &self.info
    }
}

impl ContextualCorrector for OnnxContextualCorrector {
    fn correct(&self, features: &[f32]) -> Result<Correction, InferenceError> {
        let input = Array2::<f32>::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| InferenceError(format!("Array error: {}", e)))?;
        let input_tensor = Value::from_array(input)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let probabilities = outputs
            .get(&self.probability_output)
            .ok_or_else(|| InferenceError("No probability output".to_string()))?;
        let (_, distribution) = probabilities
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        let label = match &self.label_output {
            Some(name) => {
                let output = outputs
                    .get(name)
                    .ok_or_else(|| InferenceError("No label output".to_string()))?;
                let (_, labels) = output
                    .try_extract_tensor::<i64>()
                    .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;
                labels.first().copied()
            }
            None => None,
        };

        interpret_outputs(label, distribution)
    }
}

/// Combine the optional label output with the distribution
pub fn interpret_outputs(label: Option<i64>, distribution: &[f32]) -> Result<Correction, InferenceError> {
    if distribution.is_empty() {
        return Err(InferenceError("corrector returned an empty distribution".to_string()));
    }

    let label_id = match label {
        Some(id) => id,
        None => distribution
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
            .0 as i64,
    };

    Ok(Correction {
        label_id,
        distribution: distribution.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_output_wins() {
        let correction = interpret_outputs(Some(3), &[0.5, 0.1, 0.1, 0.3]).unwrap();
        assert_eq!(correction.label_id, 3);
        assert!((correction.confidence() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_arg_max_without_label_output() {
        let correction = interpret_outputs(None, &[0.1, 0.6, 0.3]).unwrap();
        assert_eq!(correction.label_id, 1);

        // Ties resolve to the lowest index
        let correction = interpret_outputs(None, &[0.4, 0.4, 0.2]).unwrap();
        assert_eq!(correction.label_id, 0);
    }

    #[test]
    fn test_empty_distribution_is_error() {
        assert!(interpret_outputs(Some(0), &[]).is_err());
    }
}
