use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audio::{load_waveform, pad_or_trim, MelSpectrogram, CLIP_SAMPLES, SAMPLE_RATE};
use crate::classifier::LazyClassifier;
use crate::error::Result;

/// Decision threshold on the sigmoid probability. Probabilities strictly
/// above it are classified as synthetic.
pub const FAKE_THRESHOLD: f32 = 0.5;

const FILE_NOT_FOUND: &str = "file not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Real,
    Fake,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Real => write!(f, "real"),
            Label::Fake => write!(f, "fake"),
        }
    }
}

/// Result mapping of one analysis task: either a verdict or the structured
/// error for a missing input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Verdict { prediction: Label, confidence: f64 },
    Error { error: String },
}

impl AnalysisOutcome {
    /// Build a verdict from a raw sigmoid probability.
    ///
    /// Probability strictly greater than 0.5 means `fake`; the boundary
    /// itself is `real`. Confidence is rounded to 4 decimal places.
    pub fn from_probability(prob: f32) -> Self {
        let prediction = if prob > FAKE_THRESHOLD {
            Label::Fake
        } else {
            Label::Real
        };

        AnalysisOutcome::Verdict {
            prediction,
            confidence: round_confidence(prob),
        }
    }

    pub fn file_not_found() -> Self {
        AnalysisOutcome::Error {
            error: FILE_NOT_FOUND.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnalysisOutcome::Error { .. })
    }
}

fn round_confidence(prob: f32) -> f64 {
    (prob as f64 * 10_000.0).round() / 10_000.0
}

/// Analyze an audio file for synthetic speech.
///
/// A missing input path is the one locally-recovered failure mode: it yields
/// the structured error outcome without touching the classifier. Decode and
/// inference failures propagate to the caller as task failures.
pub fn analyze_audio(file_path: &Path, classifier: &LazyClassifier) -> Result<AnalysisOutcome> {
    if !file_path.exists() {
        debug!("Input not found: {}", file_path.display());
        return Ok(AnalysisOutcome::file_not_found());
    }

    let samples = load_waveform(file_path, SAMPLE_RATE)?;
    let samples = pad_or_trim(samples, CLIP_SAMPLES);

    let mel = MelSpectrogram::new().compute_db(&samples);

    let model = classifier.get()?;
    let prob = model.score(&mel)?;

    let outcome = AnalysisOutcome::from_probability(prob);
    info!(
        "Analyzed {}: probability {:.4}",
        file_path.display(),
        prob
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_outcome() {
        let classifier = LazyClassifier::new(PathBuf::from("/nonexistent/model.onnx"));
        let outcome = analyze_audio(Path::new("/nonexistent/audio.wav"), &classifier).unwrap();

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({"error": "file not found"}));
    }

    #[test]
    fn test_missing_file_does_not_load_model() {
        let classifier = LazyClassifier::new(PathBuf::from("/nonexistent/model.onnx"));
        let _ = analyze_audio(Path::new("/nonexistent/audio.wav"), &classifier).unwrap();
        assert!(!classifier.is_loaded());
    }

    #[test]
    fn test_threshold_boundary_is_real() {
        let outcome = AnalysisOutcome::from_probability(0.5);
        match outcome {
            AnalysisOutcome::Verdict { prediction, .. } => assert_eq!(prediction, Label::Real),
            other => panic!("Expected verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_above_threshold_is_fake() {
        let outcome = AnalysisOutcome::from_probability(0.5001);
        match outcome {
            AnalysisOutcome::Verdict { prediction, .. } => assert_eq!(prediction, Label::Fake),
            other => panic!("Expected verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_confidence_rounded_to_four_places() {
        let outcome = AnalysisOutcome::from_probability(0.123_456);
        match outcome {
            AnalysisOutcome::Verdict { confidence, .. } => {
                assert!((confidence - 0.1235).abs() < 1e-9)
            }
            other => panic!("Expected verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_confidence_in_unit_interval() {
        for &p in &[0.0f32, 0.25, 0.5, 0.75, 1.0] {
            match AnalysisOutcome::from_probability(p) {
                AnalysisOutcome::Verdict { confidence, .. } => {
                    assert!((0.0..=1.0).contains(&confidence))
                }
                other => panic!("Expected verdict, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_verdict_serialization_keys() {
        let outcome = AnalysisOutcome::from_probability(0.9);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({"prediction": "fake", "confidence": 0.9}));
    }

    #[test]
    fn test_outcome_roundtrip() {
        let outcome = AnalysisOutcome::from_probability(0.3);
        let text = serde_json::to_string(&outcome).unwrap();
        let parsed: AnalysisOutcome = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, outcome);

        let error = AnalysisOutcome::file_not_found();
        let text = serde_json::to_string(&error).unwrap();
        let parsed: AnalysisOutcome = serde_json::from_str(&text).unwrap();
        assert!(parsed.is_error());
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::Real.to_string(), "real");
        assert_eq!(Label::Fake.to_string(), "fake");
    }
}
