use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use crate::audio::MelMatrix;
use crate::error::{DeepscanError, Result};

/// Logistic sigmoid, mapping a raw logit to a probability.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Binary deepfake classifier backed by an ONNX checkpoint.
///
/// The session expects a `[1, 1, n_mels, n_frames]` f32 tensor and produces a
/// single pre-sigmoid logit.
pub struct Classifier {
    session: Session,
}

impl Classifier {
    /// Deserialize the checkpoint and place it on the available compute
    /// device. With the `cuda` feature the CUDA execution provider is
    /// registered and ort falls back to CPU when no device is present.
    pub fn load(model_path: &Path) -> Result<Self> {
        if !model_path.exists() {
            return Err(DeepscanError::FileNotFound(
                model_path.display().to_string(),
            ));
        }

        info!("Loading classifier checkpoint from {}", model_path.display());

        #[allow(unused_mut)]
        let mut builder = Session::builder()?;

        #[cfg(feature = "cuda")]
        {
            use ort::execution_providers::CUDAExecutionProvider;
            builder =
                builder.with_execution_providers([CUDAExecutionProvider::default().build()])?;
        }

        let session = builder.commit_from_file(model_path)?;

        debug!("Classifier checkpoint loaded");
        Ok(Self { session })
    }

    /// Run a forward pass over the spectrogram and return the sigmoid
    /// probability that the clip is synthetic.
    pub fn score(&self, mel: &MelMatrix) -> Result<f32> {
        let shape = [1usize, 1, mel.n_mels(), mel.n_frames()];
        let input = Tensor::from_array((shape, mel.as_slice().to_vec().into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs![input])?;
        let (_, logits) = outputs[0].try_extract_tensor::<f32>()?;

        let logit = logits.first().copied().ok_or_else(|| {
            DeepscanError::Model("Model returned an empty output tensor".to_string())
        })?;

        Ok(sigmoid(logit))
    }
}

/// Process-wide classifier handle, loaded at most once.
///
/// First access deserializes the checkpoint; concurrent first accesses are
/// serialized by the cell, so the load happens exactly once per process.
pub struct LazyClassifier {
    model_path: PathBuf,
    cell: OnceCell<Arc<Classifier>>,
}

impl LazyClassifier {
    pub fn new(model_path: PathBuf) -> Self {
        Self {
            model_path,
            cell: OnceCell::new(),
        }
    }

    /// Get the shared classifier, loading the checkpoint on first use.
    pub fn get(&self) -> Result<Arc<Classifier>> {
        let classifier = self
            .cell
            .get_or_try_init(|| Classifier::load(&self.model_path).map(Arc::new))?;
        Ok(classifier.clone())
    }

    /// Load the checkpoint now, so a broken model fails at startup rather
    /// than on the first task.
    pub fn warm(&self) -> Result<()> {
        self.get().map(|_| ())
    }

    /// Whether the checkpoint has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}
