pub mod analysis;
pub mod audio;
pub mod classifier;
pub mod config;
pub mod error;
pub mod queue;
pub mod video;
pub mod worker;

pub use analysis::{analyze_audio, AnalysisOutcome, Label};
pub use classifier::{Classifier, LazyClassifier};
pub use config::Config;
pub use error::{DeepscanError, Result};
pub use video::{extract_frames, extract_frames_into, FrameBatch};
