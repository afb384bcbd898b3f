use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeepscanError {
    #[error("Audio decode failed: {0}")]
    AudioDecode(String),

    #[error("Frame extraction failed: {0}")]
    FrameExtraction(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] ort::Error),

    #[error("Model error: {0}")]
    Model(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Queue error: {0}")]
    Queue(#[from] redis::RedisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DeepscanError>;
