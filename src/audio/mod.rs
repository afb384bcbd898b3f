pub mod decode;
pub mod mel;

pub use decode::{check_ffmpeg, load_waveform, pad_or_trim};
pub use mel::{MelMatrix, MelSpectrogram};

/// Sample rate the classifier was trained at.
pub const SAMPLE_RATE: u32 = 22050;

/// Mel bands in the spectrogram fed to the model.
pub const N_MELS: usize = 128;

/// Analysis window length in seconds. Shorter clips are zero-padded,
/// longer ones truncated.
pub const CLIP_SECONDS: usize = 3;

/// Exact sample count of one analysis window.
pub const CLIP_SAMPLES: usize = SAMPLE_RATE as usize * CLIP_SECONDS;

/// FFT size for the short-time transform.
pub const N_FFT: usize = 2048;

/// Hop between STFT frames.
pub const HOP_LENGTH: usize = 512;

/// Dynamic range floor, in dB below the per-clip maximum.
pub const TOP_DB: f32 = 80.0;

/// STFT frame count for one analysis window (centered frames).
pub const CLIP_FRAMES: usize = CLIP_SAMPLES / HOP_LENGTH + 1;
