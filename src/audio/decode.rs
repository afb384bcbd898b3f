use std::path::Path;
use std::process::Command;

use hound::WavReader;
use tracing::{debug, info};

use crate::error::{DeepscanError, Result};

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        DeepscanError::AudioDecode(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(DeepscanError::AudioDecode(
            "FFmpeg check failed".to_string(),
        ));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Load a mono waveform from an audio file, resampled to `sample_rate`.
///
/// WAV files already at the target rate are read directly; anything else is
/// decoded through FFmpeg into a temporary PCM WAV first. Samples are
/// normalized to [-1, 1].
pub fn load_waveform(input: &Path, sample_rate: u32) -> Result<Vec<f32>> {
    if !input.exists() {
        return Err(DeepscanError::FileNotFound(input.display().to_string()));
    }

    if let Ok(reader) = WavReader::open(input) {
        if reader.spec().sample_rate == sample_rate {
            debug!("Reading WAV directly from {}", input.display());
            return read_wav_mono(reader);
        }
    }

    check_ffmpeg()?;

    let temp = tempfile::Builder::new()
        .prefix("deepscan_decode_")
        .suffix(".wav")
        .tempfile()?;
    let temp_path = temp.path();

    info!("Decoding {} via FFmpeg", input.display());

    let output = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar"])
        .arg(sample_rate.to_string())
        .args(["-ac", "1"])
        .arg(temp_path)
        .output()
        .map_err(|e| DeepscanError::AudioDecode(format!("Failed to run FFmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeepscanError::AudioDecode(format!(
            "FFmpeg decode failed: {}",
            stderr.trim()
        )));
    }

    let reader = WavReader::open(temp_path)
        .map_err(|e| DeepscanError::AudioDecode(format!("Failed to open decoded WAV: {e}")))?;
    read_wav_mono(reader)
}

/// Read all samples from a WAV reader, folding channels to mono.
fn read_wav_mono<R: std::io::Read>(reader: WavReader<R>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .into_samples::<i16>()
            .map(|s| s.unwrap_or(0) as f32 / 32768.0)
            .collect(),
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.unwrap_or(0.0))
            .collect(),
    };

    if channels == 1 {
        return Ok(samples);
    }

    let mono: Vec<f32> = samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok(mono)
}

/// Pad with trailing zeros or truncate so the waveform is exactly
/// `target_len` samples.
pub fn pad_or_trim(mut samples: Vec<f32>, target_len: usize) -> Vec<f32> {
    samples.resize(target_len, 0.0);
    samples
}
