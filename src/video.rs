use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::audio::check_ffmpeg;
use crate::error::{DeepscanError, Result};

/// Frames sampled per second of video.
pub const FRAME_RATE: u32 = 1;

/// Upper bound on extracted frames per invocation.
pub const MAX_FRAMES: u32 = 5;

/// Frames extracted from one video, staged in a directory owned by this
/// batch. Dropping the batch removes the staged files.
#[derive(Debug)]
pub struct FrameBatch {
    _dir: TempDir,
    frames: Vec<PathBuf>,
}

impl FrameBatch {
    /// Extracted frame paths, sorted ascending. Zero-padded sequential
    /// names make lexicographic order chronological.
    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Extract up to [`MAX_FRAMES`] frames at [`FRAME_RATE`] fps into a fresh
/// scratch directory scoped to the returned batch.
///
/// Each invocation owns its own directory, so concurrent extractions never
/// see each other's files.
pub fn extract_frames(video: &Path) -> Result<FrameBatch> {
    let dir = tempfile::Builder::new()
        .prefix("deepscan_frames_")
        .tempdir()?;

    let frames = extract_frames_into(video, dir.path())?;
    Ok(FrameBatch { _dir: dir, frames })
}

/// Extract frames into a caller-managed directory and return the sorted
/// frame paths.
///
/// Unlike the batch variant, nothing here is cleaned up automatically. A
/// video shorter than [`MAX_FRAMES`] seconds yields fewer frames; that is
/// not an error. A missing input or a failed transcoder run is.
pub fn extract_frames_into(video: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    if !video.exists() {
        return Err(DeepscanError::FileNotFound(video.display().to_string()));
    }

    check_ffmpeg().map_err(|_| {
        DeepscanError::FrameExtraction(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH".to_string(),
        )
    })?;

    std::fs::create_dir_all(output_dir)?;

    info!("Extracting frames from {}", video.display());

    let pattern = output_dir.join("frame_%03d.jpg");
    let output = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(video)
        .args([
            "-vf",
            &format!("fps={FRAME_RATE}"),
            "-frames:v",
            &MAX_FRAMES.to_string(),
        ])
        .arg(&pattern)
        .output()
        .map_err(|e| DeepscanError::FrameExtraction(format!("Failed to run FFmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeepscanError::FrameExtraction(format!(
            "FFmpeg frame extraction failed: {}",
            stderr.trim()
        )));
    }

    let mut frames: Vec<PathBuf> = std::fs::read_dir(output_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    frames.sort();

    debug!("Extracted {} frames", frames.len());
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Render a synthetic test video, or None if this FFmpeg can't.
    fn render_test_video(dir: &Path, seconds: u32) -> Option<PathBuf> {
        let path = dir.join(format!("test_{seconds}s.mp4"));
        let status = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "lavfi",
                "-i",
                &format!("testsrc=duration={seconds}:size=64x64:rate=10"),
                "-c:v",
                "mpeg4",
            ])
            .arg(&path)
            .output()
            .ok()?;
        status.status.success().then_some(path)
    }

    #[test]
    fn test_extract_frames_missing_video() {
        let result = extract_frames(Path::new("/nonexistent/video.mp4"));
        match result {
            Err(DeepscanError::FileNotFound(path)) => assert!(path.contains("nonexistent")),
            other => panic!("Expected FileNotFound, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_extract_caps_at_five_frames() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let Some(video) = render_test_video(dir.path(), 8) else {
            eprintln!("Skipping test: FFmpeg can't render test video");
            return;
        };

        let batch = extract_frames(&video).unwrap();
        assert_eq!(batch.len(), MAX_FRAMES as usize);

        let names: Vec<String> = batch
            .frames()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "frame_001.jpg",
                "frame_002.jpg",
                "frame_003.jpg",
                "frame_004.jpg",
                "frame_005.jpg"
            ]
        );

        let mut sorted = batch.frames().to_vec();
        sorted.sort();
        assert_eq!(sorted, batch.frames());
    }

    #[test]
    fn test_short_video_yields_fewer_frames() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let Some(video) = render_test_video(dir.path(), 2) else {
            eprintln!("Skipping test: FFmpeg can't render test video");
            return;
        };

        let batch = extract_frames(&video).unwrap();
        assert!(!batch.is_empty());
        assert!(batch.len() < MAX_FRAMES as usize);
    }

    #[test]
    fn test_batch_cleans_up_on_drop() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let Some(video) = render_test_video(dir.path(), 3) else {
            eprintln!("Skipping test: FFmpeg can't render test video");
            return;
        };

        let batch = extract_frames(&video).unwrap();
        let first_frame = batch.frames()[0].clone();
        assert!(first_frame.exists());

        drop(batch);
        assert!(!first_frame.exists());
    }

    #[test]
    fn test_concurrent_extractions_do_not_interfere() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let Some(video) = render_test_video(dir.path(), 8) else {
            eprintln!("Skipping test: FFmpeg can't render test video");
            return;
        };

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let video = video.clone();
                std::thread::spawn(move || extract_frames(&video).unwrap())
            })
            .collect();

        let batches: Vec<FrameBatch> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for batch in &batches {
            assert_eq!(batch.len(), MAX_FRAMES as usize);
            for frame in batch.frames() {
                assert!(frame.exists());
            }
        }
    }
}
