use std::f32::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

use super::{HOP_LENGTH, N_FFT, N_MELS, SAMPLE_RATE, TOP_DB};

/// A mel spectrogram in mel-major layout: `data[mel * n_frames + frame]`.
#[derive(Debug, Clone)]
pub struct MelMatrix {
    data: Vec<f32>,
    n_mels: usize,
    n_frames: usize,
}

impl MelMatrix {
    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, mel: usize, frame: usize) -> f32 {
        self.data[mel * self.n_frames + frame]
    }
}

/// Mel-spectrogram extractor with the fixed analysis parameters the
/// classifier was trained with (22050 Hz, 128 bands, FFT 2048, hop 512).
pub struct MelSpectrogram {
    mel_basis: Vec<Vec<f32>>,
    window: Vec<f32>,
}

impl Default for MelSpectrogram {
    fn default() -> Self {
        Self::new()
    }
}

impl MelSpectrogram {
    pub fn new() -> Self {
        let fmax = SAMPLE_RATE as f32 / 2.0;
        let mel_basis = Self::create_mel_filterbank(SAMPLE_RATE, N_FFT, N_MELS, 0.0, fmax);
        let window = Self::hann_window(N_FFT);

        Self { mel_basis, window }
    }

    /// Compute the power mel spectrogram of `samples`.
    ///
    /// Frames are centered: the signal is reflect-padded by `N_FFT / 2` on
    /// each side, yielding `samples.len() / HOP_LENGTH + 1` frames.
    pub fn compute(&self, samples: &[f32]) -> MelMatrix {
        let stft = self.stft(samples);
        let n_frames = stft.len();

        let mut data = vec![0.0f32; N_MELS * n_frames];
        for (frame_idx, frame) in stft.iter().enumerate() {
            let power: Vec<f32> = frame.iter().map(|c| c.norm_sqr()).collect();
            for (mel_idx, filter) in self.mel_basis.iter().enumerate() {
                let energy: f32 = filter.iter().zip(power.iter()).map(|(f, p)| f * p).sum();
                data[mel_idx * n_frames + frame_idx] = energy;
            }
        }

        MelMatrix {
            data,
            n_mels: N_MELS,
            n_frames,
        }
    }

    /// Compute the log-scaled mel spectrogram in decibels referenced to the
    /// per-clip maximum, floored `TOP_DB` below it.
    ///
    /// Values land in `[-TOP_DB, 0]`, with the loudest bin at exactly 0.
    pub fn compute_db(&self, samples: &[f32]) -> MelMatrix {
        let mut mel = self.compute(samples);
        power_to_db(&mut mel.data);
        mel
    }

    /// Short-time Fourier transform over centered, Hann-windowed frames.
    fn stft(&self, samples: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let pad = N_FFT / 2;
        let mut padded = Vec::with_capacity(samples.len() + 2 * pad);

        // Reflect padding on both sides
        for i in (1..=pad).rev() {
            let idx = i.min(samples.len().saturating_sub(1));
            padded.push(samples.get(idx).copied().unwrap_or(0.0));
        }
        padded.extend_from_slice(samples);
        for i in 0..pad {
            let idx = samples.len().saturating_sub(2).saturating_sub(i);
            padded.push(samples.get(idx).copied().unwrap_or(0.0));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(N_FFT);

        let n_frames = (padded.len() - N_FFT) / HOP_LENGTH + 1;
        let mut result = Vec::with_capacity(n_frames);

        for i in 0..n_frames {
            let start = i * HOP_LENGTH;
            let mut buffer: Vec<Complex<f32>> = (0..N_FFT)
                .map(|j| Complex::new(padded[start + j] * self.window[j], 0.0))
                .collect();

            fft.process(&mut buffer);

            // Positive frequencies only
            let frame: Vec<Complex<f32>> = buffer.into_iter().take(N_FFT / 2 + 1).collect();
            result.push(frame);
        }

        result
    }

    /// Convert frequency in Hz to mel scale (Slaney / O'Shaughnessy).
    fn hz_to_mel(f: f32) -> f32 {
        const F_SP: f32 = 200.0 / 3.0;
        const MIN_LOG_HZ: f32 = 1000.0;
        const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
        const LOGSTEP: f32 = 0.068_751_74; // ln(6.4) / 27

        if f < MIN_LOG_HZ {
            f / F_SP
        } else {
            MIN_LOG_MEL + (f / MIN_LOG_HZ).ln() / LOGSTEP
        }
    }

    /// Convert mel value to Hz (Slaney / O'Shaughnessy).
    fn mel_to_hz(m: f32) -> f32 {
        const F_SP: f32 = 200.0 / 3.0;
        const MIN_LOG_HZ: f32 = 1000.0;
        const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
        const LOGSTEP: f32 = 0.068_751_74;

        if m < MIN_LOG_MEL {
            m * F_SP
        } else {
            MIN_LOG_HZ * ((m - MIN_LOG_MEL) * LOGSTEP).exp()
        }
    }

    /// Create a Slaney-normalized triangular mel filterbank.
    fn create_mel_filterbank(
        sample_rate: u32,
        n_fft: usize,
        n_mels: usize,
        fmin: f32,
        fmax: f32,
    ) -> Vec<Vec<f32>> {
        let n_freqs = n_fft / 2 + 1;

        let mel_min = Self::hz_to_mel(fmin);
        let mel_max = Self::hz_to_mel(fmax);
        let mel_points: Vec<f32> = (0..=n_mels + 1)
            .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32)
            .collect();

        let hz_points: Vec<f32> = mel_points.iter().map(|&m| Self::mel_to_hz(m)).collect();

        let fft_freqs: Vec<f32> = (0..n_freqs)
            .map(|i| i as f32 * sample_rate as f32 / n_fft as f32)
            .collect();

        let mut filterbank = vec![vec![0.0f32; n_freqs]; n_mels];

        for i in 0..n_mels {
            let f_lower = hz_points[i];
            let f_center = hz_points[i + 1];
            let f_upper = hz_points[i + 2];

            for (j, &freq) in fft_freqs.iter().enumerate() {
                if freq >= f_lower && freq <= f_center && f_center > f_lower {
                    filterbank[i][j] = (freq - f_lower) / (f_center - f_lower);
                } else if freq > f_center && freq <= f_upper && f_upper > f_center {
                    filterbank[i][j] = (f_upper - freq) / (f_upper - f_center);
                }
            }

            // Slaney area-normalization
            let band_width = hz_points[i + 2] - hz_points[i];
            if band_width > 0.0 {
                let enorm = 2.0 / band_width;
                for val in &mut filterbank[i] {
                    *val *= enorm;
                }
            }
        }

        filterbank
    }

    /// Periodic Hann window: 0.5 * (1 - cos(2*pi*n/N)) for n in [0, N).
    fn hann_window(length: usize) -> Vec<f32> {
        (0..length)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / length as f32).cos()))
            .collect()
    }
}

/// In-place power-to-decibel conversion referenced to the maximum value,
/// floored `TOP_DB` below it.
fn power_to_db(values: &mut [f32]) {
    const AMIN: f32 = 1e-10;

    let reference = values
        .iter()
        .cloned()
        .fold(f32::NEG_INFINITY, f32::max)
        .max(AMIN);
    let ref_db = 10.0 * reference.log10();

    let mut max_db = f32::NEG_INFINITY;
    for v in values.iter_mut() {
        *v = 10.0 * v.max(AMIN).log10() - ref_db;
        max_db = max_db.max(*v);
    }

    let floor = max_db - TOP_DB;
    for v in values.iter_mut() {
        *v = v.max(floor);
    }
}
