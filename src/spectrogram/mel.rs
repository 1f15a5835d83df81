use std::f32::consts::PI;

use rustfft::{FftPlanner, num_complex::Complex};

use crate::error::HarvestError;

pub const N_FFT: usize = 2048;
pub const HOP_LENGTH: usize = 512;
pub const N_MELS: usize = 128;
pub const AMIN: f32 = 1e-10;
pub const TOP_DB: f32 = 80.0;

/// Frame-major matrix: `values[frame * n_mels + band]`.
#[derive(Debug, Clone)]
pub struct MelSpectrogram {
    pub values: Vec<f32>,
    pub n_frames: usize,
    pub n_mels: usize,
    pub sample_rate: u32,
}

impl MelSpectrogram {
    pub fn get(&self, frame: usize, band: usize) -> f32 {
        self.values[frame * self.n_mels + band]
    }

    pub fn range(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

#[derive(Debug, Clone)]
pub struct MelFilter {
    pub start_bin: usize,
    pub weights: Vec<f32>,
}

pub fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (logstep * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize, fmax: f64) -> Vec<MelFilter> {
    let n_bins = n_fft / 2 + 1;
    let sr = f64::from(sample_rate);
    let fft_freqs = (0..n_bins)
        .map(|bin| bin as f64 * sr / n_fft as f64)
        .collect::<Vec<_>>();

    let mel_max = hz_to_mel(fmax);
    let mel_points = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect::<Vec<_>>();

    (0..n_mels)
        .map(|band| {
            let (lower, center, upper) =
                (mel_points[band], mel_points[band + 1], mel_points[band + 2]);
            let enorm = 2.0 / (upper - lower);
            let dense = fft_freqs
                .iter()
                .map(|&freq| {
                    let rising = (freq - lower) / (center - lower);
                    let falling = (upper - freq) / (upper - center);
                    (rising.min(falling).max(0.0) * enorm) as f32
                })
                .collect::<Vec<_>>();
            let start_bin = dense.iter().position(|&w| w > 0.0).unwrap_or(0);
            let end_bin = dense
                .iter()
                .rposition(|&w| w > 0.0)
                .map_or(start_bin, |idx| idx + 1);
            MelFilter {
                start_bin,
                weights: dense[start_bin..end_bin].to_vec(),
            }
        })
        .collect()
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
        .collect()
}

pub fn frame_count(n_samples: usize, hop: usize) -> usize {
    1 + n_samples / hop
}

pub fn mel_power_spectrogram(
    samples: &[f32],
    sample_rate: u32,
) -> Result<MelSpectrogram, HarvestError> {
    if samples.is_empty() {
        return Err(HarvestError::Render("audio contains no samples".to_string()));
    }
    if sample_rate == 0 {
        return Err(HarvestError::Render("sample rate is zero".to_string()));
    }

    let filters = mel_filterbank(sample_rate, N_FFT, N_MELS, f64::from(sample_rate) / 2.0);
    let window = hann_window(N_FFT);
    let fft = FftPlanner::<f32>::new().plan_fft_forward(N_FFT);

    let pad = N_FFT / 2;
    let n_frames = frame_count(samples.len(), HOP_LENGTH);
    let mut values = Vec::with_capacity(n_frames * N_MELS);
    let mut frame = vec![Complex::new(0.0f32, 0.0); N_FFT];
    let mut power = vec![0.0f32; N_FFT / 2 + 1];

    for frame_idx in 0..n_frames {
        // Frame start in padded coordinates; padding is zeros.
        let start = frame_idx * HOP_LENGTH;
        for (i, slot) in frame.iter_mut().enumerate() {
            let sample = (start + i)
                .checked_sub(pad)
                .and_then(|idx| samples.get(idx))
                .copied()
                .unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process(&mut frame);
        for (bin, value) in power.iter_mut().enumerate() {
            *value = frame[bin].norm_sqr();
        }
        for filter in &filters {
            let energy = filter
                .weights
                .iter()
                .zip(&power[filter.start_bin..])
                .map(|(w, p)| w * p)
                .sum::<f32>();
            values.push(energy);
        }
    }

    Ok(MelSpectrogram {
        values,
        n_frames,
        n_mels: N_MELS,
        sample_rate,
    })
}

pub fn power_to_db(spectrogram: &mut MelSpectrogram) {
    let reference = spectrogram
        .values
        .iter()
        .copied()
        .fold(0.0f32, f32::max)
        .max(AMIN);
    let ref_db = 10.0 * reference.log10();
    for value in &mut spectrogram.values {
        *value = 10.0 * value.max(AMIN).log10() - ref_db;
    }
    let peak = spectrogram
        .values
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    for value in &mut spectrogram.values {
        *value = value.max(floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mel_scale_round_trips_through_log_region() {
        for hz in [0.0, 440.0, 1000.0, 4000.0, 11025.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn filterbank_covers_every_band() {
        let filters = mel_filterbank(22050, N_FFT, N_MELS, 11025.0);
        assert_eq!(filters.len(), N_MELS);
        for filter in &filters {
            assert!(!filter.weights.is_empty());
            assert!(filter.weights.iter().all(|&w| w >= 0.0));
            assert!(filter.start_bin + filter.weights.len() <= N_FFT / 2 + 1);
        }
    }

    #[test]
    fn frames_follow_centered_layout() {
        let samples = vec![0.1f32; 22050];
        let spec = mel_power_spectrogram(&samples, 22050).unwrap();
        assert_eq!(spec.n_frames, 1 + 22050 / HOP_LENGTH);
        assert_eq!(spec.values.len(), spec.n_frames * N_MELS);
    }

    #[test]
    fn decibels_are_relative_to_peak() {
        let samples = (0..44100)
            .map(|i| (2.0 * PI * 2000.0 * i as f32 / 44100.0).sin())
            .collect::<Vec<_>>();
        let mut spec = mel_power_spectrogram(&samples, 44100).unwrap();
        power_to_db(&mut spec);
        let (lo, hi) = spec.range();
        assert_eq!(hi, 0.0);
        assert!(lo >= -TOP_DB);
    }
}
