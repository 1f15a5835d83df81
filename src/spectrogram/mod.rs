pub mod decode;
pub mod mel;
pub mod render;

use std::path::Path;

use serde::Serialize;

use crate::error::HarvestError;

use self::mel::{HOP_LENGTH, N_FFT, N_MELS};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrogramSummary {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub frames: usize,
    pub duration_secs: f64,
}

pub trait SpectrogramRenderer {
    fn render(
        &self,
        audio: &Path,
        image: &Path,
        title_label: &str,
    ) -> Result<SpectrogramSummary, HarvestError>;
}

impl<T: SpectrogramRenderer + ?Sized> SpectrogramRenderer for &T {
    fn render(
        &self,
        audio: &Path,
        image: &Path,
        title_label: &str,
    ) -> Result<SpectrogramSummary, HarvestError> {
        (**self).render(audio, image, title_label)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MelSpectrogramRenderer;

impl MelSpectrogramRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl SpectrogramRenderer for MelSpectrogramRenderer {
    fn render(
        &self,
        audio: &Path,
        image: &Path,
        title_label: &str,
    ) -> Result<SpectrogramSummary, HarvestError> {
        let decoded = decode::decode_audio_file(audio)?;
        let mut spectrogram = mel::mel_power_spectrogram(&decoded.samples, decoded.sample_rate)?;
        mel::power_to_db(&mut spectrogram);

        let title = title_lines(title_label, decoded.sample_rate);
        let figure = render::render_figure(&spectrogram, HOP_LENGTH, &title);
        render::save_png(&figure, image)?;

        Ok(SpectrogramSummary {
            sample_rate: decoded.sample_rate,
            n_fft: N_FFT,
            hop_length: HOP_LENGTH,
            n_mels: N_MELS,
            frames: spectrogram.n_frames,
            duration_secs: decoded.duration_secs(),
        })
    }
}

pub fn parameter_label(sample_rate: u32) -> String {
    format!("(sr={sample_rate}Hz, n_fft={N_FFT}, hop={HOP_LENGTH}, n_mels={N_MELS})")
}

pub fn title_lines(title_label: &str, sample_rate: u32) -> Vec<String> {
    vec![
        "Mel Spectrogram".to_string(),
        title_label.to_string(),
        parameter_label(sample_rate),
    ]
}
