use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::RecordingRecord;
use crate::error::HarvestError;
use crate::sanitize::{
    DEFAULT_MAX_COMPONENT_LENGTH, DEFAULT_SPECIES_COMPONENT_LENGTH, file_stem, sanitize,
};

pub const SPECTROGRAM_SUFFIX: &str = "_spectrogram.png";
const FALLBACK_RECORDING_DIR: &str = "recording";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentLimits {
    pub species: usize,
    pub recording: usize,
}

impl Default for ComponentLimits {
    fn default() -> Self {
        Self {
            species: DEFAULT_SPECIES_COMPONENT_LENGTH,
            recording: DEFAULT_MAX_COMPONENT_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub species_dir: Utf8PathBuf,
    pub recording_dir: Utf8PathBuf,
    pub audio_path: Utf8PathBuf,
    pub spectrogram_path: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: Utf8PathBuf,
    limits: ComponentLimits,
}

impl ArtifactStore {
    pub fn new(root: Utf8PathBuf, limits: ComponentLimits) -> Self {
        Self { root, limits }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn species_dir(&self, species: &str) -> Utf8PathBuf {
        self.root.join(sanitize(species, self.limits.species))
    }

    pub fn paths(&self, species: &str, record: &RecordingRecord) -> ArtifactPaths {
        let species_dir = self.species_dir(species);
        let mut base = sanitize(file_stem(&record.file_name), self.limits.recording);
        if !is_plain_component(&base) {
            base = sanitize(&record.id, self.limits.recording);
        }
        if !is_plain_component(&base) {
            base = FALLBACK_RECORDING_DIR.to_string();
        }
        let recording_dir = species_dir.join(&base);
        let audio_path = recording_dir.join(&record.file_name);
        let spectrogram_path = recording_dir.join(format!("{base}{SPECTROGRAM_SUFFIX}"));
        ArtifactPaths {
            species_dir,
            recording_dir,
            audio_path,
            spectrogram_path,
        }
    }

    pub fn ensure_dirs(&self, paths: &ArtifactPaths) -> Result<(), HarvestError> {
        fs::create_dir_all(paths.recording_dir.as_std_path()).map_err(|err| {
            HarvestError::Filesystem(format!("create {}: {err}", paths.recording_dir))
        })
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }
}

// Empty and all-dot names would resolve to the species directory or above it.
fn is_plain_component(name: &str) -> bool {
    !name.is_empty() && name.chars().any(|ch| ch != '.')
}
