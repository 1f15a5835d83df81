use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("missing or placeholder xeno-canto API key")]
    #[diagnostic(help("set `api_key` in xc-harvest.json or export XC_API_KEY"))]
    MissingApiKey,

    #[error("missing config file xc-harvest.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid binomial name {0:?}: expected `<Genus> <epithet>`")]
    InvalidBinomial(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("failed to parse catalog response: {0}")]
    CatalogParse(String),

    #[error("catalog reported an error: {0}")]
    CatalogApi(String),

    #[error("download failed: {0}")]
    DownloadHttp(String),

    #[error("download returned status {status} for {url}")]
    DownloadStatus { status: u16, url: String },

    #[error("failed to decode audio {path}: {message}")]
    AudioDecode { path: PathBuf, message: String },

    #[error("failed to render spectrogram: {0}")]
    Render(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl HarvestError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarvestError::MissingApiKey
                | HarvestError::MissingConfig
                | HarvestError::ConfigRead(_)
                | HarvestError::ConfigParse(_)
                | HarvestError::InvalidConfig(_)
        )
    }
}
