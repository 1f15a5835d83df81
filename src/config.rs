use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_ENDPOINT;
use crate::error::HarvestError;
use crate::sanitize::{DEFAULT_MAX_COMPONENT_LENGTH, DEFAULT_SPECIES_COMPONENT_LENGTH};
use crate::store::ComponentLimits;

pub const CONFIG_FILE_NAME: &str = "xc-harvest.json";
pub const API_KEY_ENV: &str = "XC_API_KEY";
pub const DEFAULT_OUTPUT_DIR: &str = "downloaded_audio_data";
pub const DEFAULT_REQUEST_DELAY_SECS: f64 = 1.0;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub request_delay_secs: Option<f64>,
    #[serde(default)]
    pub max_component_length: Option<usize>,
    #[serde(default)]
    pub species_component_length: Option<usize>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub country: Option<String>,
    pub quality: Option<String>,
    pub output_dir: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub species: Vec<String>,
    pub country: Option<String>,
    pub quality: Option<String>,
    pub output_dir: Utf8PathBuf,
    pub api_key: Option<String>,
    pub request_delay: Duration,
    pub limits: ComponentLimits,
    pub endpoint: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE_NAME),
        };

        if path.is_none() && !config_path.exists() {
            return Err(HarvestError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| HarvestError::ConfigParse(err.to_string()))?;

        let mut overrides = overrides;
        if overrides.api_key.is_none() {
            overrides.api_key = std::env::var(API_KEY_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty());
        }
        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, HarvestError> {
        let species = config
            .species
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        if species.is_empty() {
            return Err(HarvestError::InvalidConfig(
                "`species` must list at least one binomial name".to_string(),
            ));
        }

        let request_delay_secs = config
            .request_delay_secs
            .unwrap_or(DEFAULT_REQUEST_DELAY_SECS);
        let request_delay = Duration::try_from_secs_f64(request_delay_secs).map_err(|_| {
            HarvestError::InvalidConfig(format!(
                "`request_delay_secs` must be a non-negative number, got {request_delay_secs}"
            ))
        })?;

        let limits = ComponentLimits {
            species: config
                .species_component_length
                .unwrap_or(DEFAULT_SPECIES_COMPONENT_LENGTH),
            recording: config
                .max_component_length
                .unwrap_or(DEFAULT_MAX_COMPONENT_LENGTH),
        };
        if limits.species == 0 || limits.recording == 0 {
            return Err(HarvestError::InvalidConfig(
                "component lengths must be greater than zero".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            species,
            country: overrides.country.or(config.country).filter(|v| !v.trim().is_empty()),
            quality: overrides.quality.or(config.quality).filter(|v| !v.trim().is_empty()),
            output_dir: Utf8PathBuf::from(
                overrides
                    .output_dir
                    .or(config.output_dir)
                    .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            api_key: overrides.api_key.or(config.api_key),
            request_delay,
            limits,
            endpoint: config
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        })
    }
}
