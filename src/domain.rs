use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::HarvestError;

const PLACEHOLDER_KEYS: &[&str] = &[
    "your_api_key",
    "your_api_key_here",
    "your-api-key",
    "<api-key>",
    "<api_key>",
    "changeme",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Binomial {
    genus: String,
    epithet: String,
}

impl Binomial {
    pub fn genus(&self) -> &str {
        &self.genus
    }

    pub fn epithet(&self) -> &str {
        &self.epithet
    }
}

impl fmt::Display for Binomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.genus, self.epithet)
    }
}

impl FromStr for Binomial {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let tokens = value.split_whitespace().collect::<Vec<_>>();
        match tokens.as_slice() {
            [genus, epithet] => Ok(Self {
                genus: (*genus).to_string(),
                epithet: (*epithet).to_string(),
            }),
            _ => Err(HarvestError::InvalidBinomial(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesQuery {
    pub binomial: Binomial,
    pub country: Option<String>,
    pub quality: Option<String>,
}

impl SpeciesQuery {
    pub fn new(
        species: &str,
        country: Option<&str>,
        quality: Option<&str>,
    ) -> Result<Self, HarvestError> {
        Ok(Self {
            binomial: species.parse()?,
            country: non_empty(country),
            quality: non_empty(quality),
        })
    }

    pub fn query_string(&self) -> String {
        let mut tags = vec![
            format!("gen:{}", self.binomial.genus()),
            format!("sp:{}", self.binomial.epithet()),
        ];
        if let Some(country) = &self.country {
            if country.chars().any(char::is_whitespace) {
                tags.push(format!("cnt:\"{country}\""));
            } else {
                tags.push(format!("cnt:{country}"));
            }
        }
        if let Some(quality) = &self.quality {
            tags.push(quality.clone());
        }
        tags.join(" ")
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: Option<&str>) -> Result<Self, HarvestError> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() || is_placeholder(value) {
            return Err(HarvestError::MissingApiKey);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

fn is_placeholder(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    PLACEHOLDER_KEYS.contains(&lowered.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingRecord {
    pub id: String,
    pub audio_url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage {
    pub page: u32,
    pub num_pages: u32,
    pub num_recordings: u64,
    pub recordings: Vec<RecordingRecord>,
    pub discarded: usize,
}
