use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{ApiKey, CatalogPage, RecordingRecord};
use crate::download::default_headers;
use crate::error::HarvestError;

pub const DEFAULT_ENDPOINT: &str = "https://xeno-canto.org/api/3/recordings";
pub const CATALOG_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    pub query: &'a str,
    pub api_key: &'a ApiKey,
    pub page: u32,
}

pub trait CatalogClient {
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<CatalogPage, HarvestError>;
}

impl<T: CatalogClient + ?Sized> CatalogClient for &T {
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<CatalogPage, HarvestError> {
        (**self).fetch_page(request)
    }
}

#[derive(Clone)]
pub struct XenoCantoClient {
    client: Client,
    endpoint: String,
}

impl XenoCantoClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .default_headers(default_headers()?)
            .timeout(CATALOG_TIMEOUT)
            .build()
            .map_err(|err| HarvestError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, HarvestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .unwrap_or_else(|_| "catalog request failed".to_string());
        let message = serde_json::from_str::<RawPage>(&body)
            .ok()
            .and_then(|raw| raw.error_message())
            .unwrap_or(body);
        Err(HarvestError::CatalogStatus { status, message })
    }
}

impl CatalogClient for XenoCantoClient {
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<CatalogPage, HarvestError> {
        let page = request.page.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("query", request.query),
                ("key", request.api_key.as_str()),
                ("page", page.as_str()),
            ])
            .send()
            .map_err(|err| HarvestError::CatalogHttp(err.without_url().to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| HarvestError::CatalogHttp(err.without_url().to_string()))?;
        parse_page(&body, request.page)
    }
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(rename = "numRecordings", default)]
    num_recordings: Option<Value>,
    #[serde(rename = "numPages", default)]
    num_pages: Option<Value>,
    #[serde(default)]
    recordings: Option<Vec<RawRecording>>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

impl RawPage {
    fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref().filter(|value| !value.is_null())?;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.message.clone())
            .or_else(|| error.as_str().map(str::to_string))
            .unwrap_or_else(|| error.to_string());
        Some(message)
    }
}

#[derive(Debug, Deserialize)]
struct RawRecording {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    file: Option<String>,
    #[serde(rename = "file-name", default)]
    file_name: Option<String>,
}

pub fn parse_page(body: &str, page: u32) -> Result<CatalogPage, HarvestError> {
    let raw: RawPage =
        serde_json::from_str(body).map_err(|err| HarvestError::CatalogParse(err.to_string()))?;
    if let Some(message) = raw.error_message() {
        return Err(HarvestError::CatalogApi(message));
    }

    let raw_recordings = raw.recordings.unwrap_or_default();
    let num_recordings = raw
        .num_recordings
        .as_ref()
        .and_then(value_as_u64)
        .unwrap_or(raw_recordings.len() as u64);
    let num_pages = raw
        .num_pages
        .as_ref()
        .and_then(value_as_u64)
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(1);

    let mut recordings = Vec::with_capacity(raw_recordings.len());
    let mut discarded = 0usize;
    for raw_recording in raw_recordings {
        match into_record(raw_recording) {
            Ok(record) => recordings.push(record),
            Err(id) => {
                tracing::warn!(
                    page,
                    id = id.as_deref().unwrap_or("<none>"),
                    "skipping recording with missing id, URL or filename"
                );
                discarded += 1;
            }
        }
    }

    Ok(CatalogPage {
        page,
        num_pages,
        num_recordings,
        recordings,
        discarded,
    })
}

pub fn normalize_audio_url(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

fn into_record(raw: RawRecording) -> Result<RecordingRecord, Option<String>> {
    let id = raw
        .id
        .as_ref()
        .and_then(value_as_string)
        .filter(|id| !id.is_empty());
    let file = raw.file.filter(|url| !url.trim().is_empty());
    let file_name = raw.file_name.filter(|name| is_usable_file_name(name));
    match (id, file, file_name) {
        (Some(id), Some(file), Some(file_name)) => Ok(RecordingRecord {
            id,
            audio_url: normalize_audio_url(file.trim()),
            file_name,
        }),
        (id, _, _) => Err(id),
    }
}

fn is_usable_file_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_relative_urls_become_https() {
        assert_eq!(
            normalize_audio_url("//xeno-canto.org/812465/download"),
            "https://xeno-canto.org/812465/download"
        );
        assert_eq!(
            normalize_audio_url("https://xeno-canto.org/812465/download"),
            "https://xeno-canto.org/812465/download"
        );
    }

    #[test]
    fn traversal_file_names_are_unusable() {
        assert!(is_usable_file_name("XC1-a.mp3"));
        assert!(!is_usable_file_name("../escape.mp3"));
        assert!(!is_usable_file_name(".."));
        assert!(!is_usable_file_name("  "));
    }
}
