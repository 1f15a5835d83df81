use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::HarvestError;

pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const CHUNK_SIZE: usize = 8 * 1024;

pub trait Downloader {
    /// A partial file may remain at `destination` on error.
    fn download(&self, url: &str, destination: &Path) -> Result<u64, HarvestError>;
}

impl<T: Downloader + ?Sized> Downloader for &T {
    fn download(&self, url: &str, destination: &Path) -> Result<u64, HarvestError> {
        (**self).download(url, destination)
    }
}

#[derive(Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, HarvestError> {
        let client = Client::builder()
            .default_headers(default_headers()?)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|err| HarvestError::DownloadHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, destination: &Path) -> Result<u64, HarvestError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HarvestError::DownloadHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(HarvestError::DownloadStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let file = File::create(destination).map_err(|err| {
            HarvestError::Filesystem(format!("create {}: {err}", destination.display()))
        })?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;
        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|err| HarvestError::DownloadHttp(format!("read {url}: {err}")))?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read]).map_err(|err| {
                HarvestError::Filesystem(format!("write {}: {err}", destination.display()))
            })?;
            written += read as u64;
        }
        writer.flush().map_err(|err| {
            HarvestError::Filesystem(format!("flush {}: {err}", destination.display()))
        })?;
        Ok(written)
    }
}

pub(crate) fn default_headers() -> Result<HeaderMap, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("xc-harvest/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| HarvestError::InvalidConfig(err.to_string()))?,
    );
    Ok(headers)
}
