// # Zip Archive Candidate Source
//
// This crate provides the zip-bundle candidate source for edgepick.
//
// ## Architecture
//
// The archive is downloaded once per domain search and held in memory.
// Each regular file inside it is one candidate pool: a plain-text list of
// addresses, one per line. Directory entries are not pools.
//
// Listing and reading are synchronous; only the download touches the
// network.

use edgepick_core::traits::CandidateSource;
use edgepick_core::{Error, Result};

use std::io::{Cursor, Read};
use std::time::Duration;

/// HTTP timeout for the archive download
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const SOURCE_NAME: &str = "zip";

/// Candidate source backed by a zip archive served over HTTP
#[derive(Debug)]
pub struct HttpZipSource {
    /// URL the archive is downloaded from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpZipSource {
    /// Create a new zip source
    ///
    /// # Parameters
    ///
    /// - `url`: Archive URL (e.g., "https://zip.baipiao.eu.org")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create with a custom download timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::config("archive_url cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::source(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    /// URL the archive is downloaded from
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn open(archive: &[u8]) -> Result<zip::ZipArchive<Cursor<&[u8]>>> {
    zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| Error::archive(format!("Invalid zip archive: {}", e)))
}

#[async_trait::async_trait]
impl CandidateSource for HttpZipSource {
    async fn fetch_archive(&self) -> Result<Vec<u8>> {
        tracing::debug!("Downloading candidate archive from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Archive request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::source(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("Failed to read archive body: {}", e)))?;

        tracing::debug!("Downloaded {} byte archive", body.len());
        Ok(body.to_vec())
    }

    fn list_entries(&self, archive: &[u8]) -> Result<Vec<String>> {
        let mut zip = open(archive)?;
        let mut names = Vec::with_capacity(zip.len());

        for index in 0..zip.len() {
            let file = zip
                .by_index(index)
                .map_err(|e| Error::archive(format!("Unreadable entry #{}: {}", index, e)))?;
            if file.is_dir() {
                continue;
            }
            names.push(file.name().to_string());
        }

        Ok(names)
    }

    fn read_entry(&self, archive: &[u8], name: &str) -> Result<Vec<u8>> {
        let mut zip = open(archive)?;
        let mut file = zip
            .by_name(name)
            .map_err(|e| Error::archive(format!("Cannot open entry {}: {}", name, e)))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| Error::archive(format!("Cannot read entry {}: {}", name, e)))?;
        Ok(content)
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}
