// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for edgepick.
//
// ## Implementation Status
//
// - ✅ One HTTP request per trait call
// - ✅ Full error propagation (the core `Updater` owns retries and backoff)
// - ✅ HTTP timeout configured (15 seconds)
// - ✅ Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - ✅ Typed response schemas; a missing or mistyped field is an error, not a panic
// - ✅ Dry-run mode for safe testing
// - ✅ Record creation (used only by the `create` missing-record policy)
// - ❌ NO retry logic (owned by `Updater`)
// - ❌ NO zone/record id caching (ids are resolved fresh on every attempt)
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - Construction fails fast if the email or key is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`

use async_trait::async_trait;
use edgepick_core::config::ProviderCredentials;
use edgepick_core::traits::DnsProvider;
use edgepick_core::{Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// User-Agent sent with every request
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/94.0.4606.54 Safari/537.36";

const PROVIDER_NAME: &str = "cloudflare";

/// Every Cloudflare v4 reply wraps its payload in `result`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
}

#[derive(Debug, Serialize)]
struct UpdateRecordRequest<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

/// Cloudflare DNS provider
///
/// Stateless and single-shot: every method performs one request. All
/// coordination (retries, backoff) is owned by the core `Updater`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended PUT/POST payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Account email and API key
    /// ⚠️ NEVER log the key
    credentials: ProviderCredentials,

    /// API base URL
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `credentials`: Account email and global API key
    /// - `dry_run`: If true, perform GET requests but skip writes
    ///
    /// # Errors
    ///
    /// Fails if either credential is empty or the HTTP client cannot be built.
    pub fn new(credentials: ProviderCredentials, dry_run: bool) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a new Cloudflare provider (production/live mode)
    pub fn new_live(credentials: ProviderCredentials) -> Result<Self> {
        Self::new(credentials, false)
    }

    /// Create a new Cloudflare provider (dry-run mode)
    ///
    /// In dry-run mode, the provider will perform all GET requests but skip
    /// writes, logging what would have been changed.
    pub fn new_dry_run(credentials: ProviderCredentials) -> Result<Self> {
        Self::new(credentials, true)
    }

    /// Point the provider at a different API base (e.g. a local mock server)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Build a request with the account headers
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Auth-Email", &self.credentials.account_email)
            .header("X-Auth-Key", &self.credentials.api_key)
            .header("Content-Type", "application/json")
    }

    /// Send a request, failing on transport errors and non-2xx statuses
    async fn send(&self, request: reqwest::RequestBuilder, context: &str) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("Cloudflare request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text, context));
        }

        Ok(response)
    }

    /// Decode a successful response body
    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("Failed to read Cloudflare response: {}", e)))?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        Ok(envelope.result)
    }
}

/// Map a non-success status to a specific error
fn status_error(status: StatusCode, error_text: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::provider(
            PROVIDER_NAME,
            format!(
                "Authentication failed: Invalid email/key or insufficient permissions. Status: {}",
                status
            ),
        ),
        404 => Error::not_found(format!("{}: {}", context, status)),
        409 => Error::provider(
            PROVIDER_NAME,
            format!("Conflict: Record is being updated by another process. Status: {}", status),
        ),
        429 => Error::provider(
            PROVIDER_NAME,
            format!("Rate limit exceeded. Please retry later. Status: {}", status),
        ),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("Cloudflare server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("{} failed: {} - {}", context, status, error_text),
        ),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// X-Auth-Email: <email>
    /// X-Auth-Key: <key>
    /// ```
    async fn lookup_zone(&self, zone_domain: &str) -> Result<String> {
        tracing::debug!("Looking up zone ID for domain: {}", zone_domain);

        let url = format!("{}/zones", self.api_base);
        let request = self
            .request(reqwest::Method::GET, &url)
            .query(&[("name", zone_domain)]);
        let response = self.send(request, "Zone lookup").await?;

        let zones: Vec<Zone> = Self::decode(response).await?;
        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone_domain)))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=www.example.com
    /// ```
    ///
    /// The first record of `record_type` in the reply wins.
    async fn lookup_record(
        &self,
        zone_id: &str,
        fqdn: &str,
        record_type: &str,
    ) -> Result<Option<String>> {
        tracing::debug!("Looking up record ID: {} (type: {})", fqdn, record_type);

        let url = format!("{}/zones/{}/dns_records", self.api_base, zone_id);
        let request = self
            .request(reqwest::Method::GET, &url)
            .query(&[("name", fqdn)]);
        let response = self.send(request, "Record lookup").await?;

        let records: Vec<DnsRecord> = Self::decode(response).await?;
        let record_id = records
            .into_iter()
            .find(|record| record.record_type == record_type)
            .map(|record| record.id);

        match &record_id {
            Some(id) => tracing::debug!("Found record ID: {}", id),
            None => tracing::debug!("No {} record for {}", record_type, fqdn),
        }
        Ok(record_id)
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// { "id": "...", "type": "A", "name": "www.example.com", "content": "1.2.3.4" }
    /// ```
    ///
    /// Only a 200 reply counts as success.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        fqdn: &str,
        content: &str,
    ) -> Result<()> {
        let url = format!("{}/zones/{}/dns_records/{}", self.api_base, zone_id, record_id);
        let payload = UpdateRecordRequest {
            // The record's own id, not the zone id
            id: record_id,
            record_type: "A",
            name: fqdn,
            content,
        };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(&payload)?
            );
            return Ok(());
        }

        let request = self.request(reqwest::Method::PUT, &url).json(&payload);
        let response = self.send(request, "Record update").await?;

        if response.status() != StatusCode::OK {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("Record update returned {} instead of 200", response.status()),
            ));
        }

        tracing::debug!("DNS record updated: {} -> {}", fqdn, content);
        Ok(())
    }

    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// { "type": "A", "name": "www.example.com", "content": "1.2.3.4", "ttl": 1, "proxied": false }
    /// ```
    async fn create_record(&self, zone_id: &str, fqdn: &str, content: &str) -> Result<()> {
        let url = format!("{}/zones/{}/dns_records", self.api_base, zone_id);
        let payload = CreateRecordRequest {
            record_type: "A",
            name: fqdn,
            content,
            // 1 = automatic
            ttl: 1,
            proxied: false,
        };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(&payload)?
            );
            return Ok(());
        }

        let request = self.request(reqwest::Method::POST, &url).json(&payload);
        self.send(request, "Record create").await?;

        tracing::debug!("DNS record created: {} -> {}", fqdn, content);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
