//! Configuration types for edgepick
//!
//! The on-disk format is a JSON object:
//!
//! ```json
//! {
//!   "email": "ops@example.com",
//!   "key": "cloudflare-global-api-key",
//!   "domainInfos": [["www", "example.com"], ["cdn", "example.com", "443"]],
//!   "settings": { "latency_threshold_ms": 200 }
//! }
//! ```
//!
//! `settings` and every field inside it are optional.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Default location of the candidate archive
pub const DEFAULT_ARCHIVE_URL: &str = "https://zip.baipiao.eu.org";

/// Main edgepick configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgepickConfig {
    /// Provider account credentials
    #[serde(flatten)]
    pub credentials: ProviderCredentials,

    /// Domains to keep pointed at a fast endpoint
    #[serde(rename = "domainInfos", default)]
    pub domain_infos: Vec<DomainTarget>,

    /// Optional tuning
    #[serde(default)]
    pub settings: Settings,
}

impl EdgepickConfig {
    /// Read and parse a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Load, parse and validate a configuration file under `policy`
    ///
    /// With [`ConfigLoadPolicy::Lenient`] any failure is logged and a default
    /// configuration (no domains) is returned instead.
    pub fn load(path: impl AsRef<Path>, policy: ConfigLoadPolicy) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let loaded = Self::from_file(path).and_then(|config| {
            config.validate()?;
            Ok(config)
        });

        match (loaded, policy) {
            (Ok(config), _) => Ok(config),
            (Err(e), ConfigLoadPolicy::Strict) => Err(e),
            (Err(e), ConfigLoadPolicy::Lenient) => {
                warn!(
                    "Unable to load configuration from {}: {}; continuing with no domains",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.domain_infos.is_empty() {
            self.credentials.validate()?;
        }

        for target in &self.domain_infos {
            target.validate()?;
        }

        self.settings.validate()
    }
}

/// What to do when the configuration file cannot be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigLoadPolicy {
    /// Log the failure and carry on with an empty configuration
    #[default]
    Lenient,
    /// Return the failure to the caller
    Strict,
}

/// Provider account credentials
///
/// Shared read-only by every update. The Debug implementation hides the key.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderCredentials {
    /// Account email (`X-Auth-Email`)
    #[serde(rename = "email", default)]
    pub account_email: String,

    /// Global API key (`X-Auth-Key`)
    /// ⚠️ NEVER log this value
    #[serde(rename = "key", default)]
    pub api_key: String,
}

impl ProviderCredentials {
    /// Create credentials
    pub fn new(account_email: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            account_email: account_email.into(),
            api_key: api_key.into(),
        }
    }

    /// Validate that both values are present
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.account_email.trim().is_empty() {
            return Err(crate::Error::config("Account email cannot be empty"));
        }
        if self.api_key.trim().is_empty() {
            return Err(crate::Error::config("API key cannot be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("account_email", &self.account_email)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// One managed domain
///
/// Serialised as `[subdomain, zoneDomain]` or
/// `[subdomain, zoneDomain, candidateFilter]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DomainTarget {
    /// Record label inside the zone (e.g. "www")
    pub subdomain: String,
    /// Registered zone (e.g. "example.com")
    pub zone_domain: String,
    /// Preferred archive entry name fragment
    pub candidate_filter: Option<String>,
}

impl DomainTarget {
    /// Create a target without a candidate filter
    pub fn new(subdomain: impl Into<String>, zone_domain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            zone_domain: zone_domain.into(),
            candidate_filter: None,
        }
    }

    /// Set the candidate filter
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.candidate_filter = Some(filter.into());
        self
    }

    /// Fully qualified record name
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.subdomain, self.zone_domain)
    }

    /// Validate the target
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.subdomain.trim().is_empty() {
            return Err(crate::Error::config("Subdomain cannot be empty"));
        }
        if self.zone_domain.trim().is_empty() {
            return Err(crate::Error::config("Zone domain cannot be empty"));
        }
        Ok(())
    }
}

impl TryFrom<Vec<String>> for DomainTarget {
    type Error = String;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(subdomain), Some(zone_domain), filter, None) => Ok(Self {
                subdomain,
                zone_domain,
                candidate_filter: filter.filter(|f| !f.is_empty()),
            }),
            _ => Err("domain entry must be [subdomain, zone] or [subdomain, zone, filter]".to_string()),
        }
    }
}

impl From<DomainTarget> for Vec<String> {
    fn from(target: DomainTarget) -> Self {
        let mut parts = vec![target.subdomain, target.zone_domain];
        parts.extend(target.candidate_filter);
        parts
    }
}

/// Tuning for probing, selection and updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Current-address latency above which a replacement is searched for
    #[serde(default = "default_latency_threshold_ms")]
    pub latency_threshold_ms: u32,

    /// Highest loss rate a winner may have
    #[serde(default = "default_max_loss_rate")]
    pub max_loss_rate: f64,

    /// Echo requests sent to the current address
    #[serde(default = "default_health_check_samples")]
    pub health_check_samples: u32,

    /// Echo requests sent to each pool candidate
    #[serde(default = "default_pool_probe_samples")]
    pub pool_probe_samples: u32,

    /// Where the candidate archive is downloaded from
    #[serde(default = "default_archive_url")]
    pub archive_url: String,

    /// Keep trying later archive entries when one yields no winner
    #[serde(default)]
    pub search_all_entries: bool,

    /// Update protocol retry settings
    #[serde(default)]
    pub update: UpdateSettings,
}

impl Settings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(0.0..=1.0).contains(&self.max_loss_rate) {
            return Err(crate::Error::config(format!(
                "max_loss_rate must be within [0, 1], got {}",
                self.max_loss_rate
            )));
        }
        if self.health_check_samples == 0 || self.pool_probe_samples == 0 {
            return Err(crate::Error::config("Sample counts must be > 0"));
        }
        if self.archive_url.is_empty() {
            return Err(crate::Error::config("archive_url cannot be empty"));
        }
        self.update.validate()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            latency_threshold_ms: default_latency_threshold_ms(),
            max_loss_rate: default_max_loss_rate(),
            health_check_samples: default_health_check_samples(),
            pool_probe_samples: default_pool_probe_samples(),
            archive_url: default_archive_url(),
            search_all_entries: false,
            update: UpdateSettings::default(),
        }
    }
}

/// Update protocol retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// Full protocol attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay after the first failed attempt (doubles each attempt, 0 disables)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Upper bound on the delay between attempts
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// What to do when no "A" record exists
    #[serde(default)]
    pub missing_record: MissingRecordPolicy,
}

impl UpdateSettings {
    /// Validate the retry settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("update.max_attempts must be > 0"));
        }
        Ok(())
    }

    /// Settings with no waiting between attempts
    pub fn without_backoff(mut self) -> Self {
        self.retry_delay_ms = 0;
        self
    }
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            missing_record: MissingRecordPolicy::default(),
        }
    }
}

/// Behaviour when the record lookup finds no "A" record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRecordPolicy {
    /// Abandon the attempt; it counts against `max_attempts`
    #[default]
    SkipAttempt,
    /// Create the record instead of updating it
    Create,
}

fn default_latency_threshold_ms() -> u32 {
    200
}

fn default_max_loss_rate() -> f64 {
    0.35
}

fn default_health_check_samples() -> u32 {
    10
}

fn default_pool_probe_samples() -> u32 {
    4
}

fn default_archive_url() -> String {
    DEFAULT_ARCHIVE_URL.to_string()
}

fn default_max_attempts() -> usize {
    5
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_retry_delay_ms() -> u64 {
    8000
}
