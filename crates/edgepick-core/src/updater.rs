//! DNS update protocol
//!
//! The [`Updater`] pushes a winning address to the provider. Every attempt
//! walks the same three steps, each depending on the previous one:
//!
//! ```text
//! LookupZone ──► LookupRecord ──► UpdateRecord ──► Done
//!     │              │   │             │
//!     │              │   └─(no "A", Create policy)──► CreateRecord ──► Done
//!     └──────────────┴────────── any failure ─────────┘
//!                         abandon attempt
//! ```
//!
//! An abandoned attempt is never resumed: the next attempt starts again from
//! `LookupZone`, so zone and record ids are always resolved fresh. Attempts
//! are bounded by [`UpdateSettings::max_attempts`] and separated by a capped
//! exponential backoff.

use crate::config::{MissingRecordPolicy, UpdateSettings};
use crate::error::Error;
use crate::traits::DnsProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Record type the protocol manages
pub const RECORD_TYPE_A: &str = "A";

/// Longest exponent used when doubling the retry delay
const MAX_BACKOFF_SHIFT: u32 = 16;

/// How a successful attempt changed the zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    /// An existing record was overwritten
    Updated,
    /// A new record was created
    Created,
}

/// Final result of [`Updater::publish`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// An attempt reached `Done`
    Published {
        /// What the successful attempt did
        action: PublishAction,
        /// 1-based number of the successful attempt
        attempts: usize,
    },
    /// Every attempt was abandoned
    Failed {
        /// Attempts made
        attempts: usize,
        /// Why the last attempt was abandoned
        last_error: String,
    },
}

impl PublishOutcome {
    /// Whether the record now points at the new address
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Published { .. })
    }

    /// Number of attempts made
    pub fn attempts(&self) -> usize {
        match self {
            Self::Published { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Why a single attempt was abandoned
#[derive(Debug, thiserror::Error)]
enum AttemptFailure {
    #[error(transparent)]
    Provider(#[from] Error),

    #[error("no \"A\" record found for {0}")]
    MissingRecord(String),
}

/// Position inside one attempt
#[derive(Debug)]
enum AttemptStep {
    LookupZone,
    LookupRecord { zone_id: String },
    UpdateRecord { zone_id: String, record_id: String },
    CreateRecord { zone_id: String },
    Done(PublishAction),
}

/// Drives the provider protocol with bounded retry
pub struct Updater {
    provider: Arc<dyn DnsProvider>,
    settings: UpdateSettings,
}

impl Updater {
    /// Create an updater for `provider`
    pub fn new(provider: Arc<dyn DnsProvider>, settings: UpdateSettings) -> Self {
        Self { provider, settings }
    }

    /// Point `record_name.zone_domain` at `address`
    ///
    /// Never returns an error: exhausted attempts are logged and reported as
    /// [`PublishOutcome::Failed`].
    pub async fn publish(&self, address: &str, record_name: &str, zone_domain: &str) -> PublishOutcome {
        let fqdn = format!("{}.{}", record_name, zone_domain);
        let max_attempts = self.settings.max_attempts;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            match self.run_attempt(address, zone_domain, &fqdn).await {
                Ok(action) => {
                    info!(
                        "{} {} -> {} via {} (attempt {}/{})",
                        match action {
                            PublishAction::Updated => "Updated",
                            PublishAction::Created => "Created",
                        },
                        fqdn,
                        address,
                        self.provider.provider_name(),
                        attempt,
                        max_attempts
                    );
                    return PublishOutcome::Published {
                        action,
                        attempts: attempt,
                    };
                }
                Err(failure) => {
                    warn!(
                        "Update attempt {}/{} for {} failed: {}",
                        attempt, max_attempts, fqdn, failure
                    );
                    last_error = failure.to_string();

                    if attempt < max_attempts
                        && let Some(delay) = self.backoff_delay(attempt)
                    {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        error!(
            "Failed to update {} -> {} after {} attempts: {}",
            fqdn, address, max_attempts, last_error
        );
        PublishOutcome::Failed {
            attempts: max_attempts,
            last_error,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    fn backoff_delay(&self, attempt: usize) -> Option<Duration> {
        if self.settings.retry_delay_ms == 0 {
            return None;
        }
        let shift = u32::try_from(attempt.saturating_sub(1))
            .unwrap_or(MAX_BACKOFF_SHIFT)
            .min(MAX_BACKOFF_SHIFT);
        let millis = self
            .settings
            .retry_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.settings.max_retry_delay_ms.max(self.settings.retry_delay_ms));
        Some(Duration::from_millis(millis))
    }

    /// Run one attempt from `LookupZone` to `Done`
    async fn run_attempt(
        &self,
        address: &str,
        zone_domain: &str,
        fqdn: &str,
    ) -> Result<PublishAction, AttemptFailure> {
        let mut step = AttemptStep::LookupZone;

        loop {
            step = match step {
                AttemptStep::LookupZone => {
                    let zone_id = self.provider.lookup_zone(zone_domain).await?;
                    debug!("Zone {} resolved to {}", zone_domain, zone_id);
                    AttemptStep::LookupRecord { zone_id }
                }
                AttemptStep::LookupRecord { zone_id } => {
                    match self
                        .provider
                        .lookup_record(&zone_id, fqdn, RECORD_TYPE_A)
                        .await?
                    {
                        Some(record_id) => {
                            debug!("Record {} resolved to {}", fqdn, record_id);
                            AttemptStep::UpdateRecord { zone_id, record_id }
                        }
                        None => match self.settings.missing_record {
                            MissingRecordPolicy::SkipAttempt => {
                                return Err(AttemptFailure::MissingRecord(fqdn.to_string()));
                            }
                            MissingRecordPolicy::Create => AttemptStep::CreateRecord { zone_id },
                        },
                    }
                }
                AttemptStep::UpdateRecord { zone_id, record_id } => {
                    self.provider
                        .update_record(&zone_id, &record_id, fqdn, address)
                        .await?;
                    AttemptStep::Done(PublishAction::Updated)
                }
                AttemptStep::CreateRecord { zone_id } => {
                    self.provider.create_record(&zone_id, fqdn, address).await?;
                    AttemptStep::Done(PublishAction::Created)
                }
                AttemptStep::Done(action) => return Ok(action),
            };
        }
    }
}
