//! Per-domain orchestration
//!
//! The EdgepickEngine is responsible for:
//! - Checking the latency of a domain's current address
//! - Fetching candidate pools when the domain is underperforming
//! - Selecting a winner among the candidates
//! - Publishing the winner through the update protocol
//!
//! ## Architecture
//!
//! ```text
//!                      ┌────────────────┐
//!   DomainTarget ────► │ EdgepickEngine │ ──── EngineEvent ───► monitoring
//!                      └────────────────┘
//!                              │
//!      ┌───────────────┬───────┴────────┬────────────────┐
//!      ▼               ▼                ▼                ▼
//! ┌──────────┐ ┌─────────────────┐ ┌──────────┐  ┌──────────────┐
//! │  Prober  │ │ CandidateSource │ │ Selector │  │   Updater    │
//! │ (health) │ │ (archive)       │ │ (fan-out)│  │ (DnsProvider)│
//! └──────────┘ └─────────────────┘ └──────────┘  └──────────────┘
//! ```
//!
//! ## Flow
//!
//! 1. Probe `subdomain.zone` with the health-check sample count
//! 2. Latency within threshold → stop
//! 3. Fetch the archive and walk its entries in filter order
//! 4. Select a winner from the first non-empty pool
//! 5. Publish the winner, or stop with "no suitable candidate"
//!
//! Domains are handled strictly one after another and no state survives a
//! run. A failure for one domain never affects the next.

use crate::candidates::PoolCursor;
use crate::config::{DomainTarget, Settings};
use crate::error::Result;
use crate::selector::Selector;
use crate::traits::{CandidateSource, DnsProvider, Prober};
use crate::updater::{PublishOutcome, Updater};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Capacity of the engine event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by the EdgepickEngine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Current address measured
    HealthChecked {
        domain: String,
        latency_ms: u32,
        loss_rate: f64,
    },

    /// Current address is too slow, candidate search started
    SearchStarted { domain: String },

    /// A candidate pool was probed
    PoolProbed {
        domain: String,
        entry: String,
        candidates: usize,
        winner: Option<String>,
    },

    /// Update protocol finished
    PublishFinished {
        domain: String,
        address: String,
        outcome: PublishOutcome,
    },

    /// Domain handling finished
    DomainFinished {
        domain: String,
        outcome: DomainOutcome,
    },
}

/// What happened to one domain during a run
#[derive(Debug, Clone, PartialEq)]
pub enum DomainOutcome {
    /// Current address is fast enough, nothing to do
    Healthy { latency_ms: u32 },
    /// Archive could not be fetched, opened or read
    SourceFailed { error: String },
    /// No candidate passed the loss filter
    NoCandidate,
    /// Record now points at `address`
    Updated { address: String, attempts: usize },
    /// Every update attempt was abandoned
    UpdateFailed {
        address: String,
        attempts: usize,
        error: String,
    },
}

/// Outcome of one domain together with when it finished
#[derive(Debug, Clone)]
pub struct DomainReport {
    pub target: DomainTarget,
    pub outcome: DomainOutcome,
    pub finished_at: DateTime<Utc>,
}

/// Core edgepick engine
///
/// Holds its collaborators as explicitly passed-in trait objects; nothing is
/// process-global, so every collaborator can be replaced in tests.
pub struct EdgepickEngine {
    /// Prober for the current-address health check
    prober: Arc<dyn Prober>,

    /// Source of candidate archives
    source: Box<dyn CandidateSource>,

    /// Pool fan-out and winner selection
    selector: Selector,

    /// Update protocol driver
    updater: Updater,

    /// Latency above which a replacement is searched for
    latency_threshold_ms: u32,

    /// Echo requests sent to the current address
    health_check_samples: u32,

    /// Move on to later entries when a pool yields no winner
    search_all_entries: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl EdgepickEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        prober: Arc<dyn Prober>,
        source: Box<dyn CandidateSource>,
        provider: Arc<dyn DnsProvider>,
        settings: Settings,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        settings.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let selector = Selector::new(Arc::clone(&prober))
            .with_sample_count(settings.pool_probe_samples)
            .with_max_loss_rate(settings.max_loss_rate);

        let engine = Self {
            prober,
            source,
            selector,
            updater: Updater::new(provider, settings.update),
            latency_threshold_ms: settings.latency_threshold_ms,
            health_check_samples: settings.health_check_samples,
            search_all_entries: settings.search_all_entries,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Handle every domain in order
    pub async fn run_all(&self, targets: &[DomainTarget]) -> Vec<DomainReport> {
        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = self.run_domain(target).await;
            reports.push(DomainReport {
                target: target.clone(),
                outcome,
                finished_at: Utc::now(),
            });
        }
        reports
    }

    /// Handle one domain
    pub async fn run_domain(&self, target: &DomainTarget) -> DomainOutcome {
        let domain = target.fqdn();
        let outcome = self.evaluate(target, &domain).await;

        self.emit_event(EngineEvent::DomainFinished {
            domain,
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn evaluate(&self, target: &DomainTarget, domain: &str) -> DomainOutcome {
        let current = self.prober.probe(domain, self.health_check_samples).await;
        self.emit_event(EngineEvent::HealthChecked {
            domain: domain.to_string(),
            latency_ms: current.latency_ms,
            loss_rate: current.loss_rate,
        });

        if current.latency_ms <= self.latency_threshold_ms {
            info!(
                "{} latency {}ms is within {}ms, not updating",
                domain, current.latency_ms, self.latency_threshold_ms
            );
            return DomainOutcome::Healthy {
                latency_ms: current.latency_ms,
            };
        }

        info!(
            "{} latency {}ms exceeds {}ms, searching {} for a replacement",
            domain,
            current.latency_ms,
            self.latency_threshold_ms,
            self.source.source_name()
        );
        self.emit_event(EngineEvent::SearchStarted {
            domain: domain.to_string(),
        });

        let archive = match self.source.fetch_archive().await {
            Ok(archive) => archive,
            Err(e) => {
                error!("Failed to fetch candidate archive for {}: {}", domain, e);
                return DomainOutcome::SourceFailed {
                    error: e.to_string(),
                };
            }
        };

        let mut cursor = match PoolCursor::new(
            self.source.as_ref(),
            &archive,
            target.candidate_filter.as_deref(),
        ) {
            Ok(cursor) => cursor,
            Err(e) => {
                error!("Failed to open candidate archive for {}: {}", domain, e);
                return DomainOutcome::SourceFailed {
                    error: e.to_string(),
                };
            }
        };

        loop {
            let pool = match cursor.next_pool() {
                Ok(Some(pool)) => pool,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read candidate archive for {}: {}", domain, e);
                    return DomainOutcome::SourceFailed {
                        error: e.to_string(),
                    };
                }
            };

            debug!(
                "Probing {} candidate(s) from {} for {}",
                pool.addresses.len(),
                pool.entry,
                domain
            );
            let winner = self.selector.select_best(&pool.addresses).await;
            self.emit_event(EngineEvent::PoolProbed {
                domain: domain.to_string(),
                entry: pool.entry.clone(),
                candidates: pool.addresses.len(),
                winner: winner.clone(),
            });

            match winner {
                Some(address) => return self.publish(target, domain, address).await,
                None if self.search_all_entries => {
                    debug!("No winner in {}, trying the next entry", pool.entry);
                }
                None => break,
            }
        }

        info!("No suitable candidate for {}, not updating", domain);
        DomainOutcome::NoCandidate
    }

    async fn publish(&self, target: &DomainTarget, domain: &str, address: String) -> DomainOutcome {
        let outcome = self
            .updater
            .publish(&address, &target.subdomain, &target.zone_domain)
            .await;

        self.emit_event(EngineEvent::PublishFinished {
            domain: domain.to_string(),
            address: address.clone(),
            outcome: outcome.clone(),
        });

        match outcome {
            PublishOutcome::Published { attempts, .. } => DomainOutcome::Updated { address, attempts },
            PublishOutcome::Failed {
                attempts,
                last_error,
            } => DomainOutcome::UpdateFailed {
                address,
                attempts,
                error: last_error,
            },
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
