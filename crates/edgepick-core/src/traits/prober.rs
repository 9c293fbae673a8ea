// # Prober Trait
//
// Defines the interface for measuring latency and packet loss to a single
// address.
//
// ## Implementations
//
// - ICMP echo: `edgepick-probe-icmp` crate
//
// ## Usage
//
// ```rust,ignore
// use edgepick_core::Prober;
//
// let result = prober.probe("1.1.1.1", 4).await;
// if result.is_unreachable() {
//     // sentinel: could not probe, or probed and found unusable
// }
// ```

use async_trait::async_trait;
use std::time::Duration;

/// Latency value marking an unreachable or unusable address
pub const UNREACHABLE_LATENCY_MS: u32 = 9999;

/// Measured loss at or above this rate makes the latency meaningless
pub const PROBE_LOSS_CUTOFF: f64 = 0.35;

/// Raw echo statistics collected by a transport
///
/// `rtts` holds one entry per answered request. Requests that timed out
/// simply have no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingStatistics {
    /// Number of echo requests sent
    pub sent: u32,
    /// Round-trip time of every answered request
    pub rtts: Vec<Duration>,
}

impl PingStatistics {
    /// Create statistics for `sent` requests with no replies yet
    pub fn new(sent: u32) -> Self {
        Self {
            sent,
            rtts: Vec::new(),
        }
    }

    /// Record one answered request
    pub fn record(&mut self, rtt: Duration) {
        self.rtts.push(rtt);
    }

    /// Number of answered requests
    pub fn received(&self) -> u32 {
        self.rtts.len() as u32
    }

    /// Fraction of requests left unanswered, in [0, 1]
    pub fn loss_rate(&self) -> f64 {
        if self.sent == 0 {
            return 1.0;
        }
        let lost = self.sent.saturating_sub(self.received());
        f64::from(lost) / f64::from(self.sent)
    }

    /// Mean round-trip time over answered requests
    pub fn mean_rtt(&self) -> Option<Duration> {
        if self.rtts.is_empty() {
            return None;
        }
        let total: Duration = self.rtts.iter().sum();
        Some(total / self.rtts.len() as u32)
    }
}

/// Outcome of probing one address
///
/// Immutable once produced. A latency of [`UNREACHABLE_LATENCY_MS`] means the
/// address could not be probed or was too lossy to be useful; callers do not
/// need to tell those cases apart.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    /// The probed address, exactly as given to the prober
    pub address: String,
    /// Mean round-trip time in whole milliseconds
    pub latency_ms: u32,
    /// Fraction of lost requests, rounded to two decimal places
    pub loss_rate: f64,
}

impl ProbeResult {
    /// Sentinel result for an address the transport could not even reach
    pub fn unreachable(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            latency_ms: UNREACHABLE_LATENCY_MS,
            loss_rate: 1.0,
        }
    }

    /// Build a result from raw statistics
    ///
    /// Loss at or above [`PROBE_LOSS_CUTOFF`] (including no replies at all)
    /// keeps the measured loss but pins latency to the sentinel. Otherwise the
    /// mean RTT is truncated to whole milliseconds.
    pub fn from_statistics(address: impl Into<String>, stats: &PingStatistics) -> Self {
        let loss_rate = round_two_places(stats.loss_rate());

        let latency_ms = match stats.mean_rtt() {
            Some(mean) if stats.loss_rate() < PROBE_LOSS_CUTOFF => {
                u32::try_from(mean.as_millis()).unwrap_or(UNREACHABLE_LATENCY_MS)
            }
            _ => UNREACHABLE_LATENCY_MS,
        };

        Self {
            address: address.into(),
            latency_ms,
            loss_rate,
        }
    }

    /// Whether latency carries the unreachable sentinel
    pub fn is_unreachable(&self) -> bool {
        self.latency_ms == UNREACHABLE_LATENCY_MS
    }
}

fn round_two_places(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Trait for latency probe implementations
///
/// A probe sends `sample_count` echo requests, each with its own timeout, and
/// never retries an individual lost request: loss is the signal.
///
/// # Contract
///
/// - Never fails. If the transport cannot be initialised for `address`
///   (malformed address, unresolvable name, no route, no socket permission),
///   return [`ProbeResult::unreachable`].
/// - No logging. Callers decide what is worth reporting.
/// - No side effects beyond network traffic.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Measure latency and loss to `address`
    async fn probe(&self, address: &str, sample_count: u32) -> ProbeResult;
}
