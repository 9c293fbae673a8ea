//! Candidate selection
//!
//! The [`Selector`] probes every address of a pool concurrently, waits for all
//! of them, and picks the lowest-latency address whose loss is acceptable.
//!
//! ## Fan-out
//!
//! ```text
//!               ┌─ probe(addr[0]) ─┐
//! addresses ────┼─ probe(addr[1]) ─┼──► mpsc ──► join all ──► sort ──► winner
//!               └─ probe(addr[n]) ─┘
//! ```
//!
//! One task per candidate, one send per task. Nothing is read from the
//! channel until every task has finished, so partial results are never acted
//! on. A slow probe is bounded by its own per-request timeouts; there is no
//! early cutoff.

use crate::traits::{Prober, ProbeResult, PROBE_LOSS_CUTOFF};
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default echo requests per candidate
pub const DEFAULT_POOL_SAMPLES: u32 = 4;

/// Concurrent pool prober and winner picker
pub struct Selector {
    prober: Arc<dyn Prober>,
    sample_count: u32,
    max_loss_rate: f64,
}

impl Selector {
    /// Create a selector with the default sample count and loss threshold
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            sample_count: DEFAULT_POOL_SAMPLES,
            max_loss_rate: PROBE_LOSS_CUTOFF,
        }
    }

    /// Set the number of echo requests per candidate
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set the highest acceptable loss rate
    pub fn with_max_loss_rate(mut self, max_loss_rate: f64) -> Self {
        self.max_loss_rate = max_loss_rate;
        self
    }

    /// Probe every address concurrently and return one result per address
    ///
    /// Results come back in input order. A probe task that panics is reported
    /// as unreachable.
    pub async fn probe_all(&self, addresses: &[String]) -> Vec<ProbeResult> {
        if addresses.is_empty() {
            return Vec::new();
        }

        let (tx, mut rx) = mpsc::channel(addresses.len());

        let handles: Vec<_> = addresses
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, address)| {
                let prober = Arc::clone(&self.prober);
                let tx = tx.clone();
                let sample_count = self.sample_count;
                tokio::spawn(async move {
                    let result = prober.probe(&address, sample_count).await;
                    // Capacity equals the task count, so this never waits
                    let _ = tx.send((index, result)).await;
                })
            })
            .collect();
        drop(tx);

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                warn!("Probe task failed: {}", e);
            }
        }

        let mut slots: Vec<Option<ProbeResult>> = vec![None; addresses.len()];
        while let Some((index, result)) = rx.recv().await {
            slots[index] = Some(result);
        }

        slots
            .into_iter()
            .zip(addresses)
            .map(|(slot, address)| slot.unwrap_or_else(|| ProbeResult::unreachable(address.as_str())))
            .collect()
    }

    /// Probe a pool and return the winning address, if any
    ///
    /// `None` means no candidate passed the loss filter and nothing should be
    /// updated.
    pub async fn select_best(&self, addresses: &[String]) -> Option<String> {
        let results = self.probe_all(addresses).await;
        debug!("Probed {} candidate(s)", results.len());

        let winner = pick_winner(&results, self.max_loss_rate)?;
        info!(
            "Selected {} with loss rate {:.2} and latency {}ms",
            winner.address, winner.loss_rate, winner.latency_ms
        );
        Some(winner.address.clone())
    }
}

/// Pick the lowest-latency result whose loss is at most `max_loss_rate`
///
/// Sorting is stable, so equal latencies keep their order in `results`.
/// The loss filter is the only gate: a result carrying the 9999ms sentinel
/// still wins when it is the only one within `max_loss_rate`, ranked last.
pub fn pick_winner(results: &[ProbeResult], max_loss_rate: f64) -> Option<&ProbeResult> {
    let mut ranked: Vec<&ProbeResult> = results.iter().collect();
    ranked.sort_by_key(|result| result.latency_ms);
    ranked
        .into_iter()
        .find(|result| result.loss_rate <= max_loss_rate)
}
