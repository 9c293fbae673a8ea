//! Core traits for edgepick
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Prober`]: Measure latency and loss to one address
//! - [`CandidateSource`]: Fetch and read the candidate archive
//! - [`DnsProvider`]: Single-shot calls of the DNS update protocol

pub mod prober;
pub mod candidate_source;
pub mod dns_provider;

pub use prober::{Prober, ProbeResult, PingStatistics, UNREACHABLE_LATENCY_MS, PROBE_LOSS_CUTOFF};
pub use candidate_source::CandidateSource;
pub use dns_provider::DnsProvider;
