//! Test doubles and common utilities for contract tests
//!
//! These doubles script collaborator behaviour and count calls; they do no
//! network I/O.

#![allow(dead_code)]

use edgepick_core::config::{Settings, UpdateSettings};
use edgepick_core::error::{Error, Result};
use edgepick_core::traits::{CandidateSource, DnsProvider, ProbeResult, Prober};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A prober answering from a fixed table
///
/// Unknown addresses are unreachable.
#[derive(Default)]
pub struct ScriptedProber {
    results: HashMap<String, (u32, f64)>,
    delays: HashMap<String, Duration>,
    probed: Mutex<Vec<(String, u32)>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `address` with the given latency and loss
    pub fn with(mut self, address: &str, latency_ms: u32, loss_rate: f64) -> Self {
        self.results
            .insert(address.to_string(), (latency_ms, loss_rate));
        self
    }

    /// Make probes of `address` take `delay` before answering
    pub fn with_delay(mut self, address: &str, delay: Duration) -> Self {
        self.delays.insert(address.to_string(), delay);
        self
    }

    /// Every (address, sample_count) probed so far
    pub fn probed(&self) -> Vec<(String, u32)> {
        self.probed.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        self.probed.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str, sample_count: u32) -> ProbeResult {
        self.probed
            .lock()
            .unwrap()
            .push((address.to_string(), sample_count));

        if let Some(delay) = self.delays.get(address) {
            tokio::time::sleep(*delay).await;
        }

        match self.results.get(address) {
            Some((latency_ms, loss_rate)) => ProbeResult {
                address: address.to_string(),
                latency_ms: *latency_ms,
                loss_rate: *loss_rate,
            },
            None => ProbeResult::unreachable(address),
        }
    }
}

/// A candidate source holding named entries in memory
///
/// The "archive" bytes are ignored; entries are served from the list.
#[derive(Default)]
pub struct InMemorySource {
    entries: Vec<(String, String)>,
    fail_fetch: bool,
    fail_list: bool,
    fail_read: bool,
    fetch_calls: AtomicUsize,
    read_calls: Mutex<Vec<String>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: &str, content: &str) -> Self {
        self.entries.push((name.to_string(), content.to_string()));
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Make the fetched archive unopenable
    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_read(mut self) -> Self {
        self.fail_read = true;
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn read_entries(&self) -> Vec<String> {
        self.read_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CandidateSource for InMemorySource {
    async fn fetch_archive(&self) -> Result<Vec<u8>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(Error::source("archive download failed"));
        }
        Ok(b"in-memory".to_vec())
    }

    fn list_entries(&self, _archive: &[u8]) -> Result<Vec<String>> {
        if self.fail_list {
            return Err(Error::archive("invalid zip archive"));
        }
        Ok(self.entries.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_entry(&self, _archive: &[u8], name: &str) -> Result<Vec<u8>> {
        self.read_calls.lock().unwrap().push(name.to_string());
        if self.fail_read {
            return Err(Error::archive(format!("cannot read {}", name)));
        }
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, content)| content.as_bytes().to_vec())
            .ok_or_else(|| Error::archive(format!("no entry {}", name)))
    }

    fn source_name(&self) -> &'static str {
        "in-memory"
    }
}

/// A DNS provider with scripted step failures and call counters
pub struct ScriptedDnsProvider {
    /// Zone lookups fail for the first N calls (usize::MAX = always)
    zone_failures: usize,
    /// Record lookups return this id (None = no "A" record)
    record_id: Option<String>,
    /// Updates fail for the first N calls
    update_failures: usize,
    zone_calls: AtomicUsize,
    record_calls: AtomicUsize,
    update_calls: AtomicUsize,
    create_calls: AtomicUsize,
    published: Mutex<Vec<String>>,
}

impl ScriptedDnsProvider {
    /// Provider where every step succeeds
    pub fn healthy() -> Self {
        Self {
            zone_failures: 0,
            record_id: Some("record-1".to_string()),
            update_failures: 0,
            zone_calls: AtomicUsize::new(0),
            record_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn with_zone_failures(mut self, failures: usize) -> Self {
        self.zone_failures = failures;
        self
    }

    pub fn with_update_failures(mut self, failures: usize) -> Self {
        self.update_failures = failures;
        self
    }

    pub fn without_record(mut self) -> Self {
        self.record_id = None;
        self
    }

    pub fn zone_calls(&self) -> usize {
        self.zone_calls.load(Ordering::SeqCst)
    }

    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Contents successfully written, in order
    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsProvider for ScriptedDnsProvider {
    async fn lookup_zone(&self, zone_domain: &str) -> Result<String> {
        let call = self.zone_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.zone_failures {
            return Err(Error::http(format!("zone lookup for {} timed out", zone_domain)));
        }
        Ok("zone-1".to_string())
    }

    async fn lookup_record(
        &self,
        _zone_id: &str,
        _fqdn: &str,
        _record_type: &str,
    ) -> Result<Option<String>> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.record_id.clone())
    }

    async fn update_record(
        &self,
        _zone_id: &str,
        _record_id: &str,
        _fqdn: &str,
        content: &str,
    ) -> Result<()> {
        let call = self.update_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.update_failures {
            return Err(Error::http("update returned 500"));
        }
        self.published.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn create_record(&self, _zone_id: &str, _fqdn: &str, content: &str) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.published.lock().unwrap().push(content.to_string());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Default update settings without waiting between attempts
pub fn fast_update_settings() -> UpdateSettings {
    UpdateSettings::default().without_backoff()
}

/// Default settings without waiting between update attempts
pub fn fast_settings() -> Settings {
    Settings {
        update: fast_update_settings(),
        ..Default::default()
    }
}

/// Lets a test keep a handle on an [`InMemorySource`] owned by the engine
pub struct SharedSource(pub Arc<InMemorySource>);

#[async_trait::async_trait]
impl CandidateSource for SharedSource {
    async fn fetch_archive(&self) -> Result<Vec<u8>> {
        self.0.fetch_archive().await
    }

    fn list_entries(&self, archive: &[u8]) -> Result<Vec<String>> {
        self.0.list_entries(archive)
    }

    fn read_entry(&self, archive: &[u8], name: &str) -> Result<Vec<u8>> {
        self.0.read_entry(archive, name)
    }

    fn source_name(&self) -> &'static str {
        self.0.source_name()
    }
}
