//! Contract Test: Per-Domain Orchestration
//!
//! Constraints verified:
//! - A healthy current address stops the run before any candidate work
//! - An underperforming address leads to exactly one publish of the winner
//! - No winner and source failures (fetch, open or read) end the domain
//!   without publishing
//! - Domains are isolated: one failure does not affect the next
//! - Archive entries are tried in filter order

mod common;

use common::*;
use edgepick_core::config::DomainTarget;
use edgepick_core::{DomainOutcome, EdgepickEngine, EngineEvent};
use std::sync::Arc;

fn engine(
    prober: Arc<ScriptedProber>,
    source: InMemorySource,
    provider: Arc<ScriptedDnsProvider>,
) -> (EdgepickEngine, tokio::sync::mpsc::Receiver<EngineEvent>) {
    EdgepickEngine::new(prober, Box::new(source), provider, fast_settings())
        .expect("engine construction succeeds")
}

#[tokio::test]
async fn healthy_domain_skips_fetch_and_update() {
    let prober = Arc::new(ScriptedProber::new().with("www.example.com", 150, 0.0));
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = Arc::new(InMemorySource::new().with_entry("a.txt", "1.2.3.4\n"));

    let (engine, _events) = EdgepickEngine::new(
        prober.clone(),
        Box::new(SharedSource(Arc::clone(&source))),
        provider.clone(),
        fast_settings(),
    )
    .expect("engine construction succeeds");

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert_eq!(outcome, DomainOutcome::Healthy { latency_ms: 150 });
    assert_eq!(source.fetch_calls(), 0);
    assert_eq!(provider.zone_calls(), 0);
    assert_eq!(provider.update_calls(), 0);
    // Only the health check ran, with the thorough sample count
    assert_eq!(prober.probed(), vec![("www.example.com".to_string(), 10)]);
}

#[tokio::test]
async fn latency_at_threshold_is_healthy() {
    let prober = Arc::new(ScriptedProber::new().with("www.example.com", 200, 0.0));
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let (engine, _events) = engine(prober, InMemorySource::new(), provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert_eq!(outcome, DomainOutcome::Healthy { latency_ms: 200 });
}

#[tokio::test]
async fn slow_domain_publishes_winner_exactly_once() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("www.example.com", 250, 0.0)
            .with("1.2.3.4", 40, 0.0)
            .with("5.6.7.8", 90, 0.0),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = InMemorySource::new().with_entry("ips.txt", "5.6.7.8\n1.2.3.4\n");
    let (engine, _events) = engine(prober, source, provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert_eq!(
        outcome,
        DomainOutcome::Updated {
            address: "1.2.3.4".to_string(),
            attempts: 1,
        }
    );
    assert_eq!(provider.update_calls(), 1);
    assert_eq!(provider.published(), vec!["1.2.3.4".to_string()]);
}

#[tokio::test]
async fn unreachable_current_address_triggers_search() {
    // www.example.com is unknown to the prober, so it probes as 9999ms
    let prober = Arc::new(ScriptedProber::new().with("1.2.3.4", 40, 0.0));
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = InMemorySource::new().with_entry("ips.txt", "1.2.3.4\n");
    let (engine, _events) = engine(prober, source, provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert!(matches!(outcome, DomainOutcome::Updated { .. }));
}

#[tokio::test]
async fn no_winner_means_no_update() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("www.example.com", 400, 0.0)
            .with("1.2.3.4", 40, 0.6),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = InMemorySource::new().with_entry("ips.txt", "1.2.3.4\n9.9.9.9\n");
    let (engine, _events) = engine(prober, source, provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert_eq!(outcome, DomainOutcome::NoCandidate);
    assert_eq!(provider.zone_calls(), 0);
}

#[tokio::test]
async fn fetch_failure_is_fatal_for_domain_only() {
    let prober = Arc::new(ScriptedProber::new().with("www.example.com", 400, 0.0));
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let (engine, _events) = engine(prober, InMemorySource::new().failing_fetch(), provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert!(matches!(outcome, DomainOutcome::SourceFailed { .. }));
    assert_eq!(provider.zone_calls(), 0);
}

#[tokio::test]
async fn unopenable_archive_is_fatal_for_domain_only() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("bad.example.com", 400, 0.0)
            .with("good.example.com", 20, 0.0),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = Arc::new(
        InMemorySource::new()
            .with_entry("a.txt", "1.2.3.4\n")
            .failing_list(),
    );
    let (engine, _events) = EdgepickEngine::new(
        prober,
        Box::new(SharedSource(Arc::clone(&source))),
        provider.clone(),
        fast_settings(),
    )
    .expect("engine construction succeeds");

    let reports = engine
        .run_all(&[
            DomainTarget::new("bad", "example.com"),
            DomainTarget::new("good", "example.com"),
        ])
        .await;

    assert!(matches!(reports[0].outcome, DomainOutcome::SourceFailed { .. }));
    assert_eq!(reports[1].outcome, DomainOutcome::Healthy { latency_ms: 20 });
    assert_eq!(source.fetch_calls(), 1);
    assert!(source.read_entries().is_empty());
    assert_eq!(provider.zone_calls(), 0);
    assert_eq!(provider.record_calls(), 0);
    assert_eq!(provider.update_calls(), 0);
    assert_eq!(provider.create_calls(), 0);
}

#[tokio::test]
async fn entry_read_failure_is_fatal_for_domain() {
    let prober = Arc::new(ScriptedProber::new().with("www.example.com", 400, 0.0));
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = InMemorySource::new()
        .with_entry("a.txt", "1.2.3.4\n")
        .failing_read();
    let (engine, _events) = engine(prober, source, provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert!(matches!(outcome, DomainOutcome::SourceFailed { .. }));
}

#[tokio::test]
async fn filter_selects_matching_entry() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("www.example.com", 400, 0.0)
            .with("10.0.0.1", 10, 0.0)
            .with("10.0.0.2", 50, 0.0),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = InMemorySource::new()
        .with_entry("a.txt", "10.0.0.1\n")
        .with_entry("b.txt", "10.0.0.2\n");
    let (engine, _events) = engine(prober, source, provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com").with_filter("b"))
        .await;

    // a.txt holds the faster address, but b.txt is the preferred entry
    assert_eq!(
        outcome,
        DomainOutcome::Updated {
            address: "10.0.0.2".to_string(),
            attempts: 1,
        }
    );
}

#[tokio::test]
async fn empty_entries_are_skipped() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("www.example.com", 400, 0.0)
            .with("10.0.0.2", 50, 0.0),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = InMemorySource::new()
        .with_entry("empty.txt", "\n \n")
        .with_entry("b.txt", "10.0.0.2\n");
    let (engine, _events) = engine(prober, source, provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert!(matches!(outcome, DomainOutcome::Updated { ref address, .. } if address == "10.0.0.2"));
}

#[tokio::test]
async fn first_non_empty_entry_is_the_only_one_tried_by_default() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("www.example.com", 400, 0.0)
            .with("10.0.0.2", 50, 0.0),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = InMemorySource::new()
        .with_entry("a.txt", "10.0.0.1\n")
        .with_entry("b.txt", "10.0.0.2\n");
    let (engine, _events) = engine(prober, source, provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert_eq!(outcome, DomainOutcome::NoCandidate);
}

#[tokio::test]
async fn search_all_entries_moves_past_entries_without_winner() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("www.example.com", 400, 0.0)
            .with("10.0.0.2", 50, 0.0),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = InMemorySource::new()
        .with_entry("a.txt", "10.0.0.1\n")
        .with_entry("b.txt", "10.0.0.2\n");
    let mut settings = fast_settings();
    settings.search_all_entries = true;
    let (engine, _events) =
        EdgepickEngine::new(prober, Box::new(source), provider.clone(), settings).unwrap();

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    assert!(matches!(outcome, DomainOutcome::Updated { ref address, .. } if address == "10.0.0.2"));
}

#[tokio::test]
async fn failing_domain_does_not_affect_the_next() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("bad.example.com", 400, 0.0)
            .with("good.example.com", 20, 0.0),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let (engine, _events) = engine(prober, InMemorySource::new().failing_fetch(), provider);

    let reports = engine
        .run_all(&[
            DomainTarget::new("bad", "example.com"),
            DomainTarget::new("good", "example.com"),
        ])
        .await;

    assert_eq!(reports.len(), 2);
    assert!(matches!(reports[0].outcome, DomainOutcome::SourceFailed { .. }));
    assert_eq!(reports[1].outcome, DomainOutcome::Healthy { latency_ms: 20 });
    assert!(reports[0].finished_at <= reports[1].finished_at);
}

#[tokio::test]
async fn update_failure_is_reported_not_raised() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("www.example.com", 400, 0.0)
            .with("1.2.3.4", 40, 0.0),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy().with_zone_failures(usize::MAX));
    let source = InMemorySource::new().with_entry("ips.txt", "1.2.3.4\n");
    let (engine, _events) = engine(prober, source, provider.clone());

    let outcome = engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;

    match outcome {
        DomainOutcome::UpdateFailed { address, attempts, .. } => {
            assert_eq!(address, "1.2.3.4");
            assert_eq!(attempts, 5);
        }
        other => panic!("expected update failure, got {:?}", other),
    }
}

#[tokio::test]
async fn events_trace_the_domain_run() {
    let prober = Arc::new(
        ScriptedProber::new()
            .with("www.example.com", 250, 0.0)
            .with("1.2.3.4", 40, 0.0),
    );
    let provider = Arc::new(ScriptedDnsProvider::healthy());
    let source = InMemorySource::new().with_entry("ips.txt", "1.2.3.4\n");
    let (engine, mut events) = engine(prober, source, provider);

    engine
        .run_domain(&DomainTarget::new("www", "example.com"))
        .await;
    drop(engine);

    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }

    assert!(matches!(seen[0], EngineEvent::HealthChecked { latency_ms: 250, .. }));
    assert!(matches!(seen[1], EngineEvent::SearchStarted { .. }));
    assert!(matches!(
        seen[2],
        EngineEvent::PoolProbed { candidates: 1, winner: Some(_), .. }
    ));
    assert!(matches!(seen[3], EngineEvent::PublishFinished { .. }));
    assert!(matches!(seen[4], EngineEvent::DomainFinished { .. }));
    assert_eq!(seen.len(), 5);
}
