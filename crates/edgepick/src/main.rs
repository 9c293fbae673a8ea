// # edgepick
//
// This binary is a THIN integration layer. Selection, probing policy and
// update retries all live in edgepick-core; this file only:
// 1. Parses the command line
// 2. Initializes logging and the runtime
// 3. Loads the configuration file (leniently)
// 4. Wires the ICMP prober, zip archive source and Cloudflare provider
//    into the engine and runs every configured domain once
//
// ## Configuration
//
// - `--file <path>`: JSON configuration file (default `config.json`)
// - `EDGEPICK_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// cat > config.json <<'JSON'
// {
//   "email": "ops@example.com",
//   "key": "global-api-key",
//   "domainInfos": [["www", "example.com"], ["cdn", "example.com", "HKG"]]
// }
// JSON
//
// sudo edgepick --file config.json
// ```

use anyhow::Result;
use clap::Parser;
use edgepick_core::config::{ConfigLoadPolicy, EdgepickConfig};
use edgepick_core::{DomainOutcome, EdgepickEngine, EngineEvent};
use edgepick_probe_icmp::IcmpProber;
use edgepick_provider_cloudflare::CloudflareProvider;
use edgepick_source_zip::HttpZipSource;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Run completed (per-domain failures are logged, not fatal)
/// - 1: The tracing subscriber could not be installed
/// - 2: The tokio runtime or a component (source, provider, engine) could not be built
#[derive(Debug, Clone, Copy)]
enum EdgepickExitCode {
    /// Every domain was handled
    Completed = 0,
    /// The tracing subscriber could not be installed
    SubscriberError = 1,
    /// The runtime or a component could not be built
    RuntimeError = 2,
}

impl From<EdgepickExitCode> for ExitCode {
    fn from(code: EdgepickExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Point DNS records at the lowest-latency edge address
#[derive(Debug, Parser)]
#[command(name = "edgepick", version, about)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.json")]
    file: PathBuf,
}

fn log_level_from_env() -> Level {
    match env::var("EDGEPICK_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level_from_env())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return EdgepickExitCode::SubscriberError.into();
    }

    info!("Starting edgepick");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return EdgepickExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run(cli).await {
            error!("Component setup error: {}", e);
            EdgepickExitCode::RuntimeError
        } else {
            EdgepickExitCode::Completed
        }
    });

    result.into()
}

/// Load the configuration and run every domain once
async fn run(cli: Cli) -> Result<()> {
    let config = EdgepickConfig::load(&cli.file, ConfigLoadPolicy::Lenient)?;

    if config.domain_infos.is_empty() {
        warn!("No domains configured in {}", cli.file.display());
        return Ok(());
    }
    info!("Configuration loaded: {} domain(s)", config.domain_infos.len());

    let prober = IcmpProber::new();
    if !prober.is_available() {
        warn!("No ICMP socket could be opened; every address will probe as unreachable");
    }

    let source = HttpZipSource::new(config.settings.archive_url.clone())?;
    let provider = CloudflareProvider::new_live(config.credentials.clone())?;

    let (engine, mut events) = EdgepickEngine::new(
        Arc::new(prober),
        Box::new(source),
        Arc::new(provider),
        config.settings.clone(),
    )?;

    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let reports = engine.run_all(&config.domain_infos).await;
    // Closing the engine closes the event channel
    drop(engine);
    if let Err(e) = event_logger.await {
        warn!("Event logger task failed: {}", e);
    }

    for report in &reports {
        let fqdn = report.target.fqdn();
        match &report.outcome {
            DomainOutcome::Healthy { latency_ms } => {
                info!("{}: healthy at {}ms", fqdn, latency_ms)
            }
            DomainOutcome::Updated { address, attempts } => {
                info!("{}: updated to {} ({} attempt(s))", fqdn, address, attempts)
            }
            DomainOutcome::NoCandidate => warn!("{}: no candidate passed the loss filter", fqdn),
            DomainOutcome::SourceFailed { error } => error!("{}: {}", fqdn, error),
            DomainOutcome::UpdateFailed {
                address,
                attempts,
                error,
            } => error!(
                "{}: giving up on {} after {} attempt(s): {}",
                fqdn, address, attempts, error
            ),
        }
    }

    info!("Run finished: {} domain(s)", reports.len());
    Ok(())
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::HealthChecked {
            domain,
            latency_ms,
            loss_rate,
        } => debug!("{}: current address {}ms, loss {:.2}", domain, latency_ms, loss_rate),
        EngineEvent::SearchStarted { domain } => debug!("{}: searching for a faster address", domain),
        EngineEvent::PoolProbed {
            domain,
            entry,
            candidates,
            winner,
        } => debug!(
            "{}: probed {} candidate(s) from {}, winner {:?}",
            domain, candidates, entry, winner
        ),
        EngineEvent::PublishFinished {
            domain,
            address,
            outcome,
        } => debug!("{}: publish of {} finished: {:?}", domain, address, outcome),
        EngineEvent::DomainFinished { domain, outcome } => {
            debug!("{}: finished: {:?}", domain, outcome)
        }
    }
}
