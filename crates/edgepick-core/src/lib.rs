// # edgepick-core
//
// Core library for latency-driven DNS endpoint selection.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping a DNS "A" record
// pointed at the fastest reachable endpoint:
// - **Prober**: Trait for measuring latency and loss to one address
// - **CandidateSource**: Trait for fetching and reading the candidate archive
// - **DnsProvider**: Trait for the single-shot calls of the update protocol
// - **Selector**: Concurrent pool probing and winner selection
// - **Updater**: Retrying zone → record → update state machine
// - **EdgepickEngine**: Per-domain orchestration of the above
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from transports and providers
// 2. **Explicit Dependencies**: Collaborators are passed in, never global
// 3. **Failure Isolation**: A failing domain never stops the others
// 4. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod candidates;
pub mod selector;
pub mod updater;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{Prober, ProbeResult, PingStatistics, CandidateSource, DnsProvider};
pub use candidates::{CandidatePool, ordered_entries, parse_pool};
pub use selector::{Selector, pick_winner};
pub use updater::{Updater, PublishAction, PublishOutcome};
pub use engine::{EdgepickEngine, EngineEvent, DomainOutcome, DomainReport};
pub use config::{
    ConfigLoadPolicy, DomainTarget, EdgepickConfig, MissingRecordPolicy, ProviderCredentials,
    Settings, UpdateSettings,
};
pub use error::{Error, Result};
