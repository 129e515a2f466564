//! Triage Common - fetching, escalation and run orchestration.
//!
//! Builds on `triage-shared` with the parts that touch the network or the
//! file system: the bounded fetch pool, nested-log escalation, the
//! per-library pipeline, report scanning, snapshot storage, rendering and
//! mail delivery.

pub mod config;
pub mod escalation;
pub mod notify;
pub mod pipeline;
pub mod pool;
pub mod report;
pub mod retry;
pub mod run;
pub mod scanner;
pub mod store;
pub mod transport;

pub use config::TriageConfig;
pub use escalation::{Escalation, EscalationEngine, EscalationReport};
pub use pipeline::{PipelineSettings, TriageOutcome, TriagePipeline};
pub use pool::{FetchJob, FetchPool, PoolStats};
pub use retry::RetryPolicy;
pub use run::{LibraryFailure, RunOptions, RunSummary, TriageRunner};
pub use transport::{FakeTransport, HttpTransport, Transport, TransportError};
