//! Triage pipeline: failure references -> classified library snapshot.
//!
//! scan output -> FetchPool -> classify -> escalation -> LibrarySnapshot

use crate::config::TriageConfig;
use crate::escalation::{EscalationEngine, EscalationReport};
use crate::pool::{FetchJob, FetchPool, PoolStats};
use crate::retry::RetryPolicy;
use crate::transport::Transport;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use triage_shared::links::{global_url, short_name};
use triage_shared::{
    classify, FailureIdentity, FailureRecord, FailureReference, LibrarySnapshot, ReasonCode,
};

/// Knobs the pipeline needs, lifted out of `TriageConfig`
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub concurrency: usize,
    pub policy: RetryPolicy,
    /// Base for resolving document-local links
    pub base_url: String,
}

impl PipelineSettings {
    pub fn from_config(config: &TriageConfig) -> Self {
        Self {
            concurrency: config.fetch.concurrency,
            policy: RetryPolicy::from_settings(&config.fetch),
            base_url: config.report.branch_url(),
        }
    }
}

/// Result of triaging one library
#[derive(Debug, Clone)]
pub struct TriageOutcome {
    pub snapshot: LibrarySnapshot,
    /// References that repeated an identity already seen
    pub duplicates: usize,
    pub fetch: PoolStats,
    pub escalation: EscalationReport,
    /// Records whose log was never downloaded; their `unknown` is not a verdict
    pub unfetched: BTreeSet<FailureIdentity>,
}

impl TriageOutcome {
    /// Snapshot fit for diffing and persistence.
    ///
    /// An unfetched record takes its reason from `previous`, or is left out
    /// when `previous` has no such identity.
    pub fn settled(&self, previous: Option<&LibrarySnapshot>) -> LibrarySnapshot {
        let mut settled = LibrarySnapshot::new(&self.snapshot.name);
        for record in self.snapshot.records() {
            if !self.unfetched.contains(&record.identity) {
                settled.insert(record.clone());
                continue;
            }
            if let Some(before) = previous.and_then(|p| p.get(&record.identity)) {
                debug!("{}: keeping previous reason {}", record.identity, before.reason);
                settled.insert(record.clone().with_reason(before.reason));
            }
        }
        settled
    }
}

pub struct TriagePipeline {
    transport: Arc<dyn Transport>,
    settings: PipelineSettings,
}

impl TriagePipeline {
    pub fn new(transport: Arc<dyn Transport>, settings: PipelineSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Resolve references into records, one per identity (first one wins)
    pub fn records_from(&self, library: &str, refs: &[FailureReference]) -> (LibrarySnapshot, usize) {
        let mut snapshot = LibrarySnapshot::new(library);
        let mut duplicates = 0;
        for r in refs {
            let url = global_url(&self.settings.base_url, &r.raw_href);
            if !snapshot.insert_first(FailureRecord::new(r.identity(), &url)) {
                warn!("{}: duplicate failure reference for {}", library, r.identity());
                duplicates += 1;
            }
        }
        (snapshot, duplicates)
    }

    /// Download, classify and escalate every failure of one library
    pub async fn triage(&self, library: &str, refs: &[FailureReference]) -> TriageOutcome {
        let (mut snapshot, duplicates) = self.records_from(library, refs);
        info!("{}: {} failure(s) to classify", library, snapshot.len());

        let mut pool: FetchPool<FailureIdentity> = FetchPool::new(
            Arc::clone(&self.transport),
            self.settings.concurrency,
            self.settings.policy.clone(),
        );
        pool.submit(
            snapshot
                .records()
                .map(|r| FetchJob::new(r.url.clone(), r.identity.clone())),
        );

        // Bodies of `unknown` results, kept for escalation
        let mut unknown_logs: HashMap<FailureIdentity, String> = HashMap::new();
        let mut unfetched: BTreeSet<FailureIdentity> =
            snapshot.records().map(|r| r.identity.clone()).collect();

        while let Some((job, body)) = pool.next_completed().await {
            unfetched.remove(&job.tag);
            let reason = classify(&body);
            debug!("{}: {} -> {}", library, short_name(&job.url), reason);
            if let Some(record) = snapshot.get_mut(&job.tag) {
                record.reason = reason;
            }
            if reason == ReasonCode::Unknown {
                unknown_logs.insert(job.tag, body);
            }
        }
        let fetch = pool.stats();

        let engine = EscalationEngine::new(
            Arc::clone(&self.transport),
            self.settings.concurrency,
            self.settings.policy.clone(),
            &self.settings.base_url,
        );
        let escalation = engine.escalate(&mut snapshot, &unknown_logs).await;

        if fetch.dropped > 0 {
            warn!("{}: {} log(s) could not be downloaded", library, fetch.dropped);
        }
        info!(
            "{}: classified {} failure(s), {} escalated",
            library,
            snapshot.len(),
            escalation.upgraded
        );

        TriageOutcome {
            snapshot,
            duplicates,
            fetch,
            escalation,
            unfetched,
        }
    }
}
