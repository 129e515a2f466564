//! Escalation of `unknown` classifications through nested log references.
//!
//! Only records classified `unknown` are eligible. Their log bodies are
//! scanned for links; every linked log is fetched and classified, and the
//! most important nested reason replaces the parent's if it ranks higher.
//! Exactly one level deep: nested logs are never themselves escalated.

use crate::pool::{FetchJob, FetchPool, PoolStats};
use crate::retry::RetryPolicy;
use crate::transport::Transport;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use triage_shared::links::{extract_references, global_url};
use triage_shared::{classify, FailureIdentity, FailureRecord, LibrarySnapshot, ReasonCode};

/// Per-parent bookkeeping while nested results arrive
#[derive(Debug, Default)]
pub struct Escalation {
    base_url: String,
    /// Parent -> best nested reason seen so far (None until one arrives)
    parents: HashMap<FailureIdentity, Option<ReasonCode>>,
}

impl Escalation {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            parents: HashMap::new(),
        }
    }

    /// Nested fetch jobs for `record`, given its log body.
    ///
    /// Empty unless the record is `unknown` and the body links elsewhere.
    pub fn plan(&mut self, record: &FailureRecord, body: &str) -> Vec<FetchJob<FailureIdentity>> {
        if record.reason != ReasonCode::Unknown {
            return Vec::new();
        }

        let jobs: Vec<FetchJob<FailureIdentity>> = extract_references(body)
            .into_iter()
            .map(|href| global_url(&self.base_url, &href))
            .filter(|url| *url != record.url)
            .map(|url| FetchJob::new(url, record.identity.clone()))
            .collect();

        if !jobs.is_empty() {
            self.parents.entry(record.identity.clone()).or_insert(None);
        }
        jobs
    }

    /// Classify a nested body and fold it into its parent's best reason
    pub fn observe(&mut self, parent: &FailureIdentity, body: &str) -> ReasonCode {
        let reason = classify(body);
        let best = self.parents.entry(parent.clone()).or_insert(None);
        *best = Some(best.map_or(reason, |b| b.max(reason)));
        reason
    }

    /// Parents with at least one nested job planned
    pub fn pending_parents(&self) -> usize {
        self.parents.len()
    }

    /// Upgrade parents in `snapshot`. Returns the number of records changed.
    pub fn apply(self, snapshot: &mut LibrarySnapshot) -> usize {
        let mut upgraded = 0;
        for (identity, best) in self.parents {
            let (Some(best), Some(record)) = (best, snapshot.get_mut(&identity)) else {
                continue;
            };
            if record.reason != ReasonCode::Unknown {
                continue;
            }
            if record.escalate(best) {
                debug!("Escalated {} to {}", identity, best);
                upgraded += 1;
            }
        }
        upgraded
    }
}

/// Outcome counters of one escalation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscalationReport {
    pub candidates: usize,
    pub nested_jobs: usize,
    pub upgraded: usize,
    pub pool: PoolStats,
}

/// Escalation pass over a finished first-level classification
pub struct EscalationEngine {
    transport: Arc<dyn Transport>,
    concurrency: usize,
    policy: RetryPolicy,
    base_url: String,
}

impl EscalationEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        concurrency: usize,
        policy: RetryPolicy,
        base_url: &str,
    ) -> Self {
        Self {
            transport,
            concurrency,
            policy,
            base_url: base_url.to_string(),
        }
    }

    /// Escalate `unknown` records of `snapshot` using their log bodies
    pub async fn escalate(
        &self,
        snapshot: &mut LibrarySnapshot,
        logs: &HashMap<FailureIdentity, String>,
    ) -> EscalationReport {
        let mut escalation = Escalation::new(&self.base_url);
        let mut pool: FetchPool<FailureIdentity> =
            FetchPool::new(Arc::clone(&self.transport), self.concurrency, self.policy.clone());
        let mut report = EscalationReport::default();

        for record in snapshot.records() {
            let Some(body) = logs.get(&record.identity) else {
                continue;
            };
            let jobs = escalation.plan(record, body);
            if record.reason == ReasonCode::Unknown {
                report.candidates += 1;
            }
            report.nested_jobs += jobs.len();
            pool.submit(jobs);
        }

        if report.nested_jobs == 0 {
            return report;
        }

        info!(
            "Following {} nested log(s) for {} unknown failure(s)",
            report.nested_jobs,
            escalation.pending_parents()
        );

        while let Some((job, body)) = pool.next_completed().await {
            escalation.observe(&job.tag, &body);
        }

        report.pool = pool.stats();
        report.upgraded = escalation.apply(snapshot);
        report
    }
}
