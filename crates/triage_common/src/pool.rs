//! Bounded concurrent fetch pool with retry.
//!
//! At most `concurrency` jobs are in flight. A job retries inside its own
//! slot, so a retry never needs a free slot and never displaces a sibling.
//! Jobs that exhaust their retries (or hit a permanent error) are logged
//! and dropped; they never show up in the completed stream.

use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportError};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use triage_shared::links::short_name;

/// One download, tagged with whatever the caller needs to route its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob<T> {
    pub url: String,
    pub tag: T,
    /// Retries issued so far (0 on the first attempt)
    pub attempt: u32,
}

impl<T> FetchJob<T> {
    pub fn new(url: impl Into<String>, tag: T) -> Self {
        Self {
            url: url.into(),
            tag,
            attempt: 0,
        }
    }

    /// Fetches made so far, counting the first
    pub fn attempts_made(&self) -> u32 {
        self.attempt + 1
    }
}

/// Counters for one pool's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: usize,
    pub completed: usize,
    pub dropped: usize,
    pub retries: usize,
}

type Finished<T> = (FetchJob<T>, Result<String, TransportError>);

/// Bounded-concurrency downloader
pub struct FetchPool<T> {
    transport: Arc<dyn Transport>,
    concurrency: usize,
    policy: RetryPolicy,
    queue: VecDeque<FetchJob<T>>,
    in_flight: JoinSet<Finished<T>>,
    stats: PoolStats,
}

impl<T: Send + 'static> FetchPool<T> {
    /// `concurrency` is clamped to at least one slot
    pub fn new(transport: Arc<dyn Transport>, concurrency: usize, policy: RetryPolicy) -> Self {
        Self {
            transport,
            concurrency: concurrency.max(1),
            policy,
            queue: VecDeque::new(),
            in_flight: JoinSet::new(),
            stats: PoolStats::default(),
        }
    }

    /// Queue jobs; they are admitted as slots free up
    pub fn submit(&mut self, jobs: impl IntoIterator<Item = FetchJob<T>>) {
        for job in jobs {
            self.stats.submitted += 1;
            self.queue.push_back(job);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Nothing queued and nothing running
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty()
    }

    fn admit(&mut self) {
        while self.in_flight.len() < self.concurrency {
            let Some(job) = self.queue.pop_front() else {
                break;
            };
            let transport = Arc::clone(&self.transport);
            let policy = self.policy.clone();
            self.in_flight.spawn(run_job(transport, policy, job));
        }
    }

    /// Next successfully downloaded job, in completion order.
    ///
    /// Returns `None` once the queue is empty and nothing is in flight.
    pub async fn next_completed(&mut self) -> Option<(FetchJob<T>, String)> {
        loop {
            self.admit();
            let joined = self.in_flight.join_next().await?;
            match joined {
                Ok((job, Ok(body))) => {
                    self.stats.completed += 1;
                    self.stats.retries += job.attempt as usize;
                    self.admit();
                    return Some((job, body));
                }
                Ok((job, Err(e))) => {
                    self.stats.dropped += 1;
                    self.stats.retries += job.attempt.min(self.policy.retries) as usize;
                    warn!(
                        "Dropping {} after {} attempt(s): {}",
                        job.url,
                        job.attempt.min(self.policy.retries) + 1,
                        e
                    );
                }
                Err(e) => {
                    self.stats.dropped += 1;
                    error!("Fetch task failed: {}", e);
                }
            }
        }
    }

    /// Run everything to completion and collect the successes
    pub async fn drain(mut self) -> (Vec<(FetchJob<T>, String)>, PoolStats) {
        let mut done = Vec::new();
        while let Some(item) = self.next_completed().await {
            done.push(item);
        }
        (done, self.stats)
    }
}

/// One job's full attempt sequence inside its slot
async fn run_job<T>(
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    mut job: FetchJob<T>,
) -> Finished<T> {
    loop {
        debug!("Fetching {} (attempt {})", short_name(&job.url), job.attempts_made());
        match transport.fetch(&job.url).await {
            Ok(body) => return (job, Ok(body)),
            Err(e) if !e.is_transient() => return (job, Err(e)),
            Err(e) => {
                job.attempt += 1;
                if job.attempt > policy.retries {
                    return (job, Err(e));
                }
                let delay = policy.backoff(job.attempt);
                debug!("Retrying {} in {:?}: {}", short_name(&job.url), delay, e);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
