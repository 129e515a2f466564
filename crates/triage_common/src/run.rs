//! Whole-run orchestration across libraries.
//!
//! Per library: download the summary page, scan it, triage the failures,
//! write the rendered page and (with change tracking) diff against the
//! stored snapshot. Failures whose log never arrived keep their stored
//! reason for the diff. A failing library is reported and skipped; the
//! others carry on.
//!
//! Snapshots are persisted last. When a notifier is configured and there
//! is something to report, persistence waits for successful delivery.

use crate::config::TriageConfig;
use crate::notify::Notifier;
use crate::pipeline::{PipelineSettings, TriageOutcome, TriagePipeline};
use crate::pool::{FetchJob, FetchPool};
use crate::report::{
    format_library_summary, has_changes, render_diff_text, render_library_page, STYLESHEET,
};
use crate::retry::RetryPolicy;
use crate::scanner::{DocumentScanner, HtmlReportScanner};
use crate::store::{FileSnapshotStore, SnapshotStore};
use crate::transport::Transport;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use triage_shared::{diff_library, LibraryDiff, LibrarySnapshot};

/// Per-run switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Load the previous snapshots, diff, and persist the new ones
    pub track_changes: bool,
    /// Write `<output_dir>/<library>.html`
    pub write_pages: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            track_changes: false,
            write_pages: true,
        }
    }
}

/// A library that could not be processed, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFailure {
    pub library: String,
    pub message: String,
}

/// Everything a run produced
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<TriageOutcome>,
    pub failures: Vec<LibraryFailure>,
    pub diffs: Vec<LibraryDiff>,
    /// Snapshots that were diffed and are due for persistence
    pub settled: Vec<LibrarySnapshot>,
    /// Rendered change report when change tracking was on
    pub change_report: Option<String>,
    pub notified: bool,
    /// Libraries whose snapshot was saved
    pub persisted: Vec<String>,
}

impl RunSummary {
    fn fail(&mut self, library: &str, message: String) {
        error!("{}: {}", library, message);
        self.failures.push(LibraryFailure {
            library: library.to_string(),
            message,
        });
    }

    /// One line per processed library
    pub fn summary_lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(|o| format_library_summary(&o.snapshot))
            .collect()
    }
}

pub struct TriageRunner {
    config: TriageConfig,
    transport: Arc<dyn Transport>,
    scanner: Box<dyn DocumentScanner>,
    store: Box<dyn SnapshotStore>,
    notifier: Option<Box<dyn Notifier>>,
}

impl TriageRunner {
    /// Runner with the HTML scanner and a file store from `config`
    pub fn new(config: TriageConfig, transport: Arc<dyn Transport>) -> Self {
        let store = FileSnapshotStore::new(config.store.dir.clone(), config.store.format);
        Self {
            config,
            transport,
            scanner: Box::new(HtmlReportScanner),
            store: Box::new(store),
            notifier: None,
        }
    }

    pub fn with_scanner(mut self, scanner: Box<dyn DocumentScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_store(mut self, store: Box<dyn SnapshotStore>) -> Self {
        self.store = store;
        self
    }

    /// Deliver change reports; also gates persistence on delivery
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Download every library's summary page through one bounded pool
    async fn fetch_pages(&self, libraries: &[String]) -> HashMap<String, String> {
        let mut pool: FetchPool<String> = FetchPool::new(
            Arc::clone(&self.transport),
            self.config.fetch.concurrency,
            RetryPolicy::from_settings(&self.config.fetch),
        );
        pool.submit(
            libraries
                .iter()
                .map(|lib| FetchJob::new(self.config.report.library_url(lib), lib.clone())),
        );

        let mut pages = HashMap::new();
        while let Some((job, body)) = pool.next_completed().await {
            pages.insert(job.tag, body);
        }
        pages
    }

    /// Copy the shared stylesheet into the output directory; pages still
    /// render without it
    async fn write_stylesheet(&self) {
        let url = self.config.report.stylesheet_url();
        let mut pool: FetchPool<()> = FetchPool::new(
            Arc::clone(&self.transport),
            1,
            RetryPolicy::from_settings(&self.config.fetch),
        );
        pool.submit([FetchJob::new(url.clone(), ())]);

        let Some((_, css)) = pool.next_completed().await else {
            warn!("Stylesheet {} unavailable", url);
            return;
        };
        if let Err(e) = write_output(&self.config.output_dir, STYLESHEET, &css) {
            warn!("{:#}", e);
        }
    }

    pub async fn run(&self, libraries: &[String], options: &RunOptions) -> RunSummary {
        let mut summary = RunSummary::default();

        let mut unique: Vec<String> = Vec::new();
        for lib in libraries {
            if !unique.contains(lib) {
                unique.push(lib.clone());
            }
        }

        let mut pages = self.fetch_pages(&unique).await;
        if options.write_pages && !pages.is_empty() {
            self.write_stylesheet().await;
        }
        let pipeline = TriagePipeline::new(
            Arc::clone(&self.transport),
            PipelineSettings::from_config(&self.config),
        );
        let generated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();

        for library in &unique {
            info!("Processing: {}", library);

            let Some(page) = pages.remove(library) else {
                summary.fail(library, "could not download summary page".to_string());
                continue;
            };

            let scanned = match self.scanner.scan(&page) {
                Ok(s) => s,
                Err(e) => {
                    summary.fail(library, e.to_string());
                    continue;
                }
            };

            let outcome = pipeline.triage(library, &scanned.failures).await;

            if options.write_pages {
                let html = render_library_page(&outcome.snapshot, &generated_at);
                let file_name = format!("{}.html", library);
                if let Err(e) = write_output(&self.config.output_dir, &file_name, &html) {
                    summary.fail(library, format!("{:#}", e));
                }
            }

            if options.track_changes {
                let previous = self.store.load(library);
                let settled = outcome.settled(previous.as_ref());
                summary.diffs.push(diff_library(&settled, previous.as_ref()));
                summary.settled.push(settled);
            }

            summary.outcomes.push(outcome);
        }

        if options.track_changes {
            self.report_and_persist(&mut summary).await;
        }

        summary
    }

    async fn report_and_persist(&self, summary: &mut RunSummary) {
        let report = render_diff_text(&summary.diffs);

        if let Some(notifier) = &self.notifier {
            if has_changes(&summary.diffs) {
                let subject = self
                    .config
                    .mail
                    .as_ref()
                    .map(|m| m.subject.clone())
                    .unwrap_or_else(|| "Regression changes".to_string());
                match notifier.notify(&subject, &report).await {
                    Ok(()) => summary.notified = true,
                    Err(e) => {
                        error!("Notification failed, snapshots not saved: {:#}", e);
                        summary.change_report = Some(report);
                        return;
                    }
                }
            }
        }
        summary.change_report = Some(report);

        let mut save_failures = Vec::new();
        for snapshot in &summary.settled {
            let name = &snapshot.name;
            match self.store.save(snapshot) {
                Ok(()) => summary.persisted.push(name.clone()),
                Err(e) => save_failures.push((name.clone(), format!("{:#}", e))),
            }
        }
        for (library, message) in save_failures {
            warn!("{}: snapshot not saved", library);
            summary.fail(&library, message);
        }
    }
}

fn write_output(dir: &Path, file_name: &str, contents: &str) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(file_name);
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
