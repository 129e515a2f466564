//! CLI - Command-line argument parsing
//!
//! Flags override values from the config file; ranges are enforced by clap
//! before the config is ever touched.

use clap::Parser;
use std::path::PathBuf;
use triage_common::{RunOptions, TriageConfig};
use triage_shared::SnapshotFormat;

/// Classify new regression test failures and track how they change
#[derive(Parser, Debug)]
#[command(name = "triagectl")]
#[command(about = "Regression triage - classify unexpected test failures", long_about = None)]
#[command(version = env!("TRIAGE_VERSION"))]
pub struct Cli {
    /// Libraries to process (sub-libraries as `geometry-index`)
    #[arg(value_name = "LIBRARY", required = true)]
    pub libraries: Vec<String>,

    /// Maximum simultaneous downloads (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..=100))]
    pub concurrency: Option<u16>,

    /// Retries per download after the first attempt (1-10)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub retries: Option<u32>,

    /// Report branch (develop, master)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Diff against the previous run and store this one
    #[arg(short, long)]
    pub track_changes: bool,

    /// Snapshot encoding: json (structured-text) or binary
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<SnapshotFormat>,

    /// Mail the change report; needs --track-changes and a [mail] section
    #[arg(long, requires = "track_changes")]
    pub mail: bool,

    /// Config file (overrides $TRIAGE_CONFIG and the user config)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for rendered library pages
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Directory for stored snapshots
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Fold command-line overrides into `config`
    pub fn apply_to(&self, config: &mut TriageConfig) {
        if let Some(c) = self.concurrency {
            config.fetch.concurrency = usize::from(c);
        }
        if let Some(r) = self.retries {
            config.fetch.retries = r;
        }
        if let Some(branch) = &self.branch {
            config.report.branch = branch.clone();
        }
        if let Some(format) = self.log_format {
            config.store.format = format;
        }
        if let Some(dir) = &self.output {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.store {
            config.store.dir = dir.clone();
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            track_changes: self.track_changes,
            ..RunOptions::default()
        }
    }
}
