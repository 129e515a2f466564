//! Triagectl - regression triage from the command line
//!
//! Exit codes: 0 on success (including per-library failures), 1 on a
//! command-line, configuration or environment error.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use triage_common::notify::SmtpNotifier;
use triage_common::{HttpTransport, Transport, TriageConfig, TriageRunner};
use triagectl::cli::Cli;
use triagectl::logging;

fn load_config(cli: &Cli) -> Result<TriageConfig> {
    let mut config = TriageConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let mail = if cli.mail {
        let settings = config
            .mail
            .clone()
            .ok_or_else(|| anyhow!("--mail needs a [mail] section in the config"))?;
        Some(SmtpNotifier::new(settings))
    } else {
        None
    };

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.fetch)?);
    let options = cli.run_options();

    info!(
        "Triaging {} libraries on {} (concurrency {}, retries {})",
        cli.libraries.len(),
        config.report.branch,
        config.fetch.concurrency,
        config.fetch.retries
    );

    let mut runner = TriageRunner::new(config, transport);
    if let Some(notifier) = mail {
        runner = runner.with_notifier(Box::new(notifier));
    }

    let summary = runner.run(&cli.libraries, &options).await;

    for line in summary.summary_lines() {
        println!("{}", line);
    }
    for failure in &summary.failures {
        println!("{}: failed ({})", failure.library, failure.message);
    }
    if let Some(report) = &summary.change_report {
        println!();
        println!("{}", report);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are printed by clap and are not errors
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
