//! Triage configuration.
//!
//! Config file: `--config PATH`, `$TRIAGE_CONFIG`, or
//! `~/.config/regression-triage/config.toml`. Missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use triage_shared::{SnapshotFormat, TriageError};

pub const CONCURRENCY_RANGE: (usize, usize) = (1, 100);
pub const RETRIES_RANGE: (u32, u32) = (1, 10);

/// Where the regression report lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSource {
    #[serde(default = "default_tests_url")]
    pub tests_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_view")]
    pub view: String,
}

fn default_tests_url() -> String {
    "http://www.boost.org/development/tests/".to_string()
}

fn default_branch() -> String {
    "develop".to_string()
}

fn default_view() -> String {
    "developer".to_string()
}

impl Default for ReportSource {
    fn default() -> Self {
        Self {
            tests_url: default_tests_url(),
            branch: default_branch(),
            view: default_view(),
        }
    }
}

impl ReportSource {
    /// Base for resolving document-local links
    pub fn branch_url(&self) -> String {
        format!("{}/{}/", self.tests_url.trim_end_matches('/'), self.branch)
    }

    pub fn view_url(&self) -> String {
        format!("{}{}/", self.branch_url(), self.view)
    }

    /// Stylesheet the report pages share
    pub fn stylesheet_url(&self) -> String {
        format!("{}{}", self.branch_url(), crate::report::STYLESHEET)
    }

    /// Summary page of one library; sub-libraries use a dash (`geometry-index`)
    pub fn library_url(&self, library: &str) -> String {
        format!("{}{}_.html", self.view_url(), library)
    }
}

/// Download behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Maximum simultaneous requests (1..=100)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Retries after the first attempt (1..=10)
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base delay before a retry; grows exponentially
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_concurrency() -> usize {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_user_agent() -> String {
    format!("regression-triage/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retries: default_retries(),
            timeout_secs: default_timeout_secs(),
            retry_delay_ms: default_retry_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Snapshot persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub format: SnapshotFormat,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            format: SnapshotFormat::default(),
        }
    }
}

/// SMTP delivery of change reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default = "default_from")]
    pub from: String,
    pub recipients: Vec<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_smtp_port() -> u16 {
    25
}

fn default_from() -> String {
    "regression-triage@localhost".to_string()
}

fn default_subject() -> String {
    "Regression changes".to_string()
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub report: ReportSource,

    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub store: StoreSettings,

    /// Rendered per-library pages go here
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub mail: Option<MailSettings>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("result")
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            report: ReportSource::default(),
            fetch: FetchSettings::default(),
            store: StoreSettings::default(),
            output_dir: default_output_dir(),
            mail: None,
        }
    }
}

impl TriageConfig {
    /// Default user config path: ~/.config/regression-triage/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        let home = std::env::var("HOME").ok()?;
        Some(
            Path::new(&home)
                .join(".config")
                .join("regression-triage")
                .join("config.toml"),
        )
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise `$TRIAGE_CONFIG`, then the
    /// user config path, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(env_path) = std::env::var("TRIAGE_CONFIG") {
            return Self::load_from(Path::new(&env_path));
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: TriageConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Reject values outside their documented ranges
    pub fn validate(&self) -> std::result::Result<(), TriageError> {
        let (cmin, cmax) = CONCURRENCY_RANGE;
        if self.fetch.concurrency < cmin || self.fetch.concurrency > cmax {
            return Err(TriageError::InvalidConfig(format!(
                "concurrency must be within {}..={}, got {}",
                cmin, cmax, self.fetch.concurrency
            )));
        }

        let (rmin, rmax) = RETRIES_RANGE;
        if self.fetch.retries < rmin || self.fetch.retries > rmax {
            return Err(TriageError::InvalidConfig(format!(
                "retries must be within {}..={}, got {}",
                rmin, rmax, self.fetch.retries
            )));
        }

        if self.fetch.timeout_secs == 0 {
            return Err(TriageError::InvalidConfig(
                "timeout_secs must be positive".to_string(),
            ));
        }

        if self.report.branch.trim().is_empty() {
            return Err(TriageError::InvalidConfig("branch must not be empty".to_string()));
        }

        if let Some(mail) = &self.mail {
            if mail.host.trim().is_empty() || mail.recipients.is_empty() {
                return Err(TriageError::InvalidConfig(
                    "mail needs a host and at least one recipient".to_string(),
                ));
            }
        }

        Ok(())
    }
}
