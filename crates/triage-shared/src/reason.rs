//! Failure-reason taxonomy.
//!
//! Variants are declared in ascending importance so the derived `Ord`
//! is the importance order: `CompileFail` is the greatest, `Time` the least.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a test failed, as far as its log can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    /// Test hit the runner's time limit
    Time,
    /// Output could not be written (disk full, object too big, ...)
    Filesystem,
    /// Compiler crashed
    InternalError,
    /// Failed, but nothing in the log says why
    Unknown,
    /// Built fine, failed when executed
    RunFail,
    /// Failed at link time
    LinkFail,
    /// Failed to compile
    CompileFail,
}

impl ReasonCode {
    /// Every reason, least important first
    pub const ALL: [ReasonCode; 7] = [
        ReasonCode::Time,
        ReasonCode::Filesystem,
        ReasonCode::InternalError,
        ReasonCode::Unknown,
        ReasonCode::RunFail,
        ReasonCode::LinkFail,
        ReasonCode::CompileFail,
    ];

    /// Numeric importance (0 = time .. 6 = compile-fail)
    pub fn importance(self) -> u8 {
        match self {
            ReasonCode::Time => 0,
            ReasonCode::Filesystem => 1,
            ReasonCode::InternalError => 2,
            ReasonCode::Unknown => 3,
            ReasonCode::RunFail => 4,
            ReasonCode::LinkFail => 5,
            ReasonCode::CompileFail => 6,
        }
    }

    /// Reasons that take part in change tracking and reporting
    pub fn is_important(self) -> bool {
        matches!(
            self,
            ReasonCode::CompileFail | ReasonCode::LinkFail | ReasonCode::RunFail | ReasonCode::Unknown
        )
    }

    /// Persisted / display code
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::Time => "time",
            ReasonCode::Filesystem => "filesystem",
            ReasonCode::InternalError => "internal-error",
            ReasonCode::Unknown => "unknown",
            ReasonCode::RunFail => "run-fail",
            ReasonCode::LinkFail => "link-fail",
            ReasonCode::CompileFail => "compile-fail",
        }
    }

    /// Short label written into the report cell
    pub fn label(self) -> &'static str {
        match self {
            ReasonCode::Time => "time",
            ReasonCode::Filesystem => "file",
            ReasonCode::InternalError => "ierr",
            ReasonCode::Unknown => "unkn",
            ReasonCode::RunFail => "run",
            ReasonCode::LinkFail => "link",
            ReasonCode::CompileFail => "comp",
        }
    }

    /// Cell background colour, if the reason is highlighted at all
    pub fn highlight(self) -> Option<&'static str> {
        match self {
            ReasonCode::Time => Some("#88ff00"),
            ReasonCode::Filesystem => Some("#00ff88"),
            ReasonCode::InternalError => Some("#ff88ff"),
            ReasonCode::CompileFail => Some("#ffbb00"),
            ReasonCode::LinkFail => Some("#ffdd00"),
            ReasonCode::RunFail | ReasonCode::Unknown => None,
        }
    }
}

impl Default for ReasonCode {
    fn default() -> Self {
        ReasonCode::Unknown
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReasonCode::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s || r.label() == s)
            .ok_or_else(|| format!("unknown reason code '{}'", s))
    }
}
