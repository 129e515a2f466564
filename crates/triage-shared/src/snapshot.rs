//! Persisted snapshot encodings.
//!
//! Both encodings carry a sequence of `Library { name, failures }`. The
//! round-trip contract covers (runner, toolset, test, reason); `url` is
//! carried when known.

use crate::error::{Result, TriageError};
use crate::model::{FailureIdentity, FailureRecord, LibrarySnapshot};
use crate::reason::ReasonCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// On-disk encoding of snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    /// Self-describing JSON with named fields
    Json,
    /// Compact bincode
    Binary,
}

impl Default for SnapshotFormat {
    fn default() -> Self {
        Self::Json
    }
}

impl SnapshotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Binary => "bin",
        }
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotFormat::Json => f.write_str("json"),
            SnapshotFormat::Binary => f.write_str("binary"),
        }
    }
}

impl FromStr for SnapshotFormat {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" | "text" | "structured-text" => Ok(SnapshotFormat::Json),
            "binary" | "bin" => Ok(SnapshotFormat::Binary),
            other => Err(TriageError::InvalidConfig(format!(
                "unknown snapshot format '{}' (expected json or binary)",
                other
            ))),
        }
    }
}

/// Persisted failure row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredFailure {
    runner: String,
    toolset: String,
    test: String,
    reason: ReasonCode,
    #[serde(default)]
    url: Option<String>,
}

/// Persisted library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredLibrary {
    name: String,
    failures: Vec<StoredFailure>,
}

impl From<&LibrarySnapshot> for StoredLibrary {
    fn from(snapshot: &LibrarySnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            failures: snapshot
                .records()
                .map(|r| StoredFailure {
                    runner: r.identity.runner.clone(),
                    toolset: r.identity.toolset.clone(),
                    test: r.identity.test.clone(),
                    reason: r.reason,
                    url: (!r.url.is_empty()).then(|| r.url.clone()),
                })
                .collect(),
        }
    }
}

impl From<StoredLibrary> for LibrarySnapshot {
    fn from(stored: StoredLibrary) -> Self {
        let records = stored.failures.into_iter().map(|f| FailureRecord {
            identity: FailureIdentity {
                runner: f.runner,
                toolset: f.toolset,
                test: f.test,
            },
            reason: f.reason,
            url: f.url.unwrap_or_default(),
        });
        LibrarySnapshot::from_records(&stored.name, records)
    }
}

/// Encode a sequence of libraries
pub fn encode_libraries(libraries: &[LibrarySnapshot], format: SnapshotFormat) -> Result<Vec<u8>> {
    let stored: Vec<StoredLibrary> = libraries.iter().map(StoredLibrary::from).collect();
    let bytes = match format {
        SnapshotFormat::Json => serde_json::to_vec_pretty(&stored)?,
        SnapshotFormat::Binary => bincode::serialize(&stored)?,
    };
    Ok(bytes)
}

/// Decode a sequence of libraries
pub fn decode_libraries(bytes: &[u8], format: SnapshotFormat) -> Result<Vec<LibrarySnapshot>> {
    if bytes.is_empty() {
        return Err(TriageError::SnapshotDecode("empty snapshot".to_string()));
    }
    let stored: Vec<StoredLibrary> = match format {
        SnapshotFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| TriageError::SnapshotDecode(e.to_string()))?,
        SnapshotFormat::Binary => bincode::deserialize(bytes)
            .map_err(|e| TriageError::SnapshotDecode(e.to_string()))?,
    };
    Ok(stored.into_iter().map(LibrarySnapshot::from).collect())
}
