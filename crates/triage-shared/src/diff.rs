//! Compare a fresh library snapshot against the previously persisted one.
//!
//! Every identity in the union of both snapshots lands in exactly one of
//! New, Changed, Resolved or Unchanged. Only the first three are reported.

use crate::model::{FailureIdentity, FailureRecord, LibrarySnapshot};
use crate::reason::ReasonCode;
use serde::{Deserialize, Serialize};

/// A reported change for one failure identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffEntry {
    /// Important failure not present last time
    New { current: FailureRecord },
    /// Same identity, different important reason
    Changed {
        current: FailureRecord,
        previous: FailureRecord,
    },
    /// Important failure from last time that is gone now
    Resolved { previous: FailureRecord },
}

impl DiffEntry {
    pub fn identity(&self) -> &FailureIdentity {
        match self {
            DiffEntry::New { current } | DiffEntry::Changed { current, .. } => &current.identity,
            DiffEntry::Resolved { previous } => &previous.identity,
        }
    }

    /// Reason now, if the failure still exists
    pub fn current_reason(&self) -> Option<ReasonCode> {
        match self {
            DiffEntry::New { current } | DiffEntry::Changed { current, .. } => {
                Some(current.reason)
            }
            DiffEntry::Resolved { .. } => None,
        }
    }

    /// Reason last time, if the failure existed
    pub fn previous_reason(&self) -> Option<ReasonCode> {
        match self {
            DiffEntry::New { .. } => None,
            DiffEntry::Changed { previous, .. } | DiffEntry::Resolved { previous } => {
                Some(previous.reason)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DiffEntry::New { .. } => "new",
            DiffEntry::Changed { .. } => "changed",
            DiffEntry::Resolved { .. } => "resolved",
        }
    }
}

/// Diff of a single library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDiff {
    pub library: String,
    pub entries: Vec<DiffEntry>,
    /// Identities seen in either snapshot that were not reported
    pub unchanged: Vec<FailureIdentity>,
    /// True when there was no previous snapshot to compare against
    pub first_run: bool,
}

impl LibraryDiff {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.entries.iter().filter(|e| e.kind() == kind).count()
    }

    /// Rendering key: (library, test, runner, toolset)
    pub fn sort_key<'a>(&'a self, entry: &'a DiffEntry) -> (&'a str, &'a str, &'a str, &'a str) {
        let (test, runner, toolset) = entry.identity().sort_key();
        (&self.library, test, runner, toolset)
    }
}

/// Categorise every identity of `current` and `previous`.
///
/// `previous = None` means there is no usable earlier snapshot; every
/// important current failure is then New.
pub fn diff_library(current: &LibrarySnapshot, previous: Option<&LibrarySnapshot>) -> LibraryDiff {
    let mut diff = LibraryDiff {
        library: current.name.clone(),
        first_run: previous.is_none(),
        ..Default::default()
    };

    for record in current.records() {
        let before = previous.and_then(|p| p.get(&record.identity));
        match before {
            None if record.reason.is_important() => {
                diff.entries.push(DiffEntry::New {
                    current: record.clone(),
                });
            }
            Some(prev) if record.reason.is_important() && record.reason != prev.reason => {
                diff.entries.push(DiffEntry::Changed {
                    current: record.clone(),
                    previous: prev.clone(),
                });
            }
            _ => diff.unchanged.push(record.identity.clone()),
        }
    }

    if let Some(previous) = previous {
        for record in previous.records() {
            if current.contains(&record.identity) {
                continue;
            }
            if record.reason.is_important() {
                diff.entries.push(DiffEntry::Resolved {
                    previous: record.clone(),
                });
            } else {
                diff.unchanged.push(record.identity.clone());
            }
        }
    }

    diff
}

/// All entries of several libraries in (library, test, runner, toolset) order
pub fn sorted_entries(diffs: &[LibraryDiff]) -> Vec<(&str, &DiffEntry)> {
    let mut out: Vec<(&LibraryDiff, &DiffEntry)> = diffs
        .iter()
        .flat_map(|d| d.entries.iter().map(move |e| (d, e)))
        .collect();
    out.sort_by(|(da, a), (db, b)| da.sort_key(a).cmp(&db.sort_key(b)));
    out.into_iter().map(|(d, e)| (d.library.as_str(), e)).collect()
}
