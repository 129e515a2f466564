//! Data model shared by the scanner, the pipeline and the diff engine.

use crate::reason::ReasonCode;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// (runner, toolset, test) triple naming one failure within a library.
///
/// Ordering is by test first, then runner, then toolset, which is also
/// the order reports are rendered in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureIdentity {
    pub runner: String,
    pub toolset: String,
    pub test: String,
}

impl FailureIdentity {
    pub fn new(runner: &str, toolset: &str, test: &str) -> Self {
        Self {
            runner: runner.to_string(),
            toolset: toolset.to_string(),
            test: test.to_string(),
        }
    }

    /// Canonical sort key: (test, runner, toolset)
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (&self.test, &self.runner, &self.toolset)
    }
}

impl Ord for FailureIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for FailureIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FailureIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} / {}]", self.test, self.runner, self.toolset)
    }
}

/// A failure reference as found in the report markup, before any fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReference {
    pub test: String,
    pub runner: String,
    pub toolset: String,
    /// Link target exactly as written in the document
    pub raw_href: String,
}

impl FailureReference {
    pub fn identity(&self) -> FailureIdentity {
        FailureIdentity::new(&self.runner, &self.toolset, &self.test)
    }
}

/// One classified failure: identity, reason and the global log URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub identity: FailureIdentity,
    pub reason: ReasonCode,
    pub url: String,
}

impl FailureRecord {
    /// New record, not yet classified
    pub fn new(identity: FailureIdentity, url: &str) -> Self {
        Self {
            identity,
            reason: ReasonCode::Unknown,
            url: url.to_string(),
        }
    }

    pub fn with_reason(mut self, reason: ReasonCode) -> Self {
        self.reason = reason;
        self
    }

    /// Raise the reason to `candidate` if it is more important.
    /// Returns true when the reason changed.
    pub fn escalate(&mut self, candidate: ReasonCode) -> bool {
        if candidate > self.reason {
            self.reason = candidate;
            true
        } else {
            false
        }
    }
}

/// All classified failures of one library at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySnapshot {
    pub name: String,
    failures: BTreeMap<FailureIdentity, FailureRecord>,
}

impl LibrarySnapshot {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failures: BTreeMap::new(),
        }
    }

    /// Build a snapshot from records; the first record of an identity wins
    pub fn from_records(name: &str, records: impl IntoIterator<Item = FailureRecord>) -> Self {
        let mut snapshot = Self::new(name);
        for record in records {
            snapshot.insert_first(record);
        }
        snapshot
    }

    /// Insert unless the identity is already present. False for a duplicate.
    pub fn insert_first(&mut self, record: FailureRecord) -> bool {
        match self.failures.entry(record.identity.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Insert a record, returning the one it replaced (same identity)
    pub fn insert(&mut self, record: FailureRecord) -> Option<FailureRecord> {
        self.failures.insert(record.identity.clone(), record)
    }

    pub fn get(&self, identity: &FailureIdentity) -> Option<&FailureRecord> {
        self.failures.get(identity)
    }

    pub fn get_mut(&mut self, identity: &FailureIdentity) -> Option<&mut FailureRecord> {
        self.failures.get_mut(identity)
    }

    pub fn contains(&self, identity: &FailureIdentity) -> bool {
        self.failures.contains_key(identity)
    }

    /// Records in canonical (test, runner, toolset) order
    pub fn records(&self) -> impl Iterator<Item = &FailureRecord> {
        self.failures.values()
    }

    pub fn into_records(self) -> impl Iterator<Item = FailureRecord> {
        self.failures.into_values()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of records per reason
    pub fn reason_counts(&self) -> BTreeMap<ReasonCode, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records() {
            *counts.entry(record.reason).or_insert(0) += 1;
        }
        counts
    }

    /// The (runner, toolset, test, reason) tuples that persistence must preserve
    pub fn tuples(&self) -> BTreeSet<(String, String, String, ReasonCode)> {
        self.records()
            .map(|r| {
                (
                    r.identity.runner.clone(),
                    r.identity.toolset.clone(),
                    r.identity.test.clone(),
                    r.reason,
                )
            })
            .collect()
    }
}
