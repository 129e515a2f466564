//! Shared types and pure logic for regression triage.
//!
//! Everything here is free of network I/O: the reason taxonomy and
//! classifier, the failure data model, snapshot diffing and the
//! persisted snapshot encodings.

pub mod classify;
pub mod diff;
pub mod error;
pub mod links;
pub mod model;
pub mod reason;
pub mod snapshot;

pub use classify::classify;
pub use diff::{diff_library, sorted_entries, DiffEntry, LibraryDiff};
pub use error::{Result, TriageError};
pub use model::{FailureIdentity, FailureRecord, FailureReference, LibrarySnapshot};
pub use reason::ReasonCode;
pub use snapshot::{decode_libraries, encode_libraries, SnapshotFormat};
