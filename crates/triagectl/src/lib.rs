//! Triagectl library - exposes the CLI surface for integration tests

pub mod cli;
pub mod logging;
