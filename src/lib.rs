//! Steganography Analyzer
//!
//! Runs a fixed set of external steganography and forensics tools against a
//! file, bounds each one with a timeout, and gathers whatever they produce
//! into a single report. Missing tools are skipped, failing ones become
//! error entries; nothing below `analyze` aborts the run.

pub mod analyzer;
pub mod cli;
pub mod errors;
pub mod form;
pub mod models;
pub mod reporter;
pub mod session;
pub mod store;
pub mod tools;
pub mod ui;

#[cfg(all(test, unix))]
mod testing;

pub use analyzer::Analyzer;
pub use errors::{StegError, StegResult};
pub use models::{AnalysisOutcome, Report, ToolResult};
pub use session::Session;
pub use tools::{RunnerConfig, ToolKind, ToolRunner};
