//! Tool Registry & Runner
//!
//! The fixed set of external analysis tools, how to find them, and how long
//! each one may run. Split into submodules:
//! - `process`: bounded subprocess execution
//! - `probe`: availability detection
//! - `invoke`: per-tool argument templates and output shaping

mod invoke;
mod probe;
mod process;

pub use invoke::{interesting_strings, parse_exif_metadata, read_side_channel, Invocation};
pub use probe::Availability;
pub use process::ProcessOutput;

use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::StegResult;

/// Timeout for each availability probe attempt
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The external tools, in the order they are probed and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// LSB/signature scanner for PNG and BMP images
    Zsteg,
    /// Passphrase-based extractor
    Steghide,
    /// Coverless-channel extractor
    Outguess,
    /// Metadata reader
    Exiftool,
    /// Signature scanner with embedded file extraction
    Binwalk,
    /// File carver
    Foremost,
    /// Printable string extractor
    Strings,
}

impl ToolKind {
    /// Registry order
    pub const ALL: [ToolKind; 7] = [
        ToolKind::Zsteg,
        ToolKind::Steghide,
        ToolKind::Outguess,
        ToolKind::Exiftool,
        ToolKind::Binwalk,
        ToolKind::Foremost,
        ToolKind::Strings,
    ];

    /// Identifier used as the executable name and as the report key
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Zsteg => "zsteg",
            ToolKind::Steghide => "steghide",
            ToolKind::Outguess => "outguess",
            ToolKind::Exiftool => "exiftool",
            ToolKind::Binwalk => "binwalk",
            ToolKind::Foremost => "foremost",
            ToolKind::Strings => "strings",
        }
    }

    /// Deadline for the tool's main invocation
    pub fn default_timeout(self) -> Duration {
        match self {
            ToolKind::Zsteg | ToolKind::Binwalk | ToolKind::Foremost => Duration::from_secs(60),
            ToolKind::Steghide | ToolKind::Outguess | ToolKind::Exiftool | ToolKind::Strings => {
                Duration::from_secs(30)
            }
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the runner locates and bounds the tools.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Tools to probe and run; registry order is applied regardless of order here
    pub tools: Vec<ToolKind>,
    /// Resolve executables as `<dir>/<tool>` instead of searching `PATH`
    pub tool_dir: Option<PathBuf>,
    /// Replaces every per-tool timeout when set
    pub timeout_override: Option<Duration>,
    pub probe_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tools: ToolKind::ALL.to_vec(),
            tool_dir: None,
            timeout_override: None,
            probe_timeout: PROBE_TIMEOUT,
        }
    }
}

impl RunnerConfig {
    /// Whether a tool is part of the selection
    pub fn is_selected(&self, kind: ToolKind) -> bool {
        self.tools.contains(&kind)
    }
}

/// Launches the external tools. Cheap to clone; the form worker gets its own copy.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    config: Arc<RunnerConfig>,
}

impl ToolRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Executable path for a tool
    pub fn program(&self, kind: ToolKind) -> PathBuf {
        match &self.config.tool_dir {
            Some(dir) => dir.join(kind.name()),
            None => PathBuf::from(kind.name()),
        }
    }

    /// Effective deadline for an invocation whose contractual limit is `limit`
    pub fn effective_timeout(&self, limit: Duration) -> Duration {
        self.config.timeout_override.unwrap_or(limit)
    }

    pub(crate) async fn execute<I, S>(
        &self,
        kind: ToolKind,
        args: I,
        limit: Duration,
    ) -> StegResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        process::run_bounded(kind, &self.program(kind), args, self.effective_timeout(limit)).await
    }
}
