use chrono::{DateTime, Local};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::tools::ToolKind;

/// Error text of an analysis whose input file is missing
pub const FILE_NOT_FOUND: &str = "File not found";

/// Outcome of invoking one tool against one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    /// Missing tool, timeout or launch failure; nothing else is known
    Failed { error: String },
    /// The process ran to completion, whatever its exit code
    Completed(ToolRecord),
}

impl ToolResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Completed(_) => None,
        }
    }

    pub fn record(&self) -> Option<&ToolRecord> {
        match self {
            Self::Failed { .. } => None,
            Self::Completed(record) => Some(record),
        }
    }

    pub fn is_success(&self) -> bool {
        self.record().is_some_and(|r| r.success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolRecord {
    pub tool: ToolKind,
    #[serde(flatten)]
    pub details: ToolDetails,
    /// Raw standard error
    pub errors: String,
    /// Exit code was zero
    pub success: bool,
    pub duration_ms: u64,
}

/// Tool-specific payload. Field names match the persisted report format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolDetails {
    Zsteg {
        output: String,
    },
    Steghide {
        output: String,
        extracted_content: String,
    },
    Outguess {
        output: String,
        extracted_content: String,
    },
    Exiftool {
        metadata: Map<String, Value>,
        raw_output: String,
    },
    Binwalk {
        signatures: String,
        extraction_output: String,
        extract_dir: String,
        extracted_files: Vec<String>,
    },
    Foremost {
        output: String,
        audit: String,
        output_dir: String,
        carved_files: Vec<String>,
    },
    Strings {
        all_strings: String,
        interesting_strings: Vec<String>,
        total_strings: usize,
    },
}

impl ToolDetails {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolDetails::Zsteg { .. } => ToolKind::Zsteg,
            ToolDetails::Steghide { .. } => ToolKind::Steghide,
            ToolDetails::Outguess { .. } => ToolKind::Outguess,
            ToolDetails::Exiftool { .. } => ToolKind::Exiftool,
            ToolDetails::Binwalk { .. } => ToolKind::Binwalk,
            ToolDetails::Foremost { .. } => ToolKind::Foremost,
            ToolDetails::Strings { .. } => ToolKind::Strings,
        }
    }
}

/// Per-tool results of one analysis, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResults {
    entries: Vec<(ToolKind, ToolResult)>,
}

impl ToolResults {
    /// Insert a result; a second result for the same tool replaces the first in place.
    pub fn insert(&mut self, kind: ToolKind, result: ToolResult) {
        match self.entries.iter_mut().find(|(tool, _)| *tool == kind) {
            Some(entry) => entry.1 = result,
            None => self.entries.push((kind, result)),
        }
    }

    pub fn get(&self, kind: ToolKind) -> Option<&ToolResult> {
        self.entries
            .iter()
            .find(|(tool, _)| *tool == kind)
            .map(|(_, result)| result)
    }

    pub fn keys(&self) -> impl Iterator<Item = ToolKind> + '_ {
        self.entries.iter().map(|(tool, _)| *tool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ToolKind, &ToolResult)> + '_ {
        self.entries.iter().map(|(tool, result)| (*tool, result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ToolResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (tool, result) in &self.entries {
            map.serialize_entry(tool.name(), result)?;
        }
        map.end()
    }
}

/// Full analysis outcome for one input file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Path as given by the caller
    pub file_path: String,
    pub file_size: u64,
    pub analyzed_at: DateTime<Local>,
    pub analysis_results: ToolResults,
}

impl Report {
    pub fn new(file_path: impl Into<String>, file_size: u64) -> Self {
        Self {
            file_path: file_path.into(),
            file_size,
            analyzed_at: Local::now(),
            analysis_results: ToolResults::default(),
        }
    }
}

/// What `analyze` hands back: a report, or the missing-input marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    NotFound { error: String },
    Completed(Report),
}

impl AnalysisOutcome {
    pub fn not_found() -> Self {
        Self::NotFound {
            error: FILE_NOT_FOUND.to_string(),
        }
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::NotFound { .. } => None,
            Self::Completed(report) => Some(report),
        }
    }

    #[cfg(test)]
    pub(crate) fn into_report(self) -> Option<Report> {
        match self {
            Self::NotFound { .. } => None,
            Self::Completed(report) => Some(report),
        }
    }
}
