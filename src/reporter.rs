//! Text rendering of analysis results.
//!
//! One walk over the report serves both the colored console output and the
//! plain text shown by the form (and written by its text saves).

use console::style;
use serde_json::Value;
use std::fmt::Display;

use crate::models::{AnalysisOutcome, Report, ToolDetails, ToolResult};
use crate::tools::{Availability, ToolKind};

/// Characters of extracted payload shown before truncation
pub const EXTRACT_PREVIEW_CHARS: usize = 500;
/// Interesting strings listed per report
pub const STRINGS_PREVIEW: usize = 10;

const BANNER_RULE: &str = "============================================================";
const TOOL_RULE: &str = "----------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    /// ANSI styling via `console` (dropped automatically when stdout is not a terminal)
    Colored,
    Plain,
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Banner,
    Label,
    Tool,
    Error,
    Notice,
    Accent,
}

impl Palette {
    fn paint(self, text: impl Display, tone: Tone) -> String {
        match self {
            Palette::Plain => text.to_string(),
            Palette::Colored => match tone {
                Tone::Banner => style(text).cyan().bold().to_string(),
                Tone::Label => style(text).yellow().to_string(),
                Tone::Tool => style(text).green().bold().to_string(),
                Tone::Error => style(text).red().to_string(),
                Tone::Notice => style(text).yellow().to_string(),
                Tone::Accent => style(text).cyan().to_string(),
            },
        }
    }
}

fn line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(text.as_ref());
    out.push('\n');
}

/// Render whatever `analyze` returned.
pub fn render_outcome(outcome: &AnalysisOutcome, palette: Palette) -> String {
    match outcome {
        AnalysisOutcome::Completed(report) => render_report(report, palette),
        AnalysisOutcome::NotFound { error } => {
            let mut out = String::new();
            line(&mut out, palette.paint(format!("Error: {}", error), Tone::Error));
            out
        }
    }
}

pub fn render_report(report: &Report, palette: Palette) -> String {
    let mut out = String::new();

    line(&mut out, "");
    line(&mut out, palette.paint(BANNER_RULE, Tone::Banner));
    line(&mut out, palette.paint("STEGANOGRAPHY ANALYSIS RESULTS", Tone::Banner));
    line(&mut out, palette.paint(BANNER_RULE, Tone::Banner));
    line(&mut out, "");
    line(
        &mut out,
        format!("{} {}", palette.paint("File:", Tone::Label), report.file_path),
    );
    line(
        &mut out,
        format!("{} {} bytes", palette.paint("Size:", Tone::Label), report.file_size),
    );

    if report.analysis_results.is_empty() {
        line(&mut out, "");
        line(
            &mut out,
            palette.paint(
                "No analysis tools were available; nothing was run. Use --check-tools to see what is missing.",
                Tone::Notice,
            ),
        );
        return out;
    }

    for (kind, result) in report.analysis_results.iter() {
        render_tool(&mut out, kind, result, palette);
    }
    out
}

fn render_tool(out: &mut String, kind: ToolKind, result: &ToolResult, palette: Palette) {
    line(out, "");
    line(
        out,
        palette.paint(format!("[{}]", kind.name().to_uppercase()), Tone::Tool),
    );
    line(out, TOOL_RULE);

    let record = match result {
        ToolResult::Failed { error } => {
            line(out, palette.paint(format!("Error: {}", error), Tone::Error));
            return;
        }
        ToolResult::Completed(record) => record,
    };

    if !record.success {
        line(out, palette.paint("No results found", Tone::Notice));
        return;
    }

    match &record.details {
        ToolDetails::Zsteg { output } => {
            if output.is_empty() {
                line(out, "No output");
            } else {
                line(out, output.trim_end());
            }
        }
        ToolDetails::Steghide {
            extracted_content, ..
        }
        | ToolDetails::Outguess {
            extracted_content, ..
        } => {
            if extracted_content.is_empty() {
                line(out, "No hidden content extracted");
            } else {
                line(out, palette.paint("Extracted content:", Tone::Accent));
                line(out, preview(extracted_content, EXTRACT_PREVIEW_CHARS));
            }
        }
        ToolDetails::Exiftool { metadata, .. } => {
            if metadata.is_empty() {
                line(out, "No metadata found");
            }
            for (key, value) in metadata {
                line(out, format!("{}: {}", key, display_value(value)));
            }
        }
        ToolDetails::Binwalk { signatures, .. } => {
            if signatures.is_empty() {
                line(out, "No signatures found");
            } else {
                line(out, signatures.trim_end());
            }
        }
        ToolDetails::Foremost { audit, .. } => {
            if audit.is_empty() {
                line(out, "No carved files found");
            } else {
                line(out, audit.trim_end());
            }
        }
        ToolDetails::Strings {
            interesting_strings,
            total_strings,
            ..
        } => {
            if interesting_strings.is_empty() {
                line(out, "No interesting strings found");
            } else {
                line(
                    out,
                    format!(
                        "Found {} strings, showing first {} interesting ones:",
                        total_strings, STRINGS_PREVIEW
                    ),
                );
                for (i, s) in interesting_strings.iter().take(STRINGS_PREVIEW).enumerate() {
                    line(out, format!("  {}: {}", i + 1, s));
                }
            }
        }
    }
}

/// Availability table for `--check-tools` and the form's tool check
pub fn render_availability(availability: &Availability, palette: Palette) -> String {
    let mut out = String::new();
    line(&mut out, palette.paint("Tool Availability Status:", Tone::Banner));
    line(&mut out, "");
    for (kind, available) in availability.iter() {
        let status = if available {
            palette.paint("✓ Available", Tone::Tool)
        } else {
            palette.paint("✗ Not found", Tone::Error)
        };
        line(&mut out, format!("{:<9} {}", format!("{}:", kind), status));
    }
    out
}

/// First `limit` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
