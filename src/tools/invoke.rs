//! Per-tool argument templates and output shaping

use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use super::{Availability, ProcessOutput, ToolKind, ToolRunner};
use crate::errors::{StegError, StegResult};
use crate::models::{ToolDetails, ToolRecord, ToolResult};

/// Lines must be longer than this (after trimming) to count as interesting
const MIN_INTERESTING_LEN: usize = 5;
const MAX_INTERESTING_STRINGS: usize = 100;

/// Deadline of binwalk's second, signature-only pass
const BINWALK_SIGNATURE_TIMEOUT: Duration = Duration::from_secs(30);

const STEGHIDE_OUTPUT: &str = "steghide_output.txt";
const OUTGUESS_OUTPUT: &str = "outguess_output.txt";
const BINWALK_EXTRACT_DIR: &str = "binwalk_extract";
const FOREMOST_OUTPUT_DIR: &str = "foremost_output";
const FOREMOST_AUDIT: &str = "audit.txt";

/// Inputs shared by every tool invocation of one analysis
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub file: &'a Path,
    /// Handed to steghide verbatim, empty included
    pub passphrase: &'a str,
    /// Scratch directory owned by this analysis
    pub workdir: &'a Path,
}

impl ToolRunner {
    /// Run one tool and fold whatever happens into a [`ToolResult`].
    ///
    /// Never fails: unavailable tools, timeouts and launch errors all become
    /// `ToolResult::Failed`.
    pub async fn invoke(
        &self,
        kind: ToolKind,
        availability: &Availability,
        request: &Invocation<'_>,
    ) -> ToolResult {
        if !availability.is_available(kind) {
            return ToolResult::failed(format!("{} not available", kind));
        }

        let started = Instant::now();
        let outcome = match kind {
            ToolKind::Zsteg => self.run_zsteg(request).await,
            ToolKind::Steghide => self.run_steghide(request).await,
            ToolKind::Outguess => self.run_outguess(request).await,
            ToolKind::Exiftool => self.run_exiftool(request).await,
            ToolKind::Binwalk => self.run_binwalk(request).await,
            ToolKind::Foremost => self.run_foremost(request).await,
            ToolKind::Strings => self.run_strings(request).await,
        };

        match outcome {
            Ok((details, process)) => ToolResult::Completed(ToolRecord {
                tool: details.kind(),
                details,
                success: process.success(),
                errors: process.stderr,
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            }),
            Err(e) => {
                log::warn!("{}", e);
                ToolResult::failed(e.to_string())
            }
        }
    }

    async fn run_zsteg(&self, request: &Invocation<'_>) -> StegResult<(ToolDetails, ProcessOutput)> {
        let kind = ToolKind::Zsteg;
        let args = [OsString::from("-a"), request.file.into()];
        let process = self.execute(kind, args, kind.default_timeout()).await?;

        let details = ToolDetails::Zsteg {
            output: process.stdout.clone(),
        };
        Ok((details, process))
    }

    async fn run_steghide(&self, request: &Invocation<'_>) -> StegResult<(ToolDetails, ProcessOutput)> {
        let kind = ToolKind::Steghide;
        let output_file = request.workdir.join(STEGHIDE_OUTPUT);
        let args = [
            OsString::from("extract"),
            OsString::from("-sf"),
            request.file.into(),
            OsString::from("-xf"),
            output_file.clone().into(),
            OsString::from("-p"),
            OsString::from(request.passphrase),
        ];
        let process = self.execute(kind, args, kind.default_timeout()).await?;

        let details = ToolDetails::Steghide {
            output: process.stdout.clone(),
            extracted_content: read_side_channel(&output_file),
        };
        Ok((details, process))
    }

    async fn run_outguess(&self, request: &Invocation<'_>) -> StegResult<(ToolDetails, ProcessOutput)> {
        let kind = ToolKind::Outguess;
        let output_file = request.workdir.join(OUTGUESS_OUTPUT);
        let args = [
            OsString::from("-r"),
            request.file.into(),
            output_file.clone().into(),
        ];
        let process = self.execute(kind, args, kind.default_timeout()).await?;

        let details = ToolDetails::Outguess {
            output: process.stdout.clone(),
            extracted_content: read_side_channel(&output_file),
        };
        Ok((details, process))
    }

    async fn run_exiftool(&self, request: &Invocation<'_>) -> StegResult<(ToolDetails, ProcessOutput)> {
        let kind = ToolKind::Exiftool;
        let args = [OsString::from("-j"), request.file.into()];
        let process = self.execute(kind, args, kind.default_timeout()).await?;

        let details = ToolDetails::Exiftool {
            metadata: parse_exif_metadata(&process.stdout),
            raw_output: process.stdout.clone(),
        };
        Ok((details, process))
    }

    /// Extraction pass first, then a signature-only pass. Success and stderr
    /// come from the extraction pass.
    async fn run_binwalk(&self, request: &Invocation<'_>) -> StegResult<(ToolDetails, ProcessOutput)> {
        let kind = ToolKind::Binwalk;
        let extract_dir = request.workdir.join(BINWALK_EXTRACT_DIR);
        create_dir(&extract_dir)?;

        let args = [
            OsString::from("-e"),
            OsString::from("-C"),
            extract_dir.clone().into(),
            request.file.into(),
        ];
        let extraction = self.execute(kind, args, kind.default_timeout()).await?;
        let signatures = self
            .execute(kind, [request.file], BINWALK_SIGNATURE_TIMEOUT)
            .await?;

        let details = ToolDetails::Binwalk {
            signatures: signatures.stdout,
            extraction_output: extraction.stdout.clone(),
            extract_dir: extract_dir.to_string_lossy().into_owned(),
            extracted_files: list_artifacts(&extract_dir),
        };
        Ok((details, extraction))
    }

    async fn run_foremost(&self, request: &Invocation<'_>) -> StegResult<(ToolDetails, ProcessOutput)> {
        let kind = ToolKind::Foremost;
        let output_dir = request.workdir.join(FOREMOST_OUTPUT_DIR);
        create_dir(&output_dir)?;

        let args = [
            OsString::from("-i"),
            request.file.into(),
            OsString::from("-o"),
            output_dir.clone().into(),
        ];
        let process = self.execute(kind, args, kind.default_timeout()).await?;

        let carved_files = list_artifacts(&output_dir)
            .into_iter()
            .filter(|name| name != FOREMOST_AUDIT)
            .collect();
        let details = ToolDetails::Foremost {
            output: process.stdout.clone(),
            audit: read_side_channel(&output_dir.join(FOREMOST_AUDIT)),
            output_dir: output_dir.to_string_lossy().into_owned(),
            carved_files,
        };
        Ok((details, process))
    }

    async fn run_strings(&self, request: &Invocation<'_>) -> StegResult<(ToolDetails, ProcessOutput)> {
        let kind = ToolKind::Strings;
        let process = self.execute(kind, [request.file], kind.default_timeout()).await?;

        let (interesting, total) = interesting_strings(&process.stdout);
        let details = ToolDetails::Strings {
            all_strings: process.stdout.clone(),
            interesting_strings: interesting,
            total_strings: total,
        };
        Ok((details, process))
    }
}

/// Read a file a tool wrote its product into. Invalid UTF-8 becomes U+FFFD;
/// a file the tool never created reads as empty.
pub fn read_side_channel(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            log::debug!("Could not read {}: {}", path.display(), e);
            String::new()
        }
    }
}

/// First object of exiftool's `-j` array, or an empty map for anything else.
pub fn parse_exif_metadata(stdout: &str) -> Map<String, Value> {
    if !stdout.trim_start().starts_with('[') {
        return Map::new();
    }

    match serde_json::from_str::<Vec<Value>>(stdout) {
        Ok(entries) => match entries.into_iter().next() {
            Some(Value::Object(metadata)) => metadata,
            _ => Map::new(),
        },
        Err(e) => {
            log::debug!("exiftool output is not valid JSON: {}", e);
            Map::new()
        }
    }
}

/// Filter `strings` output down to the lines worth showing.
///
/// Returns at most 100 trimmed lines longer than 5 characters, plus the raw line count.
pub fn interesting_strings(stdout: &str) -> (Vec<String>, usize) {
    let total = stdout.lines().count();
    let interesting = stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_INTERESTING_LEN)
        .take(MAX_INTERESTING_STRINGS)
        .map(str::to_string)
        .collect();
    (interesting, total)
}

fn create_dir(path: &Path) -> StegResult<()> {
    fs::create_dir_all(path).map_err(|e| StegError::io(e, path.to_path_buf()))
}

/// Files a tool produced under `dir`, relative to it and sorted
fn list_artifacts(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(dir)
                .ok()
                .map(|rel| rel.to_string_lossy().into_owned())
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_interesting_strings_cap_and_total() {
        let mut stdout = String::new();
        for i in 0..120 {
            stdout.push_str(&format!("interesting_{:03}\n", i));
        }
        for _ in 0..30 {
            stdout.push_str("abc\n");
        }

        let (interesting, total) = interesting_strings(&stdout);
        assert_eq!(total, 150);
        assert_eq!(interesting.len(), 100);
        assert_eq!(interesting[0], "interesting_000");
        assert_eq!(interesting[99], "interesting_099");
    }

    #[test]
    fn test_interesting_strings_trims_and_requires_six_chars() {
        let (interesting, total) = interesting_strings("  12345  \n\t123456\nflag{x}\n");
        assert_eq!(total, 3);
        assert_eq!(interesting, vec!["123456".to_string(), "flag{x}".to_string()]);
    }

    #[test]
    fn test_interesting_strings_empty_output() {
        let (interesting, total) = interesting_strings("");
        assert!(interesting.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_parse_exif_metadata() {
        let stdout = r#"[{"SourceFile": "a.jpg", "ImageWidth": 640, "Comment": "hi"}]"#;
        let metadata = parse_exif_metadata(stdout);
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata["ImageWidth"], Value::from(640));
    }

    #[test]
    fn test_parse_exif_metadata_keeps_tool_order() {
        let stdout = r#"[{"SourceFile": "a.jpg", "ExifToolVersion": 12.4, "FileName": "a.jpg", "Comment": "hi"}]"#;
        let keys: Vec<_> = parse_exif_metadata(stdout).keys().cloned().collect();
        assert_eq!(keys, ["SourceFile", "ExifToolVersion", "FileName", "Comment"]);
    }

    #[test]
    fn test_parse_exif_metadata_degrades_to_empty() {
        assert!(parse_exif_metadata("Error: File not found - x.jpg").is_empty());
        assert!(parse_exif_metadata("[{\"broken\": ").is_empty());
        assert!(parse_exif_metadata("[]").is_empty());
        assert!(parse_exif_metadata("[42]").is_empty());
        assert!(parse_exif_metadata("{\"SourceFile\": \"a.jpg\"}").is_empty());
        assert!(parse_exif_metadata("").is_empty());
    }

    #[test]
    fn test_read_side_channel_replaces_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("payload.bin");
        fs::write(&path, b"flag\xff\xfe{hidden}").unwrap();

        let content = read_side_channel(&path);
        assert!(content.starts_with("flag"));
        assert!(content.contains('\u{FFFD}'));
        assert!(content.ends_with("{hidden}"));
    }

    #[test]
    fn test_read_side_channel_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_side_channel(&dir.path().join("never_written.txt")), "");
    }

    #[test]
    fn test_list_artifacts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("jpg")).unwrap();
        fs::write(dir.path().join("jpg/00000001.jpg"), b"x").unwrap();
        fs::write(dir.path().join("audit.txt"), b"x").unwrap();

        let files = list_artifacts(dir.path());
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], "audit.txt");
        assert!(files[1].ends_with("00000001.jpg"));
        assert!(list_artifacts(&dir.path().join("missing")).is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_tool_is_skipped() {
        let dir = TempDir::new().unwrap();
        let runner = ToolRunner::new(Default::default());
        let request = Invocation {
            file: dir.path(),
            passphrase: "",
            workdir: dir.path(),
        };

        let result = runner
            .invoke(ToolKind::Zsteg, &Availability::default(), &request)
            .await;
        assert_eq!(result, ToolResult::failed("zsteg not available"));
    }
}
