//! Analysis Aggregator
//!
//! Drives the runner across every available tool for one input file and
//! assembles the per-tool records into a [`Report`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::{StegError, StegResult};
use crate::models::{AnalysisOutcome, Report};
use crate::tools::{Invocation, ToolRunner};

#[derive(Debug, Clone)]
pub struct Analyzer {
    runner: ToolRunner,
    scratch_root: PathBuf,
    runs: Arc<AtomicUsize>,
}

impl Analyzer {
    /// `scratch_root` must outlive the analyzer; every analysis gets its own
    /// numbered subdirectory underneath it.
    pub fn new(runner: ToolRunner, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            scratch_root: scratch_root.into(),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn runner(&self) -> &ToolRunner {
        &self.runner
    }

    /// Analyze one file with every available tool.
    ///
    /// A missing input short-circuits before any tool is probed. Each tool is
    /// attempted exactly once, in registry order; tools that fail the probe are
    /// left out of the report entirely.
    pub async fn analyze(&self, file_path: &Path, passphrase: &str) -> AnalysisOutcome {
        let metadata = match tokio::fs::metadata(file_path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("Cannot analyze {}: {}", file_path.display(), e);
                return AnalysisOutcome::not_found();
            }
        };

        log::info!("Starting analysis of: {}", file_path.display());
        let mut report = Report::new(file_path.to_string_lossy(), metadata.len());

        let availability = self.runner.probe().await;
        log::info!("Available tools: {}", availability);
        if availability.none_available() {
            log::warn!("No analysis tools available; install at least one of the supported tools");
        }

        let workdir = match self.prepare_workdir() {
            Ok(dir) => dir,
            Err(e) => {
                log::error!("{}; falling back to the shared scratch directory", e);
                self.scratch_root.clone()
            }
        };

        let request = Invocation {
            file: file_path,
            passphrase,
            workdir: &workdir,
        };

        for kind in availability.available() {
            log::info!("Running {} analysis...", kind);
            let result = self.runner.invoke(kind, &availability, &request).await;
            report.analysis_results.insert(kind, result);
        }

        log::info!(
            "Analysis of {} finished with {} tool result(s)",
            file_path.display(),
            report.analysis_results.len()
        );
        AnalysisOutcome::Completed(report)
    }

    fn prepare_workdir(&self) -> StegResult<PathBuf> {
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let dir = self.scratch_root.join(format!("analysis-{:04}", run));
        std::fs::create_dir_all(&dir).map_err(|e| StegError::io(e, dir.clone()))?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::RunnerConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file() {
        let scratch = TempDir::new().unwrap();
        let analyzer = Analyzer::new(ToolRunner::new(RunnerConfig::default()), scratch.path());

        let outcome = analyzer
            .analyze(Path::new("/definitely/not/here.png"), "")
            .await;
        assert_eq!(outcome, AnalysisOutcome::not_found());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "error": "File not found" })
        );
    }

    #[test]
    fn test_workdirs_are_distinct() {
        let scratch = TempDir::new().unwrap();
        let analyzer = Analyzer::new(ToolRunner::new(RunnerConfig::default()), scratch.path());
        let worker_copy = analyzer.clone();

        let first = analyzer.prepare_workdir().unwrap();
        let second = worker_copy.prepare_workdir().unwrap();
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
        assert!(first.starts_with(scratch.path()));
    }
}
