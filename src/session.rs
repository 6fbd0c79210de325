//! Session controller: owns the scratch directory, the analyzer and the
//! report store for the lifetime of one CLI run or form window.

use std::path::Path;
use tempfile::TempDir;

use crate::analyzer::Analyzer;
use crate::errors::{StegError, StegResult};
use crate::models::AnalysisOutcome;
use crate::store::ReportStore;
use crate::tools::{RunnerConfig, ToolRunner};

pub struct Session {
    scratch: TempDir,
    analyzer: Analyzer,
    store: ReportStore,
}

impl Session {
    /// Create the session-wide scratch directory and the analyzer that writes into it.
    pub fn new(config: RunnerConfig) -> StegResult<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("stego_")
            .tempdir()
            .map_err(|e| StegError::io(e, std::env::temp_dir()))?;
        log::debug!("Scratch directory: {}", scratch.path().display());

        let analyzer = Analyzer::new(ToolRunner::new(config), scratch.path());
        Ok(Self {
            scratch,
            analyzer,
            store: ReportStore::new(),
        })
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Analyze a file and keep the report in the session store.
    pub async fn analyze(&mut self, file_path: &Path, passphrase: &str) -> AnalysisOutcome {
        let outcome = self.analyzer.analyze(file_path, passphrase).await;
        self.record(&outcome);
        outcome
    }

    /// Keep the report of an analysis run elsewhere (the form worker).
    /// Missing-file outcomes are not stored.
    pub fn record(&mut self, outcome: &AnalysisOutcome) {
        if let Some(report) = outcome.report() {
            self.store.insert(report.clone());
        }
    }

    pub fn save(&self, path: &Path) -> StegResult<()> {
        self.store.save(path)
    }

    /// Remove the scratch directory and everything the tools left in it.
    pub fn cleanup(self) {
        let Session { scratch, .. } = self;
        let path = scratch.path().to_path_buf();
        match scratch.close() {
            Ok(()) => log::debug!("Removed scratch directory {}", path.display()),
            Err(e) => log::warn!("Failed to remove scratch directory {}: {}", path.display(), e),
        }
    }
}
