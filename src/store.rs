//! Session-wide collection of reports and its JSON persistence

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::errors::{StegError, StegResult};
use crate::models::Report;

/// Reports produced during a session, keyed by file path in append order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportStore {
    reports: Vec<Report>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a report. Re-analysing a path replaces its earlier report but
    /// keeps the original position.
    pub fn insert(&mut self, report: Report) {
        match self
            .reports
            .iter_mut()
            .find(|existing| existing.file_path == report.file_path)
        {
            Some(slot) => *slot = report,
            None => self.reports.push(report),
        }
    }

    pub fn get(&self, file_path: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.file_path == file_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Report> + '_ {
        self.reports.iter()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn to_json(&self) -> StegResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the whole store as one JSON document.
    ///
    /// The document goes to a temporary file next to `path` which is then
    /// renamed over it, so readers never observe a partial file.
    pub fn save(&self, path: &Path) -> StegResult<()> {
        let json = self.to_json()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged =
            NamedTempFile::new_in(dir).map_err(|e| StegError::io(e, dir.to_path_buf()))?;
        staged
            .write_all(json.as_bytes())
            .and_then(|_| staged.flush())
            .map_err(|e| StegError::io(e, staged.path().to_path_buf()))?;
        staged.persist(path).map_err(|e| StegError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        log::info!("Saved {} report(s) to {}", self.reports.len(), path.display());
        Ok(())
    }
}

impl Serialize for ReportStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.reports.len()))?;
        for report in &self.reports {
            map.serialize_entry(&report.file_path, report)?;
        }
        map.end()
    }
}
