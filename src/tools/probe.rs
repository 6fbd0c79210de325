//! Tool availability detection

use std::fmt;

use super::{process, ToolKind, ToolRunner};

/// Arguments tried in turn; the first clean exit marks the tool available.
const PROBE_FLAGS: [&str; 2] = ["--version", "-h"];

/// Availability snapshot taken at the start of an analysis, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    entries: Vec<(ToolKind, bool)>,
}

impl Availability {
    pub fn is_available(&self, kind: ToolKind) -> bool {
        self.entries
            .iter()
            .any(|&(tool, available)| tool == kind && available)
    }

    /// Available tools, in registry order
    pub fn available(&self) -> impl Iterator<Item = ToolKind> + '_ {
        self.entries
            .iter()
            .filter(|(_, available)| *available)
            .map(|(tool, _)| *tool)
    }

    /// Every probed tool with its status
    pub fn iter(&self) -> impl Iterator<Item = (ToolKind, bool)> + '_ {
        self.entries.iter().copied()
    }

    pub fn none_available(&self) -> bool {
        self.available().next().is_none()
    }
}

impl FromIterator<(ToolKind, bool)> for Availability {
    fn from_iter<T: IntoIterator<Item = (ToolKind, bool)>>(iter: T) -> Self {
        let mut entries: Vec<(ToolKind, bool)> = Vec::new();
        for (tool, available) in iter {
            match entries.iter_mut().find(|(existing, _)| *existing == tool) {
                Some(entry) => entry.1 = available,
                None => entries.push((tool, available)),
            }
        }
        entries.sort_by_key(|(tool, _)| ToolKind::ALL.iter().position(|k| k == tool));
        Self { entries }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (tool, available)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", tool, available)?;
        }
        f.write_str("}")
    }
}

impl ToolRunner {
    /// Check whether one tool can be executed.
    ///
    /// A non-zero exit, a missing executable or an expired probe timeout on
    /// `--version` falls through to a single `-h` attempt.
    pub async fn is_available(&self, kind: ToolKind) -> bool {
        let program = self.program(kind);
        for flag in PROBE_FLAGS {
            match process::run_bounded(kind, &program, [flag], self.config().probe_timeout).await {
                Ok(output) if output.success() => {
                    log::debug!("{} responded to {}", kind, flag);
                    return true;
                }
                Ok(output) => {
                    log::debug!("{} {} exited with {:?}", kind, flag, output.exit_code);
                }
                Err(e) => {
                    log::debug!("{} probe with {} failed: {}", kind, flag, e);
                }
            }
        }
        false
    }

    /// Probe every selected tool. Nothing is cached between calls, so a tool
    /// installed mid-session is picked up by the next analysis.
    pub async fn probe(&self) -> Availability {
        let mut entries = Vec::with_capacity(ToolKind::ALL.len());
        for kind in ToolKind::ALL {
            if self.config().is_selected(kind) {
                entries.push((kind, self.is_available(kind).await));
            }
        }
        entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_queries() {
        let availability: Availability = [
            (ToolKind::Strings, true),
            (ToolKind::Zsteg, false),
            (ToolKind::Exiftool, true),
        ]
        .into_iter()
        .collect();

        assert!(availability.is_available(ToolKind::Exiftool));
        assert!(!availability.is_available(ToolKind::Zsteg));
        assert!(!availability.is_available(ToolKind::Binwalk));
        assert_eq!(
            availability.available().collect::<Vec<_>>(),
            vec![ToolKind::Exiftool, ToolKind::Strings]
        );
        assert_eq!(
            availability.to_string(),
            "{zsteg: false, exiftool: true, strings: true}"
        );
    }

    #[test]
    fn test_none_available() {
        let availability: Availability = ToolKind::ALL.iter().map(|&k| (k, false)).collect();
        assert!(availability.none_available());
        assert!(Availability::default().none_available());
    }
}

#[cfg(all(test, unix))]
mod probe_tests {
    use super::*;
    use crate::testing::StubTools;

    #[tokio::test]
    async fn test_version_flag_marks_available() {
        let stubs = StubTools::new();
        stubs.install(ToolKind::Strings, "exit 0");

        let runner = ToolRunner::new(stubs.config());
        assert!(runner.is_available(ToolKind::Strings).await);
        assert!(!runner.is_available(ToolKind::Zsteg).await);
    }

    #[tokio::test]
    async fn test_falls_back_to_help_flag() {
        let stubs = StubTools::new();
        stubs.install_raw(
            ToolKind::Outguess,
            "#!/bin/sh\n[ \"$1\" = \"-h\" ] && exit 0\nexit 1\n",
        );
        stubs.install_raw(ToolKind::Foremost, "#!/bin/sh\nexit 1\n");

        let runner = ToolRunner::new(stubs.config());
        assert!(runner.is_available(ToolKind::Outguess).await);
        assert!(!runner.is_available(ToolKind::Foremost).await);
    }

    #[tokio::test]
    async fn test_probe_respects_selection() {
        let stubs = StubTools::new();
        stubs.install(ToolKind::Strings, "exit 0");
        stubs.install(ToolKind::Exiftool, "exit 0");

        let mut config = stubs.config();
        config.tools = vec![ToolKind::Strings];
        let availability = ToolRunner::new(config).probe().await;

        assert_eq!(
            availability.iter().collect::<Vec<_>>(),
            vec![(ToolKind::Strings, true)]
        );
    }
}
