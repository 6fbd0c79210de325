//! Stub tool scripts for exercising the runner without the real binaries.

use std::fs;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use tempfile::TempDir;

use crate::tools::{RunnerConfig, ToolKind};

/// Spawns hold this shared; stub writes hold it exclusively. A child forked
/// while a stub's write descriptor is open would otherwise keep that
/// descriptor until it execs, and executing the stub fails with ETXTBSY.
static EXEC_LOCK: RwLock<()> = RwLock::new(());

pub(crate) fn exec_guard() -> RwLockReadGuard<'static, ()> {
    EXEC_LOCK.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct StubTools {
    dir: TempDir,
}

impl StubTools {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create stub tool directory"),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Install a script that answers the availability probe and then runs `body`.
    pub(crate) fn install(&self, kind: ToolKind, body: &str) {
        let script = format!(
            "#!/bin/sh\ncase \"$1\" in --version|-h) exit 0;; esac\n{}\n",
            body
        );
        self.install_raw(kind, &script);
    }

    /// Install a script verbatim, probe handling included.
    pub(crate) fn install_raw(&self, kind: ToolKind, script: &str) {
        let path = self.dir.path().join(kind.name());
        let _exclusive = EXEC_LOCK.write().unwrap_or_else(PoisonError::into_inner);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o755)
            .open(&path)
            .expect("create stub tool");
        file.write_all(script.as_bytes()).expect("write stub tool");
    }

    /// Runner configuration resolving every tool inside the stub directory
    pub(crate) fn config(&self) -> RunnerConfig {
        RunnerConfig {
            tool_dir: Some(self.dir.path().to_path_buf()),
            ..RunnerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRunner;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stubs_written_while_others_spawn() {
        let mut jobs = Vec::new();
        for round in 0..16 {
            jobs.push(tokio::spawn(async move {
                let stubs = StubTools::new();
                for kind in ToolKind::ALL {
                    stubs.install(kind, &format!("echo {}-{}", kind, round));
                }
                let runner = ToolRunner::new(stubs.config());
                let availability = runner.probe().await;
                assert_eq!(availability.available().count(), ToolKind::ALL.len());
            }));
        }
        for job in jobs {
            job.await.unwrap();
        }
    }
}
