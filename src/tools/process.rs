//! Bounded execution of external tools

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

use super::ToolKind;
use crate::errors::{StegError, StegResult};

/// Captured result of one finished process
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    /// Standard output, decoded lossily
    pub stdout: String,
    /// Standard error, decoded lossily
    pub stderr: String,
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `program` with `args`, giving up after `limit`.
///
/// The child is spawned with `kill_on_drop`, so an expired deadline (or a
/// caller dropping the future on Ctrl-C) terminates it instead of leaving it
/// running behind the analysis.
pub(crate) async fn run_bounded<I, S>(
    tool: ToolKind,
    program: &Path,
    args: I,
    limit: Duration,
) -> StegResult<ProcessOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start_time = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Arguments are not logged: steghide receives the passphrase on its command line.
    log::debug!("Executing {} (limit {:?})", program.display(), limit);

    let child = {
        #[cfg(all(test, unix))]
        let _exec = crate::testing::exec_guard();
        cmd.spawn()
    };
    let child = match child {
        Ok(child) => child,
        Err(e) => {
            log::debug!("{} could not be executed: {}", tool, e);
            return Err(StegError::launch(tool, e));
        }
    };

    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let elapsed = start_time.elapsed();
            log::debug!(
                "{} exited with {:?} after {:.2}s",
                tool,
                output.status.code(),
                elapsed.as_secs_f64()
            );
            Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            })
        }
        Ok(Err(e)) => {
            log::debug!("{} could not be waited on: {}", tool, e);
            Err(StegError::launch(tool, e))
        }
        Err(_) => {
            log::warn!("{} timed out after {:?}", tool, limit);
            Err(StegError::ToolTimeout { tool, limit })
        }
    }
}
