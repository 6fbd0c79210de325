//! Interactive terminal form (`--gui`).
//!
//! Pick a file, optionally a passphrase, run the analysis, check tools,
//! save or clear results. The analysis itself runs on a worker task and
//! hands back exactly one [`WorkerMessage`] over a channel; the form only
//! waits on that channel.
//!
//! Every wait (terminal input or a running analysis) races Ctrl-C. An
//! interrupt cancels the worker and surfaces as [`StegError::Interrupted`]
//! after the session's scratch directory has been removed.

use console::{style, Term};
use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::analyzer::Analyzer;
use crate::errors::{StegError, StegResult};
use crate::models::AnalysisOutcome;
use crate::reporter::{self, Palette};
use crate::session::Session;
use crate::tools::RunnerConfig;
use crate::ui::ActivityIndicator;

/// The single message a worker sends back
#[derive(Debug)]
pub enum WorkerMessage {
    Completed(AnalysisOutcome),
    Failed(String),
}

/// Handle on a background analysis
pub struct AnalysisWorker {
    messages: mpsc::Receiver<WorkerMessage>,
    job: AbortHandle,
}

impl AnalysisWorker {
    /// Wait for the worker's message.
    pub async fn next_message(&mut self) -> StegResult<WorkerMessage> {
        self.messages
            .recv()
            .await
            .ok_or_else(|| StegError::UiChannel("analysis worker exited without a result".to_string()))
    }

    /// Abort the analysis and wait until its running tool has been dropped (and killed).
    pub async fn cancel(mut self) {
        self.job.abort();
        if let Some(WorkerMessage::Completed(_)) = self.messages.recv().await {
            log::debug!("Analysis finished before it could be cancelled");
        }
    }
}

/// Run `analyze` on a worker task. The worker yields one message.
pub fn spawn_analysis(analyzer: Analyzer, file: PathBuf, passphrase: String) -> AnalysisWorker {
    let (tx, rx) = mpsc::channel(1);
    let job = tokio::spawn(async move { analyzer.analyze(&file, &passphrase).await });
    let abort = job.abort_handle();
    tokio::spawn(async move {
        let message = match job.await {
            Ok(outcome) => WorkerMessage::Completed(outcome),
            Err(e) => WorkerMessage::Failed(StegError::from(e).to_string()),
        };
        if tx.send(message).await.is_err() {
            log::debug!("Form closed before the analysis finished");
        }
    });
    AnalysisWorker {
        messages: rx,
        job: abort,
    }
}

/// Drive `work` to completion unless `interrupt` resolves first.
async fn until_interrupted<T>(
    work: impl Future<Output = StegResult<T>>,
    interrupt: impl Future,
) -> StegResult<T> {
    tokio::select! {
        result = work => result,
        _ = interrupt => Err(StegError::Interrupted),
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Launch the form, or explain why it cannot run here.
pub async fn launch(config: RunnerConfig) -> StegResult<()> {
    if !console::user_attended() || !std::io::stdin().is_terminal() {
        println!(
            "{}",
            style("GUI not available: no interactive terminal attached").red()
        );
        println!(
            "{}",
            style("Run `stegsweep <FILE>` to use the command-line analyzer instead.").yellow()
        );
        return Ok(());
    }

    let session = Session::new(config)?;
    let mut form = Form::new(session, Term::stdout());
    let result = form.run().await;
    form.close();
    result
}

enum Command {
    SelectFile,
    SetPassphrase,
    Analyze,
    CheckTools,
    Save,
    Clear,
    Quit,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "f" | "file" => Some(Command::SelectFile),
            "2" | "p" | "password" => Some(Command::SetPassphrase),
            "3" | "a" | "analyze" => Some(Command::Analyze),
            "4" | "t" | "tools" => Some(Command::CheckTools),
            "5" | "s" | "save" => Some(Command::Save),
            "6" | "c" | "clear" => Some(Command::Clear),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

struct Form {
    session: Session,
    term: Term,
    file: Option<PathBuf>,
    passphrase: String,
    current: Option<AnalysisOutcome>,
    /// Output of the last tool check, shown until the next command
    notice: Option<String>,
    status: String,
}

impl Form {
    fn new(session: Session, term: Term) -> Self {
        Self {
            session,
            term,
            file: None,
            passphrase: String::new(),
            current: None,
            notice: None,
            status: "Ready".to_string(),
        }
    }

    async fn run(&mut self) -> StegResult<()> {
        loop {
            self.draw()?;
            let input = self.read_input(false).await?;
            let Some(command) = Command::parse(&input) else {
                if !input.trim().is_empty() {
                    self.status = format!("Unknown choice: {}", input.trim());
                }
                continue;
            };
            self.notice = None;

            match command {
                Command::SelectFile => self.select_file().await?,
                Command::SetPassphrase => self.set_passphrase().await?,
                Command::Analyze => self.start_analysis().await?,
                Command::CheckTools => self.check_tools().await,
                Command::Save => self.save_results().await?,
                Command::Clear => {
                    self.current = None;
                    self.status = "Results cleared".to_string();
                }
                Command::Quit => return Ok(()),
            }
        }
    }

    fn draw(&self) -> StegResult<()> {
        self.term.clear_screen()?;

        let file = self
            .file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none selected)".to_string());
        let passphrase = if self.passphrase.is_empty() {
            "(empty)".to_string()
        } else {
            "*".repeat(self.passphrase.chars().count())
        };

        println!("{}", style("Steganography Analyzer").cyan().bold());
        println!("{}", style("═".repeat(60)).cyan());
        println!("  {} {}", style("File to analyze:").yellow(), file);
        println!("  {} {}", style("Password:").yellow(), passphrase);
        println!();

        if let Some(notice) = &self.notice {
            print!("{}", notice);
            println!();
        }
        if let Some(outcome) = &self.current {
            print!("{}", reporter::render_outcome(outcome, Palette::Plain));
            println!();
        }

        println!("{}", style("─".repeat(60)).dim());
        println!(
            "  [1] Select file   [2] Password   [3] Analyze   [4] Check tools   [5] Save   [6] Clear   [q] Quit"
        );
        println!("  {} {}", style("Status:").dim(), self.status);
        print!("> ");
        self.term.flush()?;
        Ok(())
    }

    /// Read one line on a blocking thread so Ctrl-C can still be observed.
    async fn read_input(&self, secure: bool) -> StegResult<String> {
        let term = self.term.clone();
        let read = async move {
            let line = tokio::task::spawn_blocking(move || {
                if secure {
                    term.read_secure_line()
                } else {
                    term.read_line()
                }
            })
            .await??;
            Ok::<_, StegError>(line)
        };
        until_interrupted(read, ctrl_c()).await
    }

    async fn prompt(&self, label: &str) -> StegResult<String> {
        self.term.write_str(label)?;
        Ok(self.read_input(false).await?.trim().to_string())
    }

    async fn select_file(&mut self) -> StegResult<()> {
        let input = self.prompt("File to analyze: ").await?;
        let cleaned = input.trim_matches(|c| c == '"' || c == '\'');
        if cleaned.is_empty() {
            self.status = "No file selected".to_string();
            return Ok(());
        }

        let path = PathBuf::from(cleaned);
        if path.is_file() {
            self.status = format!("Selected: {}", display_name(&path));
            self.file = Some(path);
        } else {
            self.status = "Selected file does not exist".to_string();
        }
        Ok(())
    }

    async fn set_passphrase(&mut self) -> StegResult<()> {
        self.term.write_str("Password (optional): ")?;
        self.passphrase = self.read_input(true).await?;
        self.status = "Password updated".to_string();
        Ok(())
    }

    async fn start_analysis(&mut self) -> StegResult<()> {
        let Some(file) = self.file.clone() else {
            self.status = "Please select a file to analyze".to_string();
            return Ok(());
        };
        if !file.exists() {
            self.status = "Selected file does not exist".to_string();
            return Ok(());
        }

        let indicator = ActivityIndicator::start(format!("Analyzing {}...", display_name(&file)), false);
        let mut worker = spawn_analysis(
            self.session.analyzer().clone(),
            file,
            self.passphrase.clone(),
        );
        let message = until_interrupted(worker.next_message(), ctrl_c()).await;

        match message {
            Err(StegError::Interrupted) => {
                indicator.finish("Analysis interrupted", false);
                worker.cancel().await;
                return Err(StegError::Interrupted);
            }
            Ok(WorkerMessage::Completed(outcome)) => {
                indicator.finish("Analysis complete", true);
                self.session.record(&outcome);
                self.current = Some(outcome);
                self.status = "Analysis complete".to_string();
            }
            Ok(WorkerMessage::Failed(error)) => {
                indicator.finish("Analysis failed", false);
                log::error!("Analysis failed: {}", error);
                self.status = format!("Analysis failed: {}", error);
            }
            Err(e) => {
                indicator.finish("Analysis failed", false);
                log::error!("{}", e);
                self.status = format!("Analysis failed: {}", e);
            }
        }
        Ok(())
    }

    async fn check_tools(&mut self) {
        self.status = "Checking tool availability...".to_string();
        let availability = self.session.analyzer().runner().probe().await;
        self.notice = Some(reporter::render_availability(&availability, Palette::Colored));
        self.status = "Tool check complete".to_string();
    }

    async fn save_results(&mut self) -> StegResult<()> {
        let Some(outcome) = &self.current else {
            self.status = "No results to save".to_string();
            return Ok(());
        };

        let input = self
            .prompt("Save to (.json saves every report of this session, other extensions the text view): ")
            .await?;
        if input.is_empty() {
            self.status = "Save cancelled".to_string();
            return Ok(());
        }
        let path = PathBuf::from(input);

        let saved = if is_json_path(&path) {
            self.session.save(&path)
        } else {
            std::fs::write(&path, reporter::render_outcome(outcome, Palette::Plain))
                .map_err(|e| StegError::io(e, path.clone()))
        };

        self.status = match saved {
            Ok(()) => format!("Results saved to {}", display_name(&path)),
            Err(e) => format!("Failed to save results: {}", e),
        };
        Ok(())
    }

    /// Removes the scratch directory once the form is closed.
    fn close(self) {
        self.session.cleanup();
    }
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_parsing() {
        assert!(matches!(Command::parse("3"), Some(Command::Analyze)));
        assert!(matches!(Command::parse(" A \n"), Some(Command::Analyze)));
        assert!(matches!(Command::parse("q"), Some(Command::Quit)));
        assert!(matches!(Command::parse("tools"), Some(Command::CheckTools)));
        assert!(Command::parse("9").is_none());
        assert!(Command::parse("").is_none());
    }

    #[test]
    fn test_save_format_selection() {
        assert!(is_json_path(Path::new("out/results.json")));
        assert!(is_json_path(Path::new("RESULTS.JSON")));
        assert!(!is_json_path(Path::new("results.txt")));
        assert!(!is_json_path(Path::new("results")));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/tmp/dir/cover.png")), "cover.png");
    }

    #[tokio::test]
    async fn test_worker_delivers_single_message() {
        let scratch = TempDir::new().unwrap();
        let analyzer = Analyzer::new(
            crate::tools::ToolRunner::new(RunnerConfig::default()),
            scratch.path(),
        );

        let mut worker = spawn_analysis(analyzer, PathBuf::from("/no/such/input.bmp"), String::new());
        match worker.next_message().await {
            Ok(WorkerMessage::Completed(outcome)) => {
                assert_eq!(outcome, AnalysisOutcome::not_found());
            }
            other => panic!("unexpected worker message: {:?}", other),
        }
        assert!(matches!(
            worker.next_message().await,
            Err(StegError::UiChannel(_))
        ));
    }

    #[tokio::test]
    async fn test_interrupt_wins_over_pending_wait() {
        let result = until_interrupted(std::future::pending::<StegResult<String>>(), async {}).await;
        assert!(matches!(result, Err(StegError::Interrupted)));
    }

    #[tokio::test]
    async fn test_finished_work_is_not_interrupted() {
        let result = until_interrupted(async { Ok(7) }, std::future::pending::<()>()).await;
        assert_eq!(result.unwrap(), 7);
    }
}

#[cfg(all(test, unix))]
mod stub_tests {
    use super::*;
    use crate::testing::StubTools;
    use crate::tools::ToolKind;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_interrupted_analysis_leaves_no_scratch_behind() {
        let stubs = StubTools::new();
        let started = stubs.path().join("started");
        stubs.install(
            ToolKind::Zsteg,
            &format!("touch '{}'\nexec sleep 30", started.display()),
        );
        let input = stubs.path().join("cover.png");
        std::fs::write(&input, b"png").unwrap();

        let session = Session::new(stubs.config()).unwrap();
        let scratch = session.scratch_dir().to_path_buf();
        let worker = spawn_analysis(session.analyzer().clone(), input, String::new());

        let deadline = Instant::now() + Duration::from_secs(10);
        while !started.exists() {
            assert!(Instant::now() < deadline, "stub tool never started");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let cancelled_at = Instant::now();
        worker.cancel().await;
        assert!(cancelled_at.elapsed() < Duration::from_secs(5));

        session.cleanup();
        assert!(!scratch.exists());
    }
}
