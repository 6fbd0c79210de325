use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Indeterminate spinner shown while a background analysis is in flight.
pub struct ActivityIndicator {
    bar: ProgressBar,
    start_time: Instant,
}

impl ActivityIndicator {
    pub fn start(message: impl Into<String>, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };

        let spinner_style = ProgressStyle::with_template("{prefix} {spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["▰▱▱▱▱▱▱", "▰▰▱▱▱▱▱", "▰▰▰▱▱▱▱", "▰▰▰▰▱▱▱", "▰▰▰▰▰▱▱", "▰▰▰▰▰▰▱", "▰▰▰▰▰▰▰", "▱▰▰▰▰▰▰"]);

        bar.set_style(spinner_style);
        bar.set_prefix(style("ANALYZING").cyan().bold().to_string());
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            bar,
            start_time: Instant::now(),
        }
    }

    /// Stop the spinner and leave a one-line summary in its place
    pub fn finish(self, message: impl AsRef<str>, succeeded: bool) {
        let summary = format!(
            "{} ({:.1}s)",
            message.as_ref(),
            self.start_time.elapsed().as_secs_f64()
        );
        let styled = if succeeded {
            style(summary).green().bold().to_string()
        } else {
            style(summary).red().bold().to_string()
        };
        self.bar.finish_with_message(styled);
    }
}

impl Drop for ActivityIndicator {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
