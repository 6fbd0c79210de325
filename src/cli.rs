use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::tools::{RunnerConfig, ToolKind, PROBE_TIMEOUT};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "stegsweep",
    about = "Steganography analyzer - runs zsteg, steghide, outguess, exiftool, binwalk, foremost and strings against one file",
    version
)]
pub struct Args {
    /// File to analyze
    #[arg(required_unless_present_any = ["gui", "check_tools"])]
    pub file: Option<PathBuf>,

    /// Password for steghide (an empty password is still passed explicitly)
    #[arg(short, long, default_value = "")]
    pub password: String,

    /// Save every report of this run to a JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Launch the interactive form instead of analyzing a file
    #[arg(long)]
    pub gui: bool,

    /// Report which tools are installed and exit
    #[arg(long)]
    pub check_tools: bool,

    /// Tools to run (comma separated, default: all)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub tools: Vec<ToolKind>,

    /// Look for the tool executables in this directory instead of PATH
    #[arg(long)]
    pub tool_dir: Option<PathBuf>,

    /// Override every tool's timeout, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Timeout for each availability probe, in seconds
    #[arg(long, default_value_t = PROBE_TIMEOUT.as_secs())]
    pub probe_timeout: u64,

    /// Enable verbose logging of all operations
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl From<&Args> for RunnerConfig {
    fn from(args: &Args) -> Self {
        let tools = if args.tools.is_empty() {
            ToolKind::ALL.to_vec()
        } else {
            args.tools.clone()
        };

        RunnerConfig {
            tools,
            tool_dir: args.tool_dir.clone(),
            timeout_override: args.timeout.map(Duration::from_secs),
            probe_timeout: Duration::from_secs(args.probe_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let args = Args::try_parse_from(["stegsweep", "cover.png"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("cover.png")));
        assert_eq!(args.password, "");
        assert!(args.output.is_none());

        let config = RunnerConfig::from(&args);
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.probe_timeout, PROBE_TIMEOUT);
    }

    #[test]
    fn test_file_required_without_gui() {
        assert!(Args::try_parse_from(["stegsweep"]).is_err());
        assert!(Args::try_parse_from(["stegsweep", "--gui"]).is_ok());
        assert!(Args::try_parse_from(["stegsweep", "--check-tools"]).is_ok());
    }

    #[test]
    fn test_full_invocation() {
        let args = Args::try_parse_from([
            "stegsweep",
            "secret.jpg",
            "-p",
            "hunter2",
            "-o",
            "out.json",
            "--tools",
            "strings,steghide",
            "--tool-dir",
            "/opt/stego/bin",
            "--timeout",
            "10",
            "--probe-timeout",
            "2",
        ])
        .unwrap();
        assert_eq!(args.password, "hunter2");
        assert_eq!(args.output, Some(PathBuf::from("out.json")));

        let config = RunnerConfig::from(&args);
        assert_eq!(config.tools, vec![ToolKind::Strings, ToolKind::Steghide]);
        assert_eq!(config.tool_dir, Some(PathBuf::from("/opt/stego/bin")));
        assert_eq!(config.timeout_override, Some(Duration::from_secs(10)));
        assert_eq!(config.probe_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_unknown_tool_rejected() {
        assert!(Args::try_parse_from(["stegsweep", "x.png", "--tools", "stegsolve"]).is_err());
    }
}
