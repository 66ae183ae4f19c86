//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::ReasoningEffort;
use clap::Parser;
use std::path::PathBuf;

/// cursor-extend - plan-and-execute codebase analysis
///
/// Breaks a question about a codebase into a plan, executes it step by step
/// with a tool-calling model (web search plus read-only workspace tools), and
/// replans after every step until it can answer.
///
/// Examples:
///   cursor-extend "analyze the dependency structure of this codebase"
///   cursor-extend --path ./my-project --max-steps 20 "find error handling gaps"
///   cursor-extend --output report.md "review the module layering"
///   cursor-extend --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// The analysis query
    #[arg(value_name = "QUERY", required_unless_present = "init_config")]
    pub query: Option<String>,

    /// Model used for planning, step execution and replanning
    ///
    /// Default: from config or o3-mini.
    #[arg(short, long, env = "MODEL_NAME")]
    pub model: Option<String>,

    /// Maximum controller transitions before the session is aborted
    ///
    /// Default: from config or 40.
    #[arg(long, value_name = "COUNT", env = "MAX_STEPS")]
    pub max_steps: Option<usize>,

    /// Web search results kept per query
    ///
    /// Default: from config or 3.
    #[arg(long, value_name = "COUNT", env = "MAX_SEARCH_RESULTS")]
    pub max_search_results: Option<usize>,

    /// Maximum model turns the step agent may take for one step
    ///
    /// Default: from config or 10.
    #[arg(long, value_name = "COUNT")]
    pub max_step_turns: Option<usize>,

    /// Reasoning effort requested from the model
    #[arg(long, value_name = "LEVEL")]
    pub reasoning_effort: Option<ReasoningEffort>,

    /// Request timeout in seconds
    ///
    /// Default: from config or 300s.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Workspace the local code tools may read
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub path: PathBuf,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cursor-extend.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a session report to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cursor-extend.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The analysis query. Empty only with --init-config.
    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.query().trim().is_empty() {
            return Err("Query must not be empty".to_string());
        }

        if self.max_steps == Some(0) {
            return Err("Max steps must be at least 1".to_string());
        }

        if self.max_search_results == Some(0) {
            return Err("Max search results must be at least 1".to_string());
        }

        if self.max_step_turns == Some(0) {
            return Err("Max step turns must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if !self.path.exists() {
            return Err(format!(
                "Workspace directory does not exist: {}",
                self.path.display()
            ));
        }
        if !self.path.is_dir() {
            return Err(format!(
                "Workspace path is not a directory: {}",
                self.path.display()
            ));
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            query: Some("analyze the dependency structure".to_string()),
            model: None,
            max_steps: None,
            max_search_results: None,
            max_step_turns: None,
            reasoning_effort: None,
            timeout: None,
            path: PathBuf::from("."),
            config: None,
            output: None,
            format: OutputFormat::Markdown,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_positional_query() {
        let args = Args::try_parse_from([
            "cursor-extend",
            "--max-steps",
            "12",
            "--reasoning-effort",
            "medium",
            "--format",
            "json",
            "analyze the dependency structure",
        ])
        .unwrap();
        assert_eq!(args.query(), "analyze the dependency structure");
        assert_eq!(args.max_steps, Some(12));
        assert_eq!(args.reasoning_effort, Some(ReasoningEffort::Medium));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.path, PathBuf::from("."));
    }

    #[test]
    fn test_query_required_unless_init_config() {
        assert!(Args::try_parse_from(["cursor-extend"]).is_err());

        let args = Args::try_parse_from(["cursor-extend", "--init-config"]).unwrap();
        assert!(args.init_config);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_passes() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let mut args = make_args();
        args.max_steps = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.max_search_results = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.max_step_turns = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_blank_query() {
        let mut args = make_args();
        args.query = Some("   ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_workspace() {
        let mut args = make_args();
        args.path = PathBuf::from("/definitely/not/here");
        let err = args.validate().unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
