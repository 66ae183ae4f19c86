//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cursor-extend.toml` files, and resolving API credentials from the
//! environment.

use crate::error::AgentError;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".cursor-extend.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Session limits.
    #[serde(default)]
    pub agent: AgentLimits,

    /// Web search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Workspace scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// Reasoning effort requested from reasoning models.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    #[default]
    High,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_model_url")]
    pub base_url: String,

    /// Reasoning effort sent with every completion request.
    #[serde(default)]
    pub reasoning_effort: ReasoningEffort,

    /// Sampling temperature. Reasoning models ignore it, so it is unset by default.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            base_url: default_model_url(),
            reasoning_effort: ReasoningEffort::default(),
            temperature: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "o3-mini".to_string()
}

fn default_model_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    300
}

/// Limits on a single analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLimits {
    /// Maximum controller transitions before the session is aborted.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Maximum model turns the step agent may take for one step.
    #[serde(default = "default_max_step_turns")]
    pub max_step_turns: usize,
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_step_turns: default_max_step_turns(),
        }
    }
}

fn default_max_steps() -> usize {
    40
}

fn default_max_step_turns() -> usize {
    10
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results kept per search, in the order the provider ranks them.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Base URL of the search API.
    #[serde(default = "default_search_url")]
    pub base_url: String,

    /// Search depth (`basic` or `advanced`).
    #[serde(default = "default_search_depth")]
    pub search_depth: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            base_url: default_search_url(),
            search_depth: default_search_depth(),
        }
    }
}

fn default_max_results() -> usize {
    3
}

fn default_search_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_search_depth() -> String {
    "basic".to_string()
}

/// Workspace scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum files listed by a single scan.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Patterns to exclude.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_files() -> usize {
    500
}

fn default_extensions() -> Vec<String> {
    vec![
        "rs", "py", "js", "ts", "jsx", "tsx", "go", "java", "c", "cpp", "h", "hpp", "cs", "rb",
        "php", "swift", "kt", "scala", "toml", "json", "yaml", "yml", "md",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_excludes() -> Vec<String> {
    vec![
        ".git",
        "target",
        "node_modules",
        "vendor",
        "dist",
        "build",
        "__pycache__",
        ".venv",
        "venv",
        ".idea",
        ".vscode",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_file_size() -> usize {
    1024 * 1024 // 1MB
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given on the command line or through their environment
    /// variable override the file; clap resolves flag over variable.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(effort) = args.reasoning_effort {
            self.model.reasoning_effort = effort;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(max_steps) = args.max_steps {
            self.agent.max_steps = max_steps;
        }
        if let Some(turns) = args.max_step_turns {
            self.agent.max_step_turns = turns;
        }

        if let Some(max_results) = args.max_search_results {
            self.search.max_results = max_results;
        }
    }

    /// Reject zero limits. Call after [`merge_with_args`](Self::merge_with_args).
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("agent.max_steps", self.agent.max_steps),
            ("agent.max_step_turns", self.agent.max_step_turns),
            ("search.max_results", self.search.max_results),
            ("scanner.max_files", self.scanner.max_files),
        ];
        for (name, value) in limits {
            if value == 0 {
                bail!("Invalid configuration: {} must be at least 1", name);
            }
        }

        if self.model.timeout_seconds == 0 {
            bail!("Invalid configuration: model.timeout_seconds must be at least 1");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// API keys required before any client is built.
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub tavily_api_key: String,
}

impl Credentials {
    pub const OPENAI_API_KEY: &'static str = "OPENAI_API_KEY";
    pub const TAVILY_API_KEY: &'static str = "TAVILY_API_KEY";

    /// Resolve both keys through `lookup`, reporting every missing one at once.
    ///
    /// Blank values count as missing.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AgentError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let openai = get(Self::OPENAI_API_KEY);
        let tavily = get(Self::TAVILY_API_KEY);

        match (openai, tavily) {
            (Some(openai_api_key), Some(tavily_api_key)) => Ok(Self {
                openai_api_key,
                tavily_api_key,
            }),
            (openai, tavily) => {
                let mut missing = Vec::new();
                if openai.is_none() {
                    missing.push(Self::OPENAI_API_KEY.to_string());
                }
                if tavily.is_none() {
                    missing.push(Self::TAVILY_API_KEY.to_string());
                }
                Err(AgentError::Config { missing })
            }
        }
    }

    /// Resolve credentials from the process environment.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::resolve(|name| std::env::var(name).ok())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("tavily_api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "o3-mini");
        assert_eq!(config.model.reasoning_effort, ReasoningEffort::High);
        assert_eq!(config.model.temperature, None);
        assert_eq!(config.agent.max_steps, 40);
        assert_eq!(config.agent.max_step_turns, 10);
        assert_eq!(config.search.max_results, 3);
        assert!(config.scanner.extensions.contains(&"rs".to_string()));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[model]
name = "gpt-4o"
reasoning_effort = "low"
temperature = 0.2

[agent]
max_steps = 12

[search]
max_results = 5

[scanner]
extensions = ["rs", "py"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.model.reasoning_effort, ReasoningEffort::Low);
        assert_eq!(config.model.temperature, Some(0.2));
        assert_eq!(config.model.base_url, "https://api.openai.com/v1");
        assert_eq!(config.agent.max_steps, 12);
        assert_eq!(config.agent.max_step_turns, 10);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.search.search_depth, "basic");
        assert_eq!(config.scanner.extensions, vec!["rs", "py"]);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[agent]"));
        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("[scanner]"));
        assert!(toml_str.contains("reasoning_effort = \"high\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agent.max_steps, 40);
    }

    #[test]
    fn test_merge_with_args_overrides_given_values_only() {
        use clap::Parser;

        let mut config: Config = toml::from_str(
            "[model]\nname = \"from-file\"\ntimeout_seconds = 60\n[agent]\nmax_step_turns = 4\n",
        )
        .unwrap();
        let args = crate::cli::Args::try_parse_from([
            "cursor-extend",
            "--model",
            "from-cli",
            "--max-steps",
            "5",
            "--max-search-results",
            "2",
            "--reasoning-effort",
            "low",
            "query",
        ])
        .unwrap();

        config.merge_with_args(&args);
        assert_eq!(config.model.name, "from-cli");
        assert_eq!(config.model.reasoning_effort, ReasoningEffort::Low);
        assert_eq!(config.model.timeout_seconds, 60);
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.agent.max_step_turns, 4);
        assert_eq!(config.search.max_results, 2);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits_from_file() {
        for (section, key) in [
            ("agent", "max_steps"),
            ("agent", "max_step_turns"),
            ("search", "max_results"),
            ("scanner", "max_files"),
            ("model", "timeout_seconds"),
        ] {
            let config: Config = toml::from_str(&format!("[{}]\n{} = 0\n", section, key)).unwrap();
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains(&format!("{}.{}", section, key)),
                "unexpected error: {}",
                err
            );
        }
    }

    #[test]
    fn test_cli_value_repairs_zero_from_file() {
        use clap::Parser;

        let mut config: Config = toml::from_str("[agent]\nmax_steps = 0\n").unwrap();
        let args =
            crate::cli::Args::try_parse_from(["cursor-extend", "--max-steps", "8", "query"]).unwrap();

        config.merge_with_args(&args);
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.max_steps, 8);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[agent]\nmax_steps = 7\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.agent.max_steps, 7);
        assert_eq!(config.model.name, "o3-mini");
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[agent\nmax_steps = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_credentials_resolved() {
        let creds = Credentials::resolve(env(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", "tvly-test"),
        ]))
        .unwrap();
        assert_eq!(creds.openai_api_key, "sk-test");
        assert_eq!(creds.tavily_api_key, "tvly-test");
        assert!(!format!("{:?}", creds).contains("sk-test"));
    }

    #[test]
    fn test_missing_credentials_named_together() {
        let err = Credentials::resolve(env(&[])).unwrap_err();
        match &err {
            AgentError::Config { missing } => {
                assert_eq!(missing, &["OPENAI_API_KEY", "TAVILY_API_KEY"])
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: OPENAI_API_KEY, TAVILY_API_KEY"
        );
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let err = Credentials::resolve(env(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, AgentError::Config { missing } if missing == ["TAVILY_API_KEY"]));
    }
}
