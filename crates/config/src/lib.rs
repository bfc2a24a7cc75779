//! Configuration loading, validation, and the per-turn snapshot for Sidekick.
//!
//! Loads configuration from `~/.sidekick/config.toml` with environment
//! variable overrides. The orchestration loop never reads settings
//! mid-turn: it takes one [`ConfigStore::load`] snapshot at the start of
//! each turn and uses it consistently until the turn ends.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.sidekick/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default model identifier sent to the backend
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Override for the base system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Model backend endpoint configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Autonomy policy settings (the approval gate reads these)
    #[serde(default)]
    pub autonomy: AutonomyConfig,

    /// Context window and output budgets
    #[serde(default)]
    pub context: ContextConfig,

    /// Retrieval augmentation settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Approval gate settings
    #[serde(default)]
    pub approval: ApprovalConfig,

    /// Orchestration turn settings
    #[serde(default)]
    pub turn: TurnConfig,
}

fn default_model() -> String {
    "qwen2.5-coder-7b-instruct".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("default_model", &self.default_model)
            .field("backend", &self.backend)
            .field("autonomy", &self.autonomy)
            .field("context", &self.context)
            .field("retrieval", &self.retrieval)
            .field("approval", &self.approval)
            .field("turn", &self.turn)
            .finish()
    }
}

/// Model backend endpoint settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of an OpenAI-compatible server (LM Studio default)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key, if the endpoint requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:1234/v1".into()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// Autonomy policy configuration.
///
/// This is the one record the product persists: the approval gate reads a
/// snapshot of it at the start of every turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyConfig {
    /// Autonomy level, 1 (chat only) through 5 (full auto)
    #[serde(default = "default_level")]
    pub level: u8,

    /// Tool names that are always auto-approved
    #[serde(default = "default_auto_approve")]
    pub auto_approve_tools: Vec<String>,

    /// Tool names that always require approval
    #[serde(default = "default_require_approval")]
    pub require_approval_tools: Vec<String>,

    /// Substrings that mark a terminal command as dangerous
    /// (matched case-insensitively; a soft guard, not a sandbox)
    #[serde(default = "default_dangerous_patterns")]
    pub dangerous_patterns: Vec<String>,
}

fn default_level() -> u8 {
    3
}

fn default_auto_approve() -> Vec<String> {
    vec!["read_file".into(), "list_files".into(), "plan_task".into()]
}

fn default_require_approval() -> Vec<String> {
    vec!["write_file".into(), "run_terminal".into()]
}

fn default_dangerous_patterns() -> Vec<String> {
    vec![
        "rm ".into(),
        "del ".into(),
        "format".into(),
        "rmdir".into(),
        "rd ".into(),
        "shutdown".into(),
        "reboot".into(),
        "kill".into(),
        "drop table".into(),
        "delete from".into(),
        "npm uninstall".into(),
        "yarn remove".into(),
    ]
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            auto_approve_tools: default_auto_approve(),
            require_approval_tools: default_require_approval(),
            dangerous_patterns: default_dangerous_patterns(),
        }
    }
}

/// How verbose model output should be. Drives the output token budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Brief,
    #[default]
    Normal,
    Detailed,
}

/// Context window and output budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum context window of the active model
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Output verbosity mode
    #[serde(default)]
    pub output_mode: OutputMode,
}

fn default_max_context_tokens() -> usize {
    32_768
}

impl ContextConfig {
    /// The output token budget implied by the output mode.
    pub fn max_output_tokens(&self) -> usize {
        match self.output_mode {
            OutputMode::Brief => 2_048,
            OutputMode::Normal => 8_192,
            OutputMode::Detailed => 16_384,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: default_max_context_tokens(),
            output_mode: OutputMode::default(),
        }
    }
}

/// Retrieval augmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How many snippets to fetch per turn
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: default_top_k(),
        }
    }
}

/// Approval gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Seconds to wait for an approval decision before denying.
    /// 0 disables the bound (the host guarantees an answer).
    #[serde(default = "default_approval_timeout")]
    pub timeout_secs: u64,
}

fn default_approval_timeout() -> u64 {
    120
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_approval_timeout(),
        }
    }
}

/// Orchestration turn settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Seconds before a model call is aborted
    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,

    /// Maximum tool-call iterations per user turn
    #[serde(default = "default_max_iterations")]
    pub max_tool_iterations: usize,
}

fn default_model_timeout() -> u64 {
    300
}

fn default_max_iterations() -> usize {
    5
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            model_timeout_secs: default_model_timeout(),
            max_tool_iterations: default_max_iterations(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.sidekick/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `SIDEKICK_MODEL` — default model identifier
    /// - `SIDEKICK_BASE_URL` — backend base URL
    /// - `SIDEKICK_API_KEY` — backend API key
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(model) = std::env::var("SIDEKICK_MODEL") {
            config.default_model = model;
        }
        if let Ok(url) = std::env::var("SIDEKICK_BASE_URL") {
            config.backend.base_url = url;
        }
        if config.backend.api_key.is_none() {
            config.backend.api_key = std::env::var("SIDEKICK_API_KEY").ok();
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sidekick")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=5).contains(&self.autonomy.level) {
            return Err(ConfigError::ValidationError(format!(
                "autonomy.level must be between 1 and 5, got {}",
                self.autonomy.level
            )));
        }

        if self.context.max_context_tokens < 1024 {
            return Err(ConfigError::ValidationError(
                "context.max_context_tokens must be at least 1024".into(),
            ));
        }

        if self.turn.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "turn.max_tool_iterations must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            system_prompt_override: None,
            backend: BackendConfig::default(),
            autonomy: AutonomyConfig::default(),
            context: ContextConfig::default(),
            retrieval: RetrievalConfig::default(),
            approval: ApprovalConfig::default(),
            turn: TurnConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// A source of per-turn configuration snapshots.
///
/// The engine calls `load()` exactly once at the start of each turn and
/// uses the returned snapshot consistently until the turn completes, so
/// settings edited mid-turn take effect on the next turn.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> AppConfig;
}

/// Re-reads the config file on every load (picks up external edits).
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by the default config location.
    pub fn default_location() -> Self {
        Self::new(AppConfig::config_dir().join("config.toml"))
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> AppConfig {
        match AppConfig::load_from(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {e}");
                AppConfig::default()
            }
        }
    }
}

/// A fixed snapshot — used in tests and embedded hosts.
pub struct StaticConfigStore {
    config: AppConfig,
}

impl StaticConfigStore {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl ConfigStore for StaticConfigStore {
    fn load(&self) -> AppConfig {
        self.config.clone()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
