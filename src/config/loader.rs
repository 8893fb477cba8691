// Configuration file loading

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Planner configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlannerConfig {
    /// Language-model endpoint settings
    #[serde(default)]
    pub ai: AiConfig,
    /// Date scheduling rules
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    /// Storage settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiConfig {
    #[serde(rename = "baseUrl", alias = "base_url", default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(rename = "apiKeyEnv", alias = "api_key_env", default = "default_api_key_env")]
    pub api_key_env: String,
    /// Bound on the whole model call; exceeding it is a transport failure
    #[serde(rename = "timeoutSecs", alias = "timeout_secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(rename = "maxTokens", alias = "max_tokens", default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_timeout_secs() -> u64 { 60 }
fn default_max_tokens() -> u32 { 2000 }
fn default_temperature() -> f32 { 0.7 }

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Defaults applied when the model leaves dates out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulingConfig {
    /// Milestone length when no duration is declared
    #[serde(
        rename = "defaultMilestoneWeeks",
        alias = "default_milestone_weeks",
        default = "default_milestone_weeks"
    )]
    pub default_milestone_weeks: u32,
    /// Gap between consecutive task start dates
    #[serde(rename = "taskOffsetDays", alias = "task_offset_days", default = "default_task_offset_days")]
    pub task_offset_days: i64,
    #[serde(
        rename = "taskDurationDays",
        alias = "task_duration_days",
        default = "default_task_duration_days"
    )]
    pub task_duration_days: i64,
}

fn default_milestone_weeks() -> u32 { 2 }
fn default_task_offset_days() -> i64 { 1 }
fn default_task_duration_days() -> i64 { 3 }

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_milestone_weeks: default_milestone_weeks(),
            task_offset_days: default_task_offset_days(),
            task_duration_days: default_task_duration_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to the user data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Configured path, or `<data dir>/venture-roadmap/roadmap.db`
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            dirs::data_dir().map(|p| p.join("venture-roadmap").join("roadmap.db"))
        })
    }
}

/// Config loader
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader for the default location under the user config directory
    pub fn new() -> Self {
        Self {
            path: Self::default_config_path(),
        }
    }

    /// Loader for an explicit file
    pub fn with_path(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("venture-roadmap").join("config.toml"))
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the configured file; a missing file is not an error
    pub fn load(&self) -> Result<Option<PlannerConfig>> {
        match self.path {
            Some(ref path) => self.load_from_path(path),
            None => Ok(None),
        }
    }

    /// Load config from a specific path
    pub fn load_from_path(&self, path: &Path) -> Result<Option<PlannerConfig>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: PlannerConfig = toml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;

        validate_config(&config)?;

        log::debug!("Loaded config from: {}", path.display());
        Ok(Some(config))
    }

    /// Save config to a specific path
    pub fn save_to_path(&self, path: &Path, config: &PlannerConfig) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    anyhow!("Failed to create config directory '{}': {}", parent.display(), e)
                })?;
            }
        }

        validate_config(config)?;

        let contents = toml::to_string_pretty(config)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path, contents)
            .map_err(|e| anyhow!("Failed to write config file '{}': {}", path.display(), e))?;

        log::info!("Saved config to: {}", path.display());
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate config values
pub fn validate_config(config: &PlannerConfig) -> Result<()> {
    if config.ai.timeout_secs == 0 {
        return Err(anyhow!("timeoutSecs must be greater than 0"));
    }

    if config.ai.base_url.trim().is_empty() {
        return Err(anyhow!("baseUrl cannot be empty"));
    }

    if !(0.0..=2.0).contains(&config.ai.temperature) {
        return Err(anyhow!("temperature must be between 0 and 2"));
    }

    if config.scheduling.default_milestone_weeks == 0 {
        return Err(anyhow!("defaultMilestoneWeeks must be greater than 0"));
    }

    if config.scheduling.task_offset_days < 0 {
        return Err(anyhow!("taskOffsetDays cannot be negative"));
    }

    if config.scheduling.task_duration_days <= 0 {
        return Err(anyhow!("taskDurationDays must be greater than 0"));
    }

    Ok(())
}
