// Configuration merging with priority

use crate::config::loader::{AiConfig, DatabaseConfig, PlannerConfig, SchedulingConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Partial configuration for merging
/// Uses Option<T> for all fields to support partial overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialConfig {
    #[serde(default)]
    pub ai: Option<PartialAiConfig>,
    #[serde(default)]
    pub scheduling: Option<PartialSchedulingConfig>,
    #[serde(default)]
    pub database: Option<PartialDatabaseConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialAiConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialSchedulingConfig {
    pub default_milestone_weeks: Option<u32>,
    pub task_offset_days: Option<i64>,
    pub task_duration_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialDatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Configuration merger
/// Priority order: CLI -> File -> Defaults
pub struct ConfigMerger {
    defaults: PlannerConfig,
    file: Option<PlannerConfig>,
    cli: Option<PartialConfig>,
}

impl ConfigMerger {
    pub fn new() -> Self {
        Self {
            defaults: PlannerConfig::default(),
            file: None,
            cli: None,
        }
    }

    pub fn with_file(mut self, config: Option<PlannerConfig>) -> Self {
        self.file = config;
        self
    }

    pub fn with_cli(mut self, config: Option<PartialConfig>) -> Self {
        self.cli = config;
        self
    }

    /// Merge all configs with priority
    pub fn merge(&self) -> PlannerConfig {
        // A loaded file is already complete; its missing keys took defaults
        let mut result = self.file.clone().unwrap_or_else(|| self.defaults.clone());

        if let Some(ref cli) = self.cli {
            result = self.merge_partial(&result, cli);
        }

        result
    }

    fn merge_partial(&self, base: &PlannerConfig, partial: &PartialConfig) -> PlannerConfig {
        PlannerConfig {
            ai: partial
                .ai
                .as_ref()
                .map(|p| self.merge_partial_ai(&base.ai, p))
                .unwrap_or_else(|| base.ai.clone()),
            scheduling: partial
                .scheduling
                .as_ref()
                .map(|p| self.merge_partial_scheduling(&base.scheduling, p))
                .unwrap_or_else(|| base.scheduling.clone()),
            database: partial
                .database
                .as_ref()
                .map(|p| DatabaseConfig {
                    path: p.path.clone().or_else(|| base.database.path.clone()),
                })
                .unwrap_or_else(|| base.database.clone()),
        }
    }

    fn merge_partial_ai(&self, base: &AiConfig, partial: &PartialAiConfig) -> AiConfig {
        AiConfig {
            base_url: partial
                .base_url
                .clone()
                .unwrap_or_else(|| base.base_url.clone()),
            model: partial.model.clone().unwrap_or_else(|| base.model.clone()),
            api_key_env: partial
                .api_key_env
                .clone()
                .unwrap_or_else(|| base.api_key_env.clone()),
            timeout_secs: partial.timeout_secs.unwrap_or(base.timeout_secs),
            max_tokens: partial.max_tokens.unwrap_or(base.max_tokens),
            temperature: partial.temperature.unwrap_or(base.temperature),
        }
    }

    fn merge_partial_scheduling(
        &self,
        base: &SchedulingConfig,
        partial: &PartialSchedulingConfig,
    ) -> SchedulingConfig {
        SchedulingConfig {
            default_milestone_weeks: partial
                .default_milestone_weeks
                .unwrap_or(base.default_milestone_weeks),
            task_offset_days: partial.task_offset_days.unwrap_or(base.task_offset_days),
            task_duration_days: partial.task_duration_days.unwrap_or(base.task_duration_days),
        }
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}
