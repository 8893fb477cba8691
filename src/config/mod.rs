// Layered configuration system

pub mod loader;
pub mod merger;

pub use loader::{AiConfig, ConfigLoader, DatabaseConfig, PlannerConfig, SchedulingConfig};
pub use merger::{
    ConfigMerger, PartialAiConfig, PartialConfig, PartialDatabaseConfig, PartialSchedulingConfig,
};

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Load and merge configuration from all sources
/// Priority: CLI -> File -> Defaults
pub fn load_merged_config(
    config_path: Option<&Path>,
    cli_overrides: Option<PartialConfig>,
) -> Result<PlannerConfig> {
    let loader = match config_path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };

    let file = loader.load()?;
    if file.is_none() {
        if let Some(path) = config_path {
            log::warn!("Config file '{}' not found, using defaults", path.display());
        }
    }

    let config = ConfigMerger::new()
        .with_file(file)
        .with_cli(cli_overrides)
        .merge();

    loader::validate_config(&config)?;
    Ok(config)
}

/// Write `config` to the config file so later runs pick it up. An existing
/// file is only replaced when `force` is set.
pub fn init_config_file(
    config_path: Option<&Path>,
    config: &PlannerConfig,
    force: bool,
) -> Result<PathBuf> {
    let loader = match config_path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let path = loader
        .config_path()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("Could not determine config directory; pass --config"))?;

    if path.exists() && !force {
        return Err(anyhow!(
            "Config file '{}' already exists; use --force to overwrite",
            path.display()
        ));
    }

    loader.save_to_path(&path, config)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_config_file_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = PlannerConfig::default();
        config.ai.model = "local-model".to_string();
        config.scheduling.default_milestone_weeks = 3;

        let written = init_config_file(Some(&path), &config, false).unwrap();
        assert_eq!(written, path);

        let loaded = load_merged_config(Some(&path), None).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_init_config_file_refuses_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let config = PlannerConfig::default();

        init_config_file(Some(&path), &config, false).unwrap();
        let err = init_config_file(Some(&path), &config, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        assert!(init_config_file(Some(&path), &config, true).is_ok());
    }
}
