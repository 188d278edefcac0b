use crate::models::Settings;
use anyhow::{Context, Result, ensure};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "runner.yaml";

/// Prefix for environment overrides, e.g. `DESIGN_RUNNER__ORCHESTRATOR__POLL_INTERVAL_MS=250`
pub const ENV_PREFIX: &str = "DESIGN_RUNNER";

/// Configuration manager for loading and saving `runner.yaml`.
///
/// Values are layered: built-in defaults, then the YAML file (optional), then
/// `DESIGN_RUNNER__SECTION__KEY` environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load settings from the file and environment.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_settings(&self) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings: Settings = Config::builder()
            .add_source(File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        Self::validate(&settings)?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save settings as YAML.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    fn validate(settings: &Settings) -> Result<()> {
        ensure!(
            settings.orchestrator.poll_interval_ms > 0,
            "orchestrator.poll_interval_ms must be greater than zero"
        );
        ensure!(
            settings.orchestrator.channel_capacity > 0,
            "orchestrator.channel_capacity must be greater than zero"
        );
        ensure!(
            !settings.generator.program.trim().is_empty(),
            "generator.program must not be empty"
        );
        Ok(())
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
