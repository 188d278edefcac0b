//! Integration tests for ConfigManager and runner.yaml handling
//!
//! These tests verify:
//! - Settings loading and saving
//! - Defaults for missing files and missing sections
//! - Environment overrides
//! - Validation of nonsensical values

use camino::Utf8PathBuf;
use design_runner::ConfigManager;
use design_runner::config::SETTINGS_FILE;
use design_runner::models::Settings;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.settings_path(), config_path.join(SETTINGS_FILE));
}

#[test]
fn test_load_defaults_without_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = manager.load_settings().unwrap();

    assert_eq!(settings.orchestrator.poll_interval(), Duration::from_secs(1));
    assert_eq!(settings.orchestrator.channel_capacity, 64);
    assert_eq!(settings.orchestrator.termination_grace(), Duration::from_secs(5));
    assert_eq!(settings.generator.program, "proteinsolver-generate");
    assert_eq!(settings.logging.dir, "logs");
    assert!(!settings.logging.debug);
}

#[test]
fn test_save_and_load_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut settings = Settings::default();
    settings.orchestrator.poll_interval_ms = 250;
    settings.orchestrator.channel_capacity = 16;
    settings.generator.program = "/opt/designer/bin/generate".to_string();
    settings.generator.args = vec!["{target}".to_string(), "{count}".to_string()];
    settings.logging.prefix = "nightly".to_string();

    manager.save_settings(&settings).unwrap();
    assert!(config_path.join(SETTINGS_FILE).exists());

    let loaded = manager.load_settings().unwrap();
    assert_eq!(loaded.orchestrator.poll_interval_ms, 250);
    assert_eq!(loaded.orchestrator.channel_capacity, 16);
    assert_eq!(loaded.generator.program, "/opt/designer/bin/generate");
    assert_eq!(loaded.generator.args, vec!["{target}", "{count}"]);
    assert_eq!(loaded.logging.prefix, "nightly");
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        config_path.join(SETTINGS_FILE),
        "generator:\n  program: designer\n",
    )
    .unwrap();

    let settings = manager.load_settings().unwrap();
    assert_eq!(settings.generator.program, "designer");
    assert_eq!(settings.orchestrator.channel_capacity, 64);
    assert_eq!(settings.logging.prefix, "design-runner");
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(
        config_path.join(SETTINGS_FILE),
        "generator:\n  timeout_secs: 10\n",
    )
    .unwrap();

    // Only this test touches this variable
    unsafe { std::env::set_var("DESIGN_RUNNER__GENERATOR__TIMEOUT_SECS", "42") };
    let settings = manager.load_settings();
    unsafe { std::env::remove_var("DESIGN_RUNNER__GENERATOR__TIMEOUT_SECS") };

    assert_eq!(
        settings.unwrap().generator.timeout(),
        Some(Duration::from_secs(42))
    );
}

#[test]
fn test_zero_poll_interval_rejected() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(
        config_path.join(SETTINGS_FILE),
        "orchestrator:\n  poll_interval_ms: 0\n",
    )
    .unwrap();

    let err = manager.load_settings().unwrap_err();
    assert!(format!("{:#}", err).contains("poll_interval_ms"));
}

#[test]
fn test_invalid_yaml_handling() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(config_path.join(SETTINGS_FILE), "invalid: yaml: content: {{").unwrap();

    let result = manager.load_settings();
    assert!(result.is_err(), "Should fail to parse invalid YAML");
}

#[test]
fn test_config_directory_creation() {
    let temp_dir = TempDir::new().unwrap();
    let config_path =
        Utf8PathBuf::try_from(temp_dir.path().join("nested").join("config")).unwrap();

    assert!(!config_path.exists());
    let _manager = ConfigManager::new(&config_path).unwrap();

    // Directory should now exist
    assert!(config_path.exists());
}
