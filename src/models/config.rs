use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level settings from runner.yaml
///
/// Every section falls back to its defaults when absent, so a partial file
/// (or none at all) is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub orchestrator: OrchestratorSettings,
    pub generator: GeneratorSettings,
    pub logging: LoggingSettings,
}

/// Controller loop tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// How long one result-channel poll waits before the cancellation flag is re-checked
    pub poll_interval_ms: u64,

    /// Designs buffered between worker and controller
    pub channel_capacity: usize,

    /// How long a worker that delivered every design may take to exit before it is cancelled
    pub termination_grace_ms: u64,
}

impl OrchestratorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            channel_capacity: 64,
            termination_grace_ms: 5000,
        }
    }
}

/// External generator program
///
/// `args` may contain `{count}`, `{target}` and `{reference}` placeholders,
/// substituted per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: Option<u64>,
}

impl GeneratorSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            program: "proteinsolver-generate".to_string(),
            args: vec![
                "--count".to_string(),
                "{count}".to_string(),
                "--target".to_string(),
                "{target}".to_string(),
            ],
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: String,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            prefix: "design-runner".to_string(),
            debug: false,
            console: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "orchestrator:\n  poll_interval_ms: 250\n";
        let settings: Settings = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(settings.orchestrator.poll_interval(), Duration::from_millis(250));
        assert_eq!(settings.orchestrator.channel_capacity, 64);
        assert_eq!(settings.generator, GeneratorSettings::default());
        assert_eq!(settings.logging.prefix, "design-runner");
    }

    #[test]
    fn test_generator_timeout() {
        let mut generator = GeneratorSettings::default();
        assert_eq!(generator.timeout(), None);

        generator.timeout_secs = Some(30);
        assert_eq!(generator.timeout(), Some(Duration::from_secs(30)));
    }
}
