use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, WizardError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Runtime settings for the service.
///
/// Defaults, then an optional YAML file named by `WIZARD_CONFIG`, then
/// environment variables (`PORT`, `DATABASE_URL`, `NOTES_PATH`,
/// `QUESTION_DELAY_MS`, `LOG_FORMAT`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub port: u16,
    /// PostgreSQL for sessions; in-memory when unset
    pub database_url: Option<String>,
    pub notes_path: PathBuf,
    /// Artificial pause before each generated question
    pub question_delay_ms: u64,
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            notes_path: PathBuf::from("data/notes.json"),
            question_delay_ms: 800,
            log_format: LogFormat::Json,
        }
    }
}

impl ServiceConfig {
    pub fn load() -> Result<Self> {
        let yaml = match std::env::var("WIZARD_CONFIG") {
            Ok(path) => Some(std::fs::read_to_string(&path).map_err(|e| {
                WizardError::Config(format!("cannot read config file {path}: {e}"))
            })?),
            Err(_) => None,
        };
        Self::from_sources(yaml.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        yaml: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = match yaml {
            Some(raw) => serde_yaml::from_str(raw)
                .map_err(|e| WizardError::Config(format!("invalid config file: {e}")))?,
            None => ServiceConfig::default(),
        };

        if let Some(port) = env("PORT") {
            config.port = port
                .parse()
                .map_err(|_| WizardError::Config(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(url) = env("DATABASE_URL").filter(|u| !u.is_empty()) {
            config.database_url = Some(url);
        }
        if let Some(path) = env("NOTES_PATH") {
            config.notes_path = PathBuf::from(path);
        }
        if let Some(delay) = env("QUESTION_DELAY_MS") {
            config.question_delay_ms = delay.parse().map_err(|_| {
                WizardError::Config(format!("QUESTION_DELAY_MS is not a number: {delay}"))
            })?;
        }
        if let Some(format) = env("LOG_FORMAT") {
            config.log_format = match format.as_str() {
                "pretty" => LogFormat::Pretty,
                _ => LogFormat::Json,
            };
        }

        Ok(config)
    }

    pub fn question_delay(&self) -> Duration {
        Duration::from_millis(self.question_delay_ms)
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let config = ServiceConfig::from_sources(None, env(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn env_overrides_yaml() {
        let yaml = "port: 8080\nquestion_delay_ms: 0\nlog_format: pretty\n";
        let config = ServiceConfig::from_sources(Some(yaml), env(&[("PORT", "9000")])).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.question_delay_ms, 0);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.notes_path, PathBuf::from("data/notes.json"));
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = ServiceConfig::from_sources(None, env(&[("QUESTION_DELAY_MS", "soon")])).unwrap_err();
        assert!(matches!(err, WizardError::Config(_)));
    }
}
