//! Configuration management module
//!
//! Defaults, then a YAML file, then `SOULBROWSER_HEAL_*` environment overrides.

use crate::errors::{ResilienceError, ResilienceResult};
use action_gate::ValidatorPolicy;
use memory_center::{CollectorConfig, LearnerConfig, ERROR_HISTORY_FILE, PATTERN_STORE_FILE};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_STORAGE_DIR: &str = "SOULBROWSER_HEAL_STORAGE_DIR";
pub const ENV_MAX_ERRORS: &str = "SOULBROWSER_HEAL_MAX_ERRORS";
pub const ENV_MAX_PATTERNS: &str = "SOULBROWSER_HEAL_MAX_PATTERNS";
pub const ENV_DISABLED: &str = "SOULBROWSER_HEAL_DISABLED";

/// Heal-and-retry behaviour of the orchestrator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealSettings {
    pub enabled: bool,
    pub max_alternatives: usize,
    /// Fresh heal candidates below this are not retried
    pub min_candidate_confidence: f64,
    /// Check that a learned replacement selector resolves before retrying it
    pub verify_learned_fix: bool,
}

impl Default for HealSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_alternatives: 5,
            min_candidate_confidence: 0.5,
            verify_learned_fix: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Directory holding the error-history and pattern-store documents.
    /// In-memory only when unset.
    pub storage_dir: Option<PathBuf>,
    pub collector: CollectorConfig,
    pub learner: LearnerConfig,
    pub validator: ValidatorPolicy,
    pub heal: HealSettings,
}

impl ResilienceConfig {
    pub fn from_yaml_str(raw: &str) -> ResilienceResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> ResilienceResult<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            ResilienceError::Config(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::from_yaml_str(&raw)
    }

    /// `~/.config/soulbrowser/resilience.yaml` (platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("soulbrowser").join("resilience.yaml"))
    }

    /// Load from `explicit` (which must exist) or the default location when
    /// present, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> ResilienceResult<Self> {
        let mut config = match explicit {
            Some(path) => {
                let config = Self::from_file(path)?;
                info!("Loaded resilience configuration from: {}", path.display());
                config
            }
            None => match Self::default_path().filter(|path| path.exists()) {
                Some(path) => {
                    let config = Self::from_file(&path)?;
                    info!("Loaded resilience configuration from: {}", path.display());
                    config
                }
                None => Self::default(),
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Unparsable values are logged and ignored
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = env_value(ENV_STORAGE_DIR) {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        if let Some(max) = env_parsed::<usize>(ENV_MAX_ERRORS) {
            self.collector.max_errors = max;
        }
        if let Some(max) = env_parsed::<usize>(ENV_MAX_PATTERNS) {
            self.learner.max_patterns = max;
        }
        if let Some(raw) = env_value(ENV_DISABLED) {
            match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.heal.enabled = false,
                "0" | "false" | "no" | "off" => self.heal.enabled = true,
                other => warn!(key = ENV_DISABLED, value = %other, "ignoring unrecognised flag"),
            }
        }
    }

    pub fn error_history_path(&self) -> Option<PathBuf> {
        self.storage_dir
            .as_ref()
            .map(|dir| dir.join(ERROR_HISTORY_FILE))
    }

    pub fn pattern_store_path(&self) -> Option<PathBuf> {
        self.storage_dir
            .as_ref()
            .map(|dir| dir.join(PATTERN_STORE_FILE))
    }

    pub fn to_yaml(&self) -> ResilienceResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn env_value(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_value(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    fn clear_env() {
        for key in [ENV_STORAGE_DIR, ENV_MAX_ERRORS, ENV_MAX_PATTERNS, ENV_DISABLED] {
            env::remove_var(key);
        }
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ResilienceConfig::from_yaml_str(
            r#"
collector:
  max_errors: 50
heal:
  min_candidate_confidence: 0.75
validator:
  extra_rules:
    - tool: get_content
      issue_type: paywall
      check: field_matches
      fields: [content]
      pattern: "subscribe to continue"
      message: "Content is behind a paywall"
      severity: error
      deduction: 40
"#,
        )
        .expect("config");
        assert_eq!(config.collector.max_errors, 50);
        assert_eq!(config.collector.persist_limit, 500);
        assert_eq!(config.learner, LearnerConfig::default());
        assert_eq!(config.heal.min_candidate_confidence, 0.75);
        assert!(config.heal.enabled);
        assert_eq!(config.validator.extra_rules.len(), 1);
        assert_eq!(config.validator.history_cap, 100);
    }

    #[test]
    fn blank_and_broken_yaml() {
        assert_eq!(
            ResilienceConfig::from_yaml_str("  \n").expect("blank"),
            ResilienceConfig::default()
        );
        assert!(matches!(
            ResilienceConfig::from_yaml_str("collector: [1, 2"),
            Err(ResilienceError::Config(_))
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.yaml");
        assert!(ResilienceConfig::load(Some(&missing)).is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        clear_env();
        env::set_var(ENV_STORAGE_DIR, "/tmp/heal-store");
        env::set_var(ENV_MAX_ERRORS, "25");
        env::set_var(ENV_MAX_PATTERNS, "not-a-number");
        env::set_var(ENV_DISABLED, "true");

        let mut config = ResilienceConfig::default();
        config.apply_env_overrides();
        clear_env();

        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/heal-store")));
        assert_eq!(config.collector.max_errors, 25);
        assert_eq!(config.learner.max_patterns, 500);
        assert!(!config.heal.enabled);
        assert_eq!(
            config.error_history_path(),
            Some(PathBuf::from("/tmp/heal-store/error-history.json"))
        );
    }

    #[test]
    #[serial]
    fn file_then_env() {
        clear_env();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("resilience.yaml");
        fs::write(&path, "learner:\n  max_patterns: 10\n").expect("write");
        env::set_var(ENV_MAX_PATTERNS, "20");

        let config = ResilienceConfig::load(Some(&path)).expect("load");
        clear_env();

        assert_eq!(config.learner.max_patterns, 20);
        assert!(config.storage_dir.is_none());
        assert!(config.pattern_store_path().is_none());
    }
}
