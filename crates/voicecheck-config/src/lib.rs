use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use voicecheck_types::AnalysisConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Upper bound for request and overall timeouts (one day).
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Upper bound for the retry base delay (ten minutes).
pub const MAX_BASE_DELAY_MS: u64 = 600_000;

/// Top-level voicecheck configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Voice analysis backends.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Reject values the analyzer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let analysis = &self.analysis;
        if analysis.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "analysis.retry.max_attempts must be at least 1".into(),
            ));
        }
        if analysis.retry.base_delay_ms > MAX_BASE_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "analysis.retry.base_delay_ms must be at most {MAX_BASE_DELAY_MS}"
            )));
        }
        if let Some(inline) = analysis.inline_retry {
            if inline.max_attempts == 0 {
                return Err(ConfigError::Invalid(
                    "analysis.inline_retry.max_attempts must be at least 1".into(),
                ));
            }
            if inline.base_delay_ms > MAX_BASE_DELAY_MS {
                return Err(ConfigError::Invalid(format!(
                    "analysis.inline_retry.base_delay_ms must be at most {MAX_BASE_DELAY_MS}"
                )));
            }
        }
        if !(0.0..=2.0).contains(&analysis.temperature) {
            return Err(ConfigError::Invalid(format!(
                "analysis.temperature must be within 0.0..=2.0, got {}",
                analysis.temperature
            )));
        }
        if analysis.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "analysis.request_timeout_secs must be greater than 0".into(),
            ));
        }
        if analysis.request_timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "analysis.request_timeout_secs must be at most {MAX_TIMEOUT_SECS}"
            )));
        }
        if analysis.overall_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "analysis.overall_timeout_secs must be greater than 0 when set".into(),
            ));
        }
        if analysis.overall_timeout_secs.is_some_and(|secs| secs > MAX_TIMEOUT_SECS) {
            return Err(ConfigError::Invalid(format!(
                "analysis.overall_timeout_secs must be at most {MAX_TIMEOUT_SECS}"
            )));
        }

        let endpoint_set = !analysis.generation_endpoint.trim().is_empty();
        let key_set = !analysis.generation_api_key.trim().is_empty();
        if endpoint_set != key_set {
            tracing::warn!(
                "Only one of generation_endpoint / generation_api_key is set; remote generation stays disabled"
            );
        }
        Ok(())
    }
}

/// Environment variables that override file settings.
pub const ENV_PROXY_URL: &str = "VOICECHECK_PROXY_URL";
pub const ENV_PROXY_ALTERNATES: &str = "VOICECHECK_PROXY_ALTERNATES";
pub const ENV_GENERATION_ENDPOINT: &str = "VOICECHECK_GENERATION_ENDPOINT";
pub const ENV_GENERATION_API_KEY: &str = "VOICECHECK_GENERATION_API_KEY";
pub const ENV_UPLOAD_URL: &str = "VOICECHECK_UPLOAD_URL";
pub const ENV_APP_KEY: &str = "VOICECHECK_APP_KEY";

/// Apply overrides from `lookup` (normally `std::env::var`) onto `config`.
///
/// Unset or blank variables leave the file value in place.
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let analysis = &mut config.analysis;

    if let Some(v) = get(ENV_PROXY_URL) {
        analysis.proxy_url = v;
    }
    if let Some(v) = get(ENV_PROXY_ALTERNATES) {
        analysis.proxy_alternates = v;
    }
    if let Some(v) = get(ENV_GENERATION_ENDPOINT) {
        analysis.generation_endpoint = v;
    }
    if let Some(v) = get(ENV_GENERATION_API_KEY) {
        analysis.generation_api_key = v;
    }
    if let Some(v) = get(ENV_UPLOAD_URL) {
        analysis.upload_url = Some(v);
    }
    if let Some(v) = get(ENV_APP_KEY) {
        analysis.app_key = Some(v);
    }
}

/// Resolve the voicecheck config directory (~/.voicecheck/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".voicecheck"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.voicecheck/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, apply environment overrides and validate.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    let mut config = load_config_from(&path)?;
    apply_overrides(&mut config, |name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Save configuration to the default path. Secrets are not written.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let dir = ensure_config_dir()?;
    save_config_to(config, &dir.join("config.json5"))
}

/// Save configuration to a specific path.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Io(std::io::Error::other(e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.analysis.proxy_url.is_empty());
        assert_eq!(config.analysis.retry.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            analysis: {
                proxy_url: "http://10.0.2.2:3000",
                proxy_alternates: "http://192.168.1.5:3000; http://backup:3000",
                retry: { max_attempts: 5 },
                overall_timeout_secs: 90,
            },
        }"#;
        let config: AppConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.analysis.proxy_url, "http://10.0.2.2:3000");
        assert_eq!(config.analysis.retry.max_attempts, 5);
        assert_eq!(config.analysis.retry.base_delay_ms, 500);
        assert_eq!(config.analysis.overall_timeout_secs, Some(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.json5")).unwrap();
        assert!(!config.analysis.has_proxy());
    }

    #[test]
    fn test_save_then_load_drops_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json5");

        let mut config = AppConfig::default();
        config.analysis.generation_endpoint = "https://example.com/gen".into();
        config.analysis.generation_api_key = "secret".into();
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.analysis.generation_endpoint, "https://example.com/gen");
        assert!(loaded.analysis.generation_api_key.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_PROXY_URL, "http://127.0.0.1:4000"),
            (ENV_GENERATION_API_KEY, "k-123"),
            (ENV_APP_KEY, "  "),
        ]);
        let mut config = AppConfig::default();
        config.analysis.generation_endpoint = "https://file.example/gen".into();

        apply_overrides(&mut config, |name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.analysis.proxy_url, "http://127.0.0.1:4000");
        assert_eq!(config.analysis.generation_api_key, "k-123");
        assert_eq!(config.analysis.generation_endpoint, "https://file.example/gen");
        assert!(config.analysis.app_key.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = AppConfig::default();
        config.analysis.retry.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = AppConfig::default();
        config.analysis.temperature = 3.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = AppConfig::default();
        config.analysis.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analysis.overall_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_durations() {
        let mut config = AppConfig::default();
        config.analysis.overall_timeout_secs = Some(u64::MAX);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.analysis.retry.base_delay_ms = u64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.analysis.request_timeout_secs = MAX_TIMEOUT_SECS + 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analysis.overall_timeout_secs = Some(MAX_TIMEOUT_SECS);
        config.analysis.retry.base_delay_ms = MAX_BASE_DELAY_MS;
        assert!(config.validate().is_ok());
    }
}
