use std::fmt;

use serde::{Deserialize, Serialize};

// ──────────────────── Retry Types ────────────────────

/// Retry budget for a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryTuning {
    /// Total number of HTTP calls allowed, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay; the wait before attempt `n + 1` is `base_delay_ms * n`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for RetryTuning {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

// ──────────────────── Analysis Types ────────────────────

/// Everything the voice analyzer needs to know about its remote backends.
///
/// Empty strings mean "not configured". A deployment either runs its own
/// analysis proxy (`proxy_url`) or talks to a generation backend directly
/// (`generation_endpoint` + `generation_api_key`); when both are set the proxy
/// wins.
#[derive(Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Primary proxy base URL (e.g. "http://10.0.2.2:3000").
    #[serde(default)]
    pub proxy_url: String,
    /// Alternate proxy URLs separated by commas, semicolons or whitespace.
    #[serde(default)]
    pub proxy_alternates: String,
    /// Remote generation endpoint (a `:generateContent` URL).
    #[serde(default)]
    pub generation_endpoint: String,
    /// API key sent as the `key` query parameter.
    #[serde(default, skip_serializing)]
    pub generation_api_key: String,
    /// File upload endpoint. Derived from `generation_endpoint` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    /// Application access key sent to the proxy as `X-APP-KEY`.
    #[serde(default, skip_serializing)]
    pub app_key: Option<String>,
    /// Prompt override for the generation strategies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Sampling temperature hint for the generation strategies.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Retry budget for proxy and file-reference calls.
    #[serde(default)]
    pub retry: RetryTuning,
    /// Retry budget for the inline strategy (falls back to `retry`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_retry: Option<RetryTuning>,
    /// Transport timeout for a single HTTP attempt.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Wall-clock ceiling for a whole analysis across every strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_timeout_secs: Option<u64>,
}

fn default_temperature() -> f32 {
    0.2
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            proxy_url: String::new(),
            proxy_alternates: String::new(),
            generation_endpoint: String::new(),
            generation_api_key: String::new(),
            upload_url: None,
            app_key: None,
            prompt: None,
            temperature: default_temperature(),
            retry: RetryTuning::default(),
            inline_retry: None,
            request_timeout_secs: default_request_timeout_secs(),
            overall_timeout_secs: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("proxy_url", &self.proxy_url)
            .field("proxy_alternates", &self.proxy_alternates)
            .field("generation_endpoint", &self.generation_endpoint)
            .field("generation_api_key", &redact(&self.generation_api_key))
            .field("upload_url", &self.upload_url)
            .field("app_key", &self.app_key.as_deref().map(redact))
            .field("prompt", &self.prompt)
            .field("temperature", &self.temperature)
            .field("retry", &self.retry)
            .field("inline_retry", &self.inline_retry)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("overall_timeout_secs", &self.overall_timeout_secs)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "[REDACTED]" }
}

impl AnalysisConfig {
    /// Whether a proxy deployment is configured.
    pub fn has_proxy(&self) -> bool {
        !self.proxy_url.trim().is_empty()
    }

    /// Whether the generation backend has both an endpoint and a key.
    pub fn has_generation(&self) -> bool {
        !self.generation_endpoint.trim().is_empty() && !self.generation_api_key.trim().is_empty()
    }

    /// Retry budget for the inline strategy.
    pub fn inline_retry(&self) -> RetryTuning {
        self.inline_retry.unwrap_or(self.retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_config_defaults() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.has_proxy());
        assert!(!config.has_generation());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.overall_timeout_secs.is_none());
    }

    #[test]
    fn test_generation_requires_key_and_endpoint() {
        let config = AnalysisConfig {
            generation_endpoint: "https://example.com/v1beta/models/m:generateContent".into(),
            ..AnalysisConfig::default()
        };
        assert!(!config.has_generation());

        let config = AnalysisConfig {
            generation_api_key: "k".into(),
            ..config
        };
        assert!(config.has_generation());
    }

    #[test]
    fn test_whitespace_proxy_is_not_configured() {
        let config = AnalysisConfig {
            proxy_url: "   ".into(),
            ..AnalysisConfig::default()
        };
        assert!(!config.has_proxy());
    }

    #[test]
    fn test_inline_retry_falls_back() {
        let mut config = AnalysisConfig::default();
        assert_eq!(config.inline_retry(), config.retry);

        config.inline_retry = Some(RetryTuning {
            max_attempts: 1,
            base_delay_ms: 10,
        });
        assert_eq!(config.inline_retry().max_attempts, 1);
    }

    #[test]
    fn test_secrets_not_serialized_or_printed() {
        let config = AnalysisConfig {
            generation_api_key: "super-secret".into(),
            app_key: Some("app-secret".into()),
            ..AnalysisConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("app-secret"));

        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
