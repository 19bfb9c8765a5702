use std::env;
use std::time::Duration;

use crate::errors::GatewayError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_SUGGEST_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_SUGGESTION_COUNT: usize = 6;

/// Process-wide gateway settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub edit_model: String,
    pub suggest_model: String,
    pub suggestion_count: usize,
    pub request_timeout: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            edit_model: DEFAULT_EDIT_MODEL.to_string(),
            suggest_model: DEFAULT_SUGGEST_MODEL.to_string(),
            suggestion_count: DEFAULT_SUGGESTION_COUNT,
            request_timeout: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_key: get("GEMINI_API_KEY")
                .or_else(|| get("GOOGLE_API_KEY"))
                .or_else(|| get("API_KEY")),
            api_base: get("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            edit_model: get("LUMINA_EDIT_MODEL").unwrap_or(defaults.edit_model),
            suggest_model: get("LUMINA_SUGGEST_MODEL").unwrap_or(defaults.suggest_model),
            suggestion_count: get("LUMINA_SUGGESTION_COUNT")
                .and_then(|value| value.parse::<usize>().ok())
                .map(|value| value.clamp(1, 12))
                .unwrap_or(defaults.suggestion_count),
            request_timeout: get("LUMINA_REQUEST_TIMEOUT")
                .and_then(|value| value.parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .map(|value| Duration::from_secs_f64(value.clamp(5.0, 600.0))),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// The persistent session error to show when gateway calls are disabled.
    pub fn credential_error(&self) -> Option<GatewayError> {
        if self.has_credential() {
            None
        } else {
            Some(GatewayError::missing_credential())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{GatewayConfig, DEFAULT_API_BASE, DEFAULT_EDIT_MODEL, DEFAULT_SUGGESTION_COUNT};
    use crate::errors::GatewayErrorKind;

    fn config_from(pairs: &[(&str, &str)]) -> GatewayConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.api_key, None);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.edit_model, DEFAULT_EDIT_MODEL);
        assert_eq!(config.suggestion_count, DEFAULT_SUGGESTION_COUNT);
        assert_eq!(config.request_timeout, None);
        assert_eq!(
            config.credential_error().map(|err| err.kind()),
            Some(GatewayErrorKind::Configuration)
        );
    }

    #[test]
    fn key_lookup_prefers_gemini_then_google_and_ignores_blanks() {
        let config = config_from(&[("GEMINI_API_KEY", "  "), ("GOOGLE_API_KEY", "g-key")]);
        assert_eq!(config.api_key.as_deref(), Some("g-key"));
        assert!(config.credential_error().is_none());

        let config = config_from(&[("GEMINI_API_KEY", "gem"), ("API_KEY", "plain")]);
        assert_eq!(config.api_key.as_deref(), Some("gem"));
    }

    #[test]
    fn numeric_settings_are_clamped() {
        let config = config_from(&[
            ("LUMINA_SUGGESTION_COUNT", "40"),
            ("LUMINA_REQUEST_TIMEOUT", "1"),
            ("GEMINI_API_BASE", "https://proxy.test/v1beta/"),
        ]);
        assert_eq!(config.suggestion_count, 12);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.api_base, "https://proxy.test/v1beta");

        let config = config_from(&[("LUMINA_SUGGESTION_COUNT", "nope")]);
        assert_eq!(config.suggestion_count, DEFAULT_SUGGESTION_COUNT);
    }
}
