use crate::model::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL";
pub const ENDPOINT_VAR: &str = "GEMINI_ENDPOINT";
pub const WORKSPACE_VAR: &str = "WEBFORGE_WORKSPACE";
pub const TIMEOUT_VAR: &str = "WEBFORGE_TIMEOUT_SECS";

const DEFAULT_WORKSPACE: &str = "workspace";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY is not set; add it to the environment or a .env file")]
    MissingApiKey,

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub workspace_dir: PathBuf,
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Reads the configuration once at startup, after loading `.env` from the
    /// working directory if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(error = %err, "failed to load .env"),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = non_empty(API_KEY_VAR).ok_or(ConfigError::MissingApiKey)?;
        let model = non_empty(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let endpoint = non_empty(ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let workspace_dir = PathBuf::from(
            non_empty(WORKSPACE_VAR).unwrap_or_else(|| DEFAULT_WORKSPACE.to_string()),
        );
        let timeout_secs = match non_empty(TIMEOUT_VAR) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: TIMEOUT_VAR,
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            model,
            endpoint,
            workspace_dir,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, API_KEY_VAR, MODEL_VAR, TIMEOUT_VAR, WORKSPACE_VAR};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn api_key_is_required() {
        assert!(matches!(config_from(&[]), Err(ConfigError::MissingApiKey)));
        assert!(matches!(
            config_from(&[(API_KEY_VAR, "   ")]),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config = config_from(&[(API_KEY_VAR, "secret")]).expect("config should load");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.model, "gemini-2.5-pro-exp-03-25");
        assert_eq!(config.workspace_dir, PathBuf::from("workspace"));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn overrides_are_honored() {
        let config = config_from(&[
            (API_KEY_VAR, "secret"),
            (MODEL_VAR, "gemini-2.5-flash"),
            (WORKSPACE_VAR, "/tmp/site"),
            (TIMEOUT_VAR, "30"),
        ])
        .expect("config should load");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.workspace_dir, PathBuf::from("/tmp/site"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        for raw in ["soon", "0", "-5"] {
            let error = config_from(&[(API_KEY_VAR, "secret"), (TIMEOUT_VAR, raw)])
                .expect_err("timeout should be rejected");
            assert!(error.to_string().contains(TIMEOUT_VAR));
        }
    }
}
