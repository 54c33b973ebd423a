//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Robot account configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "HROBOT")]
pub struct RobotConfig {
    /// Robot webservice user. This value is required.
    pub username: String,
    /// Robot webservice password. This value is required.
    pub password: String,
    /// Base URL of the structured API.
    #[ortho_config(default = "https://robot-ws.your-server.de".to_owned())]
    pub api_base_url: String,
    /// Base URL of the web control panel used for scraping.
    #[ortho_config(default = "https://robot.your-server.de".to_owned())]
    pub panel_base_url: String,
    /// Per-request timeout in seconds.
    #[ortho_config(default = 60)]
    pub timeout_secs: u64,
}

impl RobotConfig {
    fn require_field(value: &str, description: &str, env_var: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {description}: set {env_var} or add it to hrobot.toml"
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags
    /// in that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge
    /// sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Ok(Self::load()?)
    }

    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Ok(Self::load_from_iter([std::ffi::OsString::from("hrobot")])?)
    }

    /// Performs semantic validation on required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is
    /// empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(&self.username, "robot user", "HROBOT_USERNAME")?;
        Self::require_field(&self.password, "robot password", "HROBOT_PASSWORD")?;
        Self::require_field(&self.api_base_url, "API base URL", "HROBOT_API_BASE_URL")?;
        Self::require_field(
            &self.panel_base_url,
            "panel base URL",
            "HROBOT_PANEL_BASE_URL",
        )?;
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<std::sync::Arc<ortho_config::OrthoError>> for ConfigError {
    fn from(value: std::sync::Arc<ortho_config::OrthoError>) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RobotConfig};

    fn base_config() -> RobotConfig {
        RobotConfig {
            username: String::from("robot-user"),
            password: String::from("robot-pass"),
            api_base_url: String::from("https://robot-ws.your-server.de"),
            panel_base_url: String::from("https://robot.your-server.de"),
            timeout_secs: 60,
        }
    }

    #[test]
    fn validate_accepts_a_complete_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_credentials() {
        for field in ["username", "password"] {
            let mut cfg = base_config();
            match field {
                "username" => cfg.username = String::from("  "),
                _ => cfg.password = String::new(),
            }
            let err = cfg.validate().expect_err("blank credential");
            assert!(matches!(err, ConfigError::MissingField(_)));
        }
    }
}
