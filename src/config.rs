//! Configuration types for Tabrec

use serde::{Deserialize, Serialize};

use crate::sanitize::DEFAULT_REDACTED_HEADERS;
use crate::{Result, TabrecError};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Time budget for one remote property fetch, in milliseconds
    #[serde(default = "default_property_fetch_timeout_ms")]
    pub property_fetch_timeout_ms: u64,
    /// Header redaction configuration
    #[serde(default)]
    pub redaction: RedactionConfig,
    /// Buffer caps
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            property_fetch_timeout_ms: default_property_fetch_timeout_ms(),
            redaction: RedactionConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_property_fetch_timeout_ms() -> u64 {
    2000
}

/// Header redaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Header names stripped from captured request/response headers
    pub headers: Vec<String>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            headers: DEFAULT_REDACTED_HEADERS
                .iter()
                .map(|header| (*header).to_string())
                .collect(),
        }
    }
}

/// Buffer caps; events beyond a cap are dropped with a warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum console log entries per session
    pub max_console_entries: usize,
    /// Maximum finalized network records per session
    pub max_network_entries: usize,
    /// Maximum user actions per session
    pub max_user_actions: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_console_entries: 5000,
            max_network_entries: 5000,
            max_user_actions: 2000,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TabrecError::Config(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| TabrecError::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.property_fetch_timeout_ms == 0 {
            return Err(TabrecError::Config(
                "property_fetch_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.limits.max_console_entries == 0 {
            return Err(TabrecError::Config(
                "max_console_entries must be > 0".to_string(),
            ));
        }

        if self.limits.max_network_entries == 0 {
            return Err(TabrecError::Config(
                "max_network_entries must be > 0".to_string(),
            ));
        }

        if self.limits.max_user_actions == 0 {
            return Err(TabrecError::Config(
                "max_user_actions must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
