mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::DeskbotError;
use defaults::*;

/// Top-level Deskbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub deskbot: DeskbotConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskbotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DeskbotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// HTTP API server config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Bearer token for API authentication. Empty = no auth (for local-only use).
    #[serde(default)]
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            api_key: String::new(),
        }
    }
}

/// What happens to messages the local parser does not recognize.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownIntentPolicy {
    /// Reply with the fixed "cannot help" message.
    #[default]
    Reject,
    /// Hand the text to the AI classifier.
    Classify,
}

/// Confirmation dispatcher settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub unknown_intent: UnknownIntentPolicy,
    /// Seconds after which an unanswered confirmation is discarded.
    /// Unset = pending confirmations never expire.
    #[serde(default)]
    pub pending_ttl_secs: Option<u64>,
}

/// Endpoints and call bounds for external services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// Upper bound on any single collaborator call. A timeout is a failure.
    #[serde(default = "default_collaborator_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_directory_url")]
    pub directory_url: String,
    #[serde(default = "default_mailer_url")]
    pub mailer_url: String,
    #[serde(default = "default_ai_gateway_url")]
    pub ai_gateway_url: String,
    #[serde(default = "default_search_url")]
    pub search_url: String,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_collaborator_timeout_secs(),
            directory_url: default_directory_url(),
            mailer_url: default_mailer_url(),
            ai_gateway_url: default_ai_gateway_url(),
            search_url: default_search_url(),
        }
    }
}

/// Classifier conversation retention.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Oldest entries are dropped past this length. 0 = unbounded.
    #[serde(default)]
    pub max_messages_per_conversation: usize,
}

/// Generated report files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_reports_dir")]
    pub dir: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: default_reports_dir(),
        }
    }
}

/// SQLite audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_audit_db_path")]
    pub db_path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: default_audit_db_path(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, DeskbotError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| DeskbotError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    parse(&content)
}

/// Parse configuration from TOML text.
pub fn parse(content: &str) -> Result<Config, DeskbotError> {
    toml::from_str(content)
        .map_err(|e| DeskbotError::Config(format!("failed to parse config: {}", e)))
}
