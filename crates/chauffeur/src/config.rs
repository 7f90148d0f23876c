//! Application configuration loaded from a TOML file.
//!
//! A default file is written on first run so the knobs are discoverable;
//! CLI flags override individual values afterwards.

use chauffeur_agent::connection::ConnectConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// The longest school tag the server will accept.
const MAX_SCHOOL_LEN: usize = 11;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub agent: AgentSettings,
    pub server: ServerSettings,
    pub reconnect: ReconnectSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Display name shown to the other players.
    pub name: String,
    /// School tag, at most 11 characters.
    pub school: String,
    /// Optional 32x32 PNG avatar sent with the join request.
    pub avatar_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// WebSocket URL of the game server.
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectSettings {
    /// Delay before the second connection attempt.
    pub initial_delay_ms: u64,
    /// Added to the delay after every further failure.
    pub delay_step_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent: AgentSettings {
                name: "Rust Valet".to_string(),
                school: "Ferris U".to_string(),
                avatar_path: None,
            },
            server: ServerSettings {
                address: "ws://127.0.0.1:8080".to_string(),
            },
            reconnect: ReconnectSettings {
                initial_delay_ms: 500,
                delay_step_ms: 500,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from file, writing a default one when missing.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.agent.name.trim().is_empty() {
            return Err("agent name cannot be empty".to_string());
        }
        if self.agent.school.chars().count() > MAX_SCHOOL_LEN {
            return Err(format!(
                "school tag `{}` is longer than {MAX_SCHOOL_LEN} characters",
                self.agent.school
            ));
        }
        if !self.server.address.starts_with("ws://") && !self.server.address.starts_with("wss://")
        {
            return Err(format!(
                "server address `{}` must be a ws:// or wss:// URL",
                self.server.address
            ));
        }
        if self.reconnect.delay_step_ms == 0 {
            return Err("reconnect delay step must be positive".to_string());
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            ));
        }
        Ok(())
    }

    /// Convert to the connection manager's settings, reading the avatar
    /// bytes if configured. A missing avatar is not fatal; we just join
    /// without one.
    pub fn to_connect_config(&self) -> ConnectConfig {
        let avatar = self.agent.avatar_path.as_ref().and_then(|path| {
            match std::fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("could not read avatar {}: {e}", path.display());
                    None
                }
            }
        });
        ConnectConfig {
            server_url: self.server.address.clone(),
            name: self.agent.name.clone(),
            school: self.agent.school.clone(),
            language: "Rust".to_string(),
            avatar,
            backoff_start: Duration::from_millis(self.reconnect.initial_delay_ms),
            backoff_step: Duration::from_millis(self.reconnect.delay_step_ms),
        }
    }
}
