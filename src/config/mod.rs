//! Configuration management

use crate::session::{LobbyPolicy, SessionSettings};
use crate::widget::WidgetSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub widget: WidgetSettings,
    pub lobby: LobbyConfig,
    pub moderator: ModeratorConfig,
    pub storage: StorageConfig,
}

/// How moderators treat guests waiting in the lobby
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LobbyMode {
    #[default]
    AutoApprove,
    Manual,
}

/// Lobby settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    pub policy: LobbyMode,

    /// Delay before an auto-approved guest is admitted
    pub approval_delay_ms: u64,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            policy: LobbyMode::AutoApprove,
            approval_delay_ms: 1000,
        }
    }
}

/// Moderator behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeratorConfig {
    /// Submit an empty room password to get past lobby gating
    pub submit_empty_password: bool,

    /// Pin our own video after joining
    pub pin_self_on_join: bool,
}

impl Default for ModeratorConfig {
    fn default() -> Self {
        Self {
            submit_empty_password: true,
            pin_self_on_join: true,
        }
    }
}

/// Where the room directory lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, or return defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("videomeet")
            .join("config.toml")
    }

    /// Get the directory holding persisted rooms
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("videomeet")))
            .unwrap_or_else(|| PathBuf::from(".videomeet"))
    }

    /// Settings for the session controller
    pub fn session_settings(&self) -> SessionSettings {
        let lobby = match self.lobby.policy {
            LobbyMode::AutoApprove => LobbyPolicy::AutoApprove {
                delay: Duration::from_millis(self.lobby.approval_delay_ms),
            },
            LobbyMode::Manual => LobbyPolicy::Manual,
        };

        SessionSettings {
            widget: self.widget.clone(),
            lobby,
            submit_moderator_password: self.moderator.submit_empty_password,
            pin_self_on_join: self.moderator.pin_self_on_join,
        }
    }
}
