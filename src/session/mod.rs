//! Conference session - configuration, observable state and lifecycle

mod controller;

pub use controller::{SessionController, SessionInput, StartOutcome};

use crate::widget::{KnockingParticipant, LoadFailure, WidgetError, WidgetSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Display name used when none was supplied
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// Problems with the parameters a session was started with
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Room identifier is missing")]
    MissingRoomId,
}

/// Errors returned by session commands
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No conference session is active")]
    NotStarted,

    #[error("Conference widget failed to load: {0}")]
    Load(#[from] LoadFailure),

    #[error(transparent)]
    Widget(#[from] WidgetError),
}

/// Parameters for one session, fixed for its lifetime.
///
/// Only built through `SessionConfig::new`, so the display name is always
/// normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    room_id: String,
    display_name: String,
    is_moderator: bool,
}

impl SessionConfig {
    /// Blank display names fall back to `DEFAULT_DISPLAY_NAME`.
    ///
    /// The room id is not checked here; `SessionController::start` refuses
    /// to start without one.
    pub fn new(room_id: impl Into<String>, display_name: Option<String>, is_moderator: bool) -> Self {
        let display_name = display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        Self {
            room_id: room_id.into(),
            display_name,
            is_moderator,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_moderator(&self) -> bool {
        self.is_moderator
    }

    /// Check the room identifier
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room_id.trim().is_empty() {
            return Err(ConfigError::MissingRoomId);
        }
        Ok(())
    }
}

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Widget is being constructed, or failed to load
    Initializing,
    /// In the lobby, waiting for a moderator
    WaitingForApproval,
    /// In the conference
    Joined,
    /// Session is over
    Left,
}

impl SessionPhase {
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionPhase::Left)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Initializing => "connecting",
            SessionPhase::WaitingForApproval => "waiting for approval",
            SessionPhase::Joined => "in conference",
            SessionPhase::Left => "left",
        }
    }
}

/// State observed by the control surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub audio_muted: bool,
    pub video_muted: bool,
    pub screen_sharing: bool,

    /// Participants in the conference, counting ourselves
    pub participant_count: u32,

    /// Lobby guests awaiting a manual decision
    pub knocking: Vec<KnockingParticipant>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Initializing,
            audio_muted: false,
            video_muted: false,
            screen_sharing: false,
            participant_count: 1,
            knocking: Vec::new(),
        }
    }
}

/// What a moderator does with lobby guests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyPolicy {
    /// Admit every guest after `delay`
    AutoApprove { delay: Duration },
    /// Hold guests until `SessionController::answer_knocking` is called
    Manual,
}

impl Default for LobbyPolicy {
    fn default() -> Self {
        LobbyPolicy::AutoApprove {
            delay: Duration::from_millis(1000),
        }
    }
}

/// Controller behavior shared by every session it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub widget: WidgetSettings,
    pub lobby: LobbyPolicy,

    /// Moderators submit an empty room password when joining or when asked
    pub submit_moderator_password: bool,

    /// Pin our own video once joined
    pub pin_self_on_join: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            widget: WidgetSettings::default(),
            lobby: LobbyPolicy::default(),
            submit_moderator_password: true,
            pin_self_on_join: true,
        }
    }
}

/// One-shot signals for whoever hosts the session view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// Session was not started; go back to the home view
    Redirect { reason: ConfigError },
    /// Widget could not be constructed; session is stuck initializing
    LoadFailed(LoadFailure),
    /// Local participant entered the conference
    Joined,
    /// A guest is waiting in the lobby for a manual decision
    Knocking(KnockingParticipant),
    /// Session ended; leave the conference view
    NavigateAway,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_display_name_becomes_anonymous() {
        for name in [None, Some(String::new()), Some("   ".to_string())] {
            let config = SessionConfig::new("r", name, false);
            assert_eq!(config.display_name(), DEFAULT_DISPLAY_NAME);
        }
    }

    #[test]
    fn display_name_is_trimmed() {
        let config = SessionConfig::new("r", Some("  Ann ".into()), true);
        assert_eq!(config.display_name(), "Ann");

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["display_name"], "Ann");
    }

    #[test]
    fn whitespace_room_id_is_missing() {
        let config = SessionConfig::new("  ", None, false);
        assert_eq!(config.validate(), Err(ConfigError::MissingRoomId));
        assert!(SessionConfig::new("room-001", None, false).validate().is_ok());
    }
}
