use crate::session::{SessionConfig, SessionNotice, SessionPhase, SessionState};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};

/// Control surface actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleAudio,
    ToggleVideo,
    ToggleScreenShare,
    ToggleChat,
    ApproveKnocking,
    RejectKnocking,
    Leave,
}

/// Map a key press to an action
pub fn action_for_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Leave);
    }

    match key.code {
        KeyCode::Char('m') => Some(Action::ToggleAudio),
        KeyCode::Char('v') => Some(Action::ToggleVideo),
        KeyCode::Char('s') => Some(Action::ToggleScreenShare),
        KeyCode::Char('c') => Some(Action::ToggleChat),
        KeyCode::Char('a') => Some(Action::ApproveKnocking),
        KeyCode::Char('r') => Some(Action::RejectKnocking),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Leave),
        _ => None,
    }
}

pub struct Notification {
    pub message: String,
    pub timestamp: Instant,
    pub duration: Duration,
}

/// What the surface shows
pub struct SurfaceApp {
    pub room_id: String,
    pub display_name: String,
    pub is_moderator: bool,
    pub session: SessionState,
    pub notifications: Vec<Notification>,
}

impl SurfaceApp {
    pub fn new(config: &SessionConfig, session: SessionState) -> Self {
        Self {
            room_id: config.room_id().to_string(),
            display_name: config.display_name().to_string(),
            is_moderator: config.is_moderator(),
            session,
            notifications: Vec::new(),
        }
    }

    pub fn add_notification(&mut self, message: String, duration: Duration) {
        self.notifications.push(Notification {
            message,
            timestamp: Instant::now(),
            duration,
        });
    }

    pub fn expire_notifications(&mut self) {
        let now = Instant::now();
        self.notifications
            .retain(|n| now.duration_since(n.timestamp) < n.duration);
    }

    /// Record a notice; returns true when the view should close
    pub fn on_notice(&mut self, notice: SessionNotice) -> bool {
        match notice {
            SessionNotice::Redirect { reason } => {
                self.add_notification(reason.to_string(), Duration::from_secs(3));
                true
            }
            SessionNotice::LoadFailed(failure) => {
                self.add_notification(
                    format!("{} - reload to retry", failure),
                    Duration::from_secs(3600),
                );
                false
            }
            SessionNotice::Joined => {
                self.add_notification("Joined the conference".to_string(), Duration::from_secs(3));
                false
            }
            SessionNotice::Knocking(guest) => {
                self.add_notification(
                    format!("{} is waiting in the lobby (a/r)", guest.name),
                    Duration::from_secs(5),
                );
                false
            }
            SessionNotice::NavigateAway => true,
        }
    }

    pub fn phase_label(&self) -> &'static str {
        self.session.phase.label()
    }

    pub fn is_waiting(&self) -> bool {
        matches!(
            self.session.phase,
            SessionPhase::Initializing | SessionPhase::WaitingForApproval
        )
    }
}
