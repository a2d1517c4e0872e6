//! External conferencing widget contract
//!
//! The widget does the actual media transport. All we see of it is a
//! constructor (`WidgetLoader`), a command/query handle (`Widget`) and a
//! stream of named events pushed into an `EventSink`.

mod event;
pub mod loopback;
mod options;

pub use event::{EventDecodeError, KnockingParticipant, WidgetEvent};
pub use options::{
    ConfigOverwrite, HeightRange, InterfaceConfigOverwrite, UserInfo, VideoConstraint,
    VideoConstraints, WidgetOptions, WidgetSettings, MAX_RESOLUTION,
};

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;

/// Reasons the widget could not be constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    #[error("Widget script could not be loaded from {url}")]
    ScriptUnavailable { url: String },

    #[error("Widget entry point is not available")]
    EntryPointMissing,

    #[error("Widget rejected construction: {0}")]
    Rejected(String),
}

/// Errors reported by a live widget handle
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("Widget has been disposed")]
    Disposed,

    #[error("Widget command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Participant query failed: {0}")]
    QueryFailed(String),
}

/// Commands accepted by `Widget::execute_command`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetCommand {
    ToggleAudio,
    ToggleVideo,
    ToggleShareScreen,
    ToggleChat,
    Hangup,
    /// Submit a room password (moderators use an empty one to pass lobby gating)
    Password(String),
    AnswerKnockingParticipant { id: String, approved: bool },
}

impl WidgetCommand {
    /// Name of the command as the widget knows it
    pub fn name(&self) -> &'static str {
        match self {
            WidgetCommand::ToggleAudio => "toggleAudio",
            WidgetCommand::ToggleVideo => "toggleVideo",
            WidgetCommand::ToggleShareScreen => "toggleShareScreen",
            WidgetCommand::ToggleChat => "toggleChat",
            WidgetCommand::Hangup => "hangup",
            WidgetCommand::Password(_) => "password",
            WidgetCommand::AnswerKnockingParticipant { .. } => "answerKnockingParticipant",
        }
    }

    /// Positional arguments passed alongside the command name
    pub fn args(&self) -> Vec<serde_json::Value> {
        match self {
            WidgetCommand::Password(password) => vec![password.clone().into()],
            WidgetCommand::AnswerKnockingParticipant { id, approved } => {
                vec![id.clone().into(), (*approved).into()]
            }
            _ => Vec::new(),
        }
    }
}

/// One entry of the widget's participant list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub participant_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub formatted_display_name: String,
}

/// A live widget instance
pub trait Widget: Send {
    /// Fire-and-forget command. Effects come back later as events.
    fn execute_command(&mut self, command: WidgetCommand) -> Result<(), WidgetError>;

    /// Current participant list, including the local participant
    fn participants_info(
        &mut self,
    ) -> impl Future<Output = Result<Vec<ParticipantInfo>, WidgetError>> + Send;

    /// Pin a participant's video on the stage
    fn pin_participant(&mut self, participant_id: &str) -> Result<(), WidgetError>;

    /// Release media and network resources held by the widget
    fn dispose(&mut self);
}

/// The widget's global constructor
pub trait WidgetLoader: Send {
    type Widget: Widget;

    /// Construct a widget joined to `options.room_name` on `domain`.
    ///
    /// The widget reports everything that happens to it through `events`.
    fn load(
        &mut self,
        domain: &str,
        options: &WidgetOptions,
        events: EventSink,
    ) -> Result<Self::Widget, LoadFailure>;
}

/// An untyped event as emitted by the widget
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

/// Input queued for a session controller
#[derive(Debug)]
pub(crate) enum Inbound {
    Widget { generation: u64, event: RawEvent },
    ApprovalDue { generation: u64, participant_id: String },
}

/// Where a widget delivers its events.
///
/// Events keep the order in which they were emitted. Each sink is bound to
/// one session so that events from a disposed widget can be told apart.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    sender: mpsc::UnboundedSender<Inbound>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, sender: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { generation, sender }
    }

    /// Deliver a named event with its payload.
    ///
    /// Returns false once the owning controller is gone.
    pub fn emit(&self, name: impl Into<String>, payload: serde_json::Value) -> bool {
        self.sender
            .send(Inbound::Widget {
                generation: self.generation,
                event: RawEvent {
                    name: name.into(),
                    payload,
                },
            })
            .is_ok()
    }

    /// Deliver an already typed event
    pub fn emit_event(&self, event: &WidgetEvent) -> bool {
        let raw = event.to_raw();
        self.emit(raw.name, raw.payload)
    }
}
