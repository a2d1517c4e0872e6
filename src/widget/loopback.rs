//! Loopback widget - an in-process stand-in for the conferencing backend
//!
//! It joins immediately, answers every media toggle with the matching
//! status event and admits approved lobby guests. Used by the CLI when no
//! real backend is attached.

use super::{
    EventSink, KnockingParticipant, LoadFailure, ParticipantInfo, Widget, WidgetCommand,
    WidgetError, WidgetEvent, WidgetLoader, WidgetOptions,
};
use uuid::Uuid;

/// Builds `LoopbackWidget`s
#[derive(Debug, Default, Clone)]
pub struct LoopbackLoader {
    /// Guests that knock on the lobby right after the conference is joined
    knocking: Vec<String>,
}

impl LoopbackLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Have the given guests knock once the local participant has joined
    pub fn with_knocking(mut self, guests: impl IntoIterator<Item = String>) -> Self {
        self.knocking.extend(guests);
        self
    }
}

impl WidgetLoader for LoopbackLoader {
    type Widget = LoopbackWidget;

    fn load(
        &mut self,
        domain: &str,
        options: &WidgetOptions,
        events: EventSink,
    ) -> Result<LoopbackWidget, LoadFailure> {
        if options.room_name.is_empty() {
            return Err(LoadFailure::Rejected("room name is empty".to_string()));
        }

        let local_id = short_participant_id();
        tracing::info!(
            "Loopback widget joining '{}' on {} as '{}'",
            options.room_name,
            domain,
            options.user_info.display_name
        );

        events.emit_event(&WidgetEvent::ConferenceJoined {
            room_name: options.room_name.clone(),
            local_id: Some(local_id.clone()),
            display_name: Some(options.user_info.display_name.clone()),
        });

        for guest in &self.knocking {
            events.emit_event(&WidgetEvent::KnockingParticipant(KnockingParticipant {
                id: short_participant_id(),
                name: guest.clone(),
            }));
        }

        Ok(LoopbackWidget {
            events,
            room_name: options.room_name.clone(),
            local_id,
            display_name: options.user_info.display_name.clone(),
            audio_muted: options.config_overwrite.start_with_audio_muted,
            video_muted: options.config_overwrite.start_with_video_muted,
            sharing: false,
            pinned: None,
            disposed: false,
        })
    }
}

/// Widget that echoes commands back as events
#[derive(Debug)]
pub struct LoopbackWidget {
    events: EventSink,
    room_name: String,
    local_id: String,
    display_name: String,
    audio_muted: bool,
    video_muted: bool,
    sharing: bool,
    pinned: Option<String>,
    disposed: bool,
}

impl LoopbackWidget {
    /// Participant currently pinned on stage
    pub fn pinned(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<(), WidgetError> {
        if self.disposed {
            return Err(WidgetError::Disposed);
        }
        Ok(())
    }
}

impl Widget for LoopbackWidget {
    fn execute_command(&mut self, command: WidgetCommand) -> Result<(), WidgetError> {
        self.ensure_live()?;
        tracing::debug!("Loopback widget executing '{}'", command.name());

        match command {
            WidgetCommand::ToggleAudio => {
                self.audio_muted = !self.audio_muted;
                self.events.emit_event(&WidgetEvent::AudioMuteStatusChanged {
                    muted: self.audio_muted,
                });
            }
            WidgetCommand::ToggleVideo => {
                self.video_muted = !self.video_muted;
                self.events.emit_event(&WidgetEvent::VideoMuteStatusChanged {
                    muted: self.video_muted,
                });
            }
            WidgetCommand::ToggleShareScreen => {
                self.sharing = !self.sharing;
                self.events
                    .emit_event(&WidgetEvent::ScreenSharingStatusChanged { on: self.sharing });
            }
            WidgetCommand::Hangup => {
                self.events.emit_event(&WidgetEvent::ConferenceLeft {
                    room_name: Some(self.room_name.clone()),
                });
            }
            WidgetCommand::AnswerKnockingParticipant { id, approved } => {
                if approved {
                    self.events.emit_event(&WidgetEvent::ParticipantJoined {
                        id,
                        display_name: None,
                    });
                }
            }
            WidgetCommand::ToggleChat | WidgetCommand::Password(_) => {}
        }

        Ok(())
    }

    async fn participants_info(&mut self) -> Result<Vec<ParticipantInfo>, WidgetError> {
        self.ensure_live()?;
        Ok(vec![ParticipantInfo {
            participant_id: self.local_id.clone(),
            display_name: self.display_name.clone(),
            formatted_display_name: format!("{} (me)", self.display_name),
        }])
    }

    fn pin_participant(&mut self, participant_id: &str) -> Result<(), WidgetError> {
        self.ensure_live()?;
        self.pinned = Some(participant_id.to_string());
        Ok(())
    }

    fn dispose(&mut self) {
        if !self.disposed {
            tracing::info!("Loopback widget for '{}' disposed", self.room_name);
        }
        self.disposed = true;
    }
}

fn short_participant_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
