//! Typed widget events
//!
//! The widget hands us an event name and a loosely shaped JSON payload.
//! Everything past `WidgetEvent::decode` works with these variants only.

use super::RawEvent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Failure to turn a raw widget event into a `WidgetEvent`
#[derive(Debug, Error)]
#[error("Malformed '{name}' payload: {source}")]
pub struct EventDecodeError {
    pub name: String,
    #[source]
    pub source: serde_json::Error,
}

/// A participant waiting in the lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockingParticipant {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Events the session controller reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// The local participant entered the conference
    ConferenceJoined {
        room_name: String,
        local_id: Option<String>,
        display_name: Option<String>,
    },
    /// The local participant is out of the conference
    ConferenceLeft { room_name: Option<String> },
    ParticipantJoined {
        id: String,
        display_name: Option<String>,
    },
    ParticipantLeft { id: String },
    AudioMuteStatusChanged { muted: bool },
    VideoMuteStatusChanged { muted: bool },
    ScreenSharingStatusChanged { on: bool },
    KnockingParticipant(KnockingParticipant),
    /// Someone was removed from the conference; `local` is true when it was us
    ParticipantKickedOut { id: String, local: bool },
    PasswordRequired,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinedPayload {
    #[serde(default)]
    room_name: String,
    id: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeftPayload {
    room_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantPayload {
    id: String,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct MutedPayload {
    muted: bool,
}

#[derive(Deserialize)]
struct SharingPayload {
    on: bool,
}

#[derive(Deserialize)]
struct KnockingPayload {
    participant: KnockingParticipant,
}

#[derive(Deserialize)]
struct KickedPayload {
    kicked: KickedParticipant,
}

#[derive(Deserialize)]
struct KickedParticipant {
    id: String,
    #[serde(default)]
    local: bool,
}

fn payload<T: DeserializeOwned>(name: &str, value: &serde_json::Value) -> Result<T, EventDecodeError> {
    // Widgets send `undefined` for events without data
    let value = if value.is_null() { json!({}) } else { value.clone() };
    serde_json::from_value(value).map_err(|source| EventDecodeError {
        name: name.to_string(),
        source,
    })
}

impl WidgetEvent {
    /// Decode a raw event.
    ///
    /// Returns `Ok(None)` for events the controller does not subscribe to.
    pub fn decode(raw: &RawEvent) -> Result<Option<Self>, EventDecodeError> {
        let name = raw.name.as_str();
        let value = &raw.payload;

        let event = match name {
            "videoConferenceJoined" | "conferenceJoined" => {
                let p: JoinedPayload = payload(name, value)?;
                WidgetEvent::ConferenceJoined {
                    room_name: p.room_name,
                    local_id: p.id,
                    display_name: p.display_name,
                }
            }
            "videoConferenceLeft" | "conferenceLeft" => {
                let p: LeftPayload = payload(name, value)?;
                WidgetEvent::ConferenceLeft {
                    room_name: p.room_name,
                }
            }
            "participantJoined" => {
                let p: ParticipantPayload = payload(name, value)?;
                WidgetEvent::ParticipantJoined {
                    id: p.id,
                    display_name: p.display_name,
                }
            }
            "participantLeft" => {
                let p: ParticipantPayload = payload(name, value)?;
                WidgetEvent::ParticipantLeft { id: p.id }
            }
            "audioMuteStatusChanged" => {
                let p: MutedPayload = payload(name, value)?;
                WidgetEvent::AudioMuteStatusChanged { muted: p.muted }
            }
            "videoMuteStatusChanged" => {
                let p: MutedPayload = payload(name, value)?;
                WidgetEvent::VideoMuteStatusChanged { muted: p.muted }
            }
            "screenSharingStatusChanged" => {
                let p: SharingPayload = payload(name, value)?;
                WidgetEvent::ScreenSharingStatusChanged { on: p.on }
            }
            "knockingParticipant" => {
                let p: KnockingPayload = payload(name, value)?;
                WidgetEvent::KnockingParticipant(p.participant)
            }
            "participantKickedOut" => {
                let p: KickedPayload = payload(name, value)?;
                WidgetEvent::ParticipantKickedOut {
                    id: p.kicked.id,
                    local: p.kicked.local,
                }
            }
            "passwordRequired" => WidgetEvent::PasswordRequired,
            _ => return Ok(None),
        };

        Ok(Some(event))
    }

    /// Event name as the widget emits it
    pub fn name(&self) -> &'static str {
        match self {
            WidgetEvent::ConferenceJoined { .. } => "videoConferenceJoined",
            WidgetEvent::ConferenceLeft { .. } => "videoConferenceLeft",
            WidgetEvent::ParticipantJoined { .. } => "participantJoined",
            WidgetEvent::ParticipantLeft { .. } => "participantLeft",
            WidgetEvent::AudioMuteStatusChanged { .. } => "audioMuteStatusChanged",
            WidgetEvent::VideoMuteStatusChanged { .. } => "videoMuteStatusChanged",
            WidgetEvent::ScreenSharingStatusChanged { .. } => "screenSharingStatusChanged",
            WidgetEvent::KnockingParticipant(_) => "knockingParticipant",
            WidgetEvent::ParticipantKickedOut { .. } => "participantKickedOut",
            WidgetEvent::PasswordRequired => "passwordRequired",
        }
    }

    /// Encode back into the widget's wire shape
    pub fn to_raw(&self) -> RawEvent {
        let payload = match self {
            WidgetEvent::ConferenceJoined {
                room_name,
                local_id,
                display_name,
            } => json!({ "roomName": room_name, "id": local_id, "displayName": display_name }),
            WidgetEvent::ConferenceLeft { room_name } => json!({ "roomName": room_name }),
            WidgetEvent::ParticipantJoined { id, display_name } => {
                json!({ "id": id, "displayName": display_name })
            }
            WidgetEvent::ParticipantLeft { id } => json!({ "id": id }),
            WidgetEvent::AudioMuteStatusChanged { muted }
            | WidgetEvent::VideoMuteStatusChanged { muted } => json!({ "muted": muted }),
            WidgetEvent::ScreenSharingStatusChanged { on } => json!({ "on": on }),
            WidgetEvent::KnockingParticipant(participant) => json!({ "participant": participant }),
            WidgetEvent::ParticipantKickedOut { id, local } => {
                json!({ "kicked": { "id": id, "local": local } })
            }
            WidgetEvent::PasswordRequired => json!({}),
        };

        RawEvent {
            name: self.name().to_string(),
            payload,
        }
    }
}
