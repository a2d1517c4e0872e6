//! Widget construction options

use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Highest video resolution the widget may be asked for
pub const MAX_RESOLUTION: u32 = 720;

/// Buttons shown when the widget's own toolbar is enabled
const NATIVE_TOOLBAR_BUTTONS: &[&str] = &[
    "microphone",
    "camera",
    "desktop",
    "chat",
    "raisehand",
    "participants-pane",
    "tileview",
    "fullscreen",
    "videoquality",
    "settings",
    "security",
    "hangup",
];

/// How widgets are built for every session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    /// Conferencing backend domain
    pub domain: String,

    /// Where the widget's script is fetched from
    pub script_url: String,

    /// Container the widget is mounted into
    pub parent_node: String,

    /// Show the widget's own toolbar instead of relying on the control surface
    pub native_controls: bool,

    /// Upper bound for requested video height, clamped to `MAX_RESOLUTION`
    pub max_resolution: u32,

    /// Lower bound for requested video height
    pub min_resolution: u32,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            domain: "meet.ffmuc.net".to_string(),
            script_url: "https://meet.jit.si/external_api.js".to_string(),
            parent_node: "conference".to_string(),
            native_controls: false,
            max_resolution: MAX_RESOLUTION,
            min_resolution: 240,
        }
    }
}

impl WidgetSettings {
    /// Effective resolution cap
    pub fn resolution(&self) -> u32 {
        self.max_resolution.min(MAX_RESOLUTION)
    }
}

/// Options object handed to the widget constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOptions {
    pub room_name: String,
    pub width: String,
    pub height: String,
    pub parent_node: String,
    pub user_info: UserInfo,
    pub config_overwrite: ConfigOverwrite,
    pub interface_config_overwrite: InterfaceConfigOverwrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverwrite {
    pub prejoin_page_enabled: bool,
    pub start_with_audio_muted: bool,
    pub start_with_video_muted: bool,
    pub enable_welcome_page: bool,
    pub disable_prejoin_audio_preview: bool,
    pub enable_lobby: bool,
    pub resolution: u32,
    pub constraints: VideoConstraints,
}

/// `{ video: { height: { ideal, max, min } } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub video: VideoConstraint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConstraint {
    pub height: HeightRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightRange {
    pub ideal: u32,
    pub max: u32,
    pub min: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct InterfaceConfigOverwrite {
    pub toolbar_buttons: Vec<String>,
    pub toolbar_always_visible: bool,
    pub show_jitsi_watermark: bool,
    pub show_brand_watermark: bool,
    pub show_watermark_for_guests: bool,
}

impl InterfaceConfigOverwrite {
    fn new(native_controls: bool) -> Self {
        let toolbar_buttons = if native_controls {
            NATIVE_TOOLBAR_BUTTONS.iter().map(|b| b.to_string()).collect()
        } else {
            Vec::new()
        };

        Self {
            toolbar_buttons,
            toolbar_always_visible: native_controls,
            show_jitsi_watermark: false,
            show_brand_watermark: false,
            show_watermark_for_guests: false,
        }
    }
}

impl WidgetOptions {
    /// Options for joining the room described by `config`
    pub fn for_session(config: &SessionConfig, settings: &WidgetSettings) -> Self {
        let resolution = settings.resolution();
        let min = settings.min_resolution.min(resolution);

        Self {
            room_name: config.room_id().to_string(),
            width: "100%".to_string(),
            height: "100%".to_string(),
            parent_node: settings.parent_node.clone(),
            user_info: UserInfo {
                display_name: config.display_name().to_string(),
            },
            config_overwrite: ConfigOverwrite {
                prejoin_page_enabled: false,
                start_with_audio_muted: false,
                start_with_video_muted: false,
                enable_welcome_page: false,
                disable_prejoin_audio_preview: true,
                // Guests queue in the lobby; moderators bypass it
                enable_lobby: true,
                resolution,
                constraints: VideoConstraints {
                    video: VideoConstraint {
                        height: HeightRange {
                            ideal: resolution,
                            max: resolution,
                            min,
                        },
                    },
                },
            },
            interface_config_overwrite: InterfaceConfigOverwrite::new(settings.native_controls),
        }
    }
}
