//! Navigation - routes between the home view and conference rooms
//!
//! A conference view is reached through `/room/{roomId}?name=..&moderator=true`.

use crate::session::SessionConfig;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::{Position, Url};
use uuid::Uuid;

static ROOM_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/room/(?P<room_id>[^/]*)/?$").unwrap());

/// Base used to resolve relative navigation targets
const BASE_URL: &str = "http://localhost/";

/// Parameters carried by a conference route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationParams {
    /// Decoded path segment; may be empty when the link was malformed
    pub room_id: String,
    /// `name` query parameter
    pub name: Option<String>,
    /// `moderator=true`
    pub moderator: bool,
}

impl NavigationParams {
    pub fn new(room_id: impl Into<String>, name: Option<String>, moderator: bool) -> Self {
        Self {
            room_id: room_id.into(),
            name,
            moderator,
        }
    }

    /// Session configuration these parameters describe
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.room_id.clone(), self.name.clone(), self.moderator)
    }

    /// Path-and-query link to the room
    pub fn to_path(&self) -> String {
        Route::Room(self.clone()).to_path()
    }
}

/// A navigation target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    Home,
    Room(NavigationParams),
    NotFound(String),
}

impl Route {
    /// Parse a path with optional query, e.g. `/room/abc?name=Ann`
    pub fn parse(target: &str) -> Route {
        let Ok(base) = Url::parse(BASE_URL) else {
            return Route::NotFound(target.to_string());
        };
        let url = match base.join(target.trim()) {
            Ok(url) => url,
            Err(_) => return Route::NotFound(target.to_string()),
        };

        let path = url.path();
        if path == "/" {
            return Route::Home;
        }

        let Some(caps) = ROOM_PATH_RE.captures(path) else {
            return Route::NotFound(path.to_string());
        };
        // Path segments stay percent-encoded in `Url`
        let room_id = caps
            .name("room_id")
            .map(|m| percent_decode_str(m.as_str()).decode_utf8_lossy().into_owned())
            .unwrap_or_default();

        let mut name = None;
        let mut moderator = false;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "name" => name = Some(value.into_owned()),
                "moderator" => moderator = value == "true",
                _ => {}
            }
        }

        Route::Room(NavigationParams {
            room_id,
            name,
            moderator,
        })
    }

    /// Render the route as a path-and-query string
    pub fn to_path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::NotFound(path) => path.clone(),
            Route::Room(params) => {
                let Ok(mut url) = Url::parse(BASE_URL) else {
                    return format!("/room/{}", params.room_id);
                };
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.clear().push("room").push(&params.room_id);
                }
                {
                    let mut query = url.query_pairs_mut();
                    query.append_pair(
                        "name",
                        params
                            .name
                            .as_deref()
                            .unwrap_or(crate::session::DEFAULT_DISPLAY_NAME),
                    );
                    if params.moderator {
                        query.append_pair("moderator", "true");
                    }
                }
                url[Position::BeforePath..].to_string()
            }
        }
    }
}

/// Fresh identifier for an ad-hoc room
pub fn generate_room_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
