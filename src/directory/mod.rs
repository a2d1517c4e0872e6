//! Room directory - the persisted list of conference rooms
//!
//! The whole collection is read once and written back after every change.
//! There is no locking: two processes editing the same store will overwrite
//! each other.

mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

use crate::navigation::generate_room_id;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store key holding the serialized room collection
pub const ROOMS_KEY: &str = "videomeet_rooms";

/// Capacity given to newly created rooms
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 50;

/// Directory operation errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Room name must not be empty")]
    EmptyName,

    #[error("Room '{0}' not found")]
    NotFound(String),

    #[error("Room '{id}' is full ({max} participants)")]
    Full { id: String, max: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to serialize rooms: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The persisted room collection could not be read back
#[derive(Debug, Error)]
#[error("Stored room collection is unreadable: {0}")]
pub struct StorageParseError(#[from] serde_json::Error);

/// A conference room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    /// User ids, without duplicates
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
}

impl RoomRecord {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

/// Parse a serialized room collection
pub fn decode_rooms(text: &str) -> Result<Vec<RoomRecord>, StorageParseError> {
    Ok(serde_json::from_str(text)?)
}

fn seed_time(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn seed_room(
    id: &str,
    name: &str,
    description: &str,
    created_by: &str,
    created_at: DateTime<Utc>,
    is_active: bool,
    participants: &[&str],
    max_participants: u32,
) -> RoomRecord {
    RoomRecord {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        created_by: created_by.to_string(),
        created_at,
        is_active,
        participants: participants.iter().map(|p| p.to_string()).collect(),
        max_participants: Some(max_participants),
    }
}

/// Rooms used when nothing usable is stored
pub fn seed_rooms() -> Vec<RoomRecord> {
    vec![
        seed_room(
            "room-001",
            "Team Daily Standup",
            "Daily team meeting for project updates",
            "1",
            seed_time(2024, 1, 15, 9, 0),
            true,
            &["1", "2", "3"],
            10,
        ),
        seed_room(
            "room-002",
            "Client Presentation",
            "Quarterly business review with clients",
            "2",
            seed_time(2024, 1, 15, 14, 0),
            false,
            &["2", "4"],
            20,
        ),
        seed_room(
            "room-003",
            "Design Review",
            "UI/UX design review session",
            "3",
            seed_time(2024, 1, 16, 10, 30),
            true,
            &["3", "1"],
            8,
        ),
    ]
}

/// The room list backed by a key-value store
pub struct RoomDirectory<S: KeyValueStore> {
    store: S,
    rooms: Vec<RoomRecord>,
}

impl<S: KeyValueStore> RoomDirectory<S> {
    /// Load rooms from `store`, falling back to the seed rooms when nothing
    /// is stored or the stored collection cannot be parsed
    pub fn load(store: S) -> Self {
        let rooms = match store.get(ROOMS_KEY) {
            Ok(Some(text)) => decode_rooms(&text).unwrap_or_else(|e| {
                tracing::warn!("{}; using seed rooms", e);
                seed_rooms()
            }),
            Ok(None) => seed_rooms(),
            Err(e) => {
                tracing::warn!("Could not read rooms: {}; using seed rooms", e);
                seed_rooms()
            }
        };

        Self { store, rooms }
    }

    /// All rooms in insertion order
    pub fn list(&self) -> &[RoomRecord] {
        &self.rooms
    }

    pub fn get(&self, id: &str) -> Option<&RoomRecord> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// Rooms created by `user_id`
    pub fn owned_by(&self, user_id: &str) -> Vec<&RoomRecord> {
        self.rooms.iter().filter(|r| r.created_by == user_id).collect()
    }

    /// Rooms `user_id` takes part in without having created them
    pub fn joined_by(&self, user_id: &str) -> Vec<&RoomRecord> {
        self.rooms
            .iter()
            .filter(|r| r.created_by != user_id && r.has_participant(user_id))
            .collect()
    }

    /// Create an active room with its creator as the only participant
    pub fn create(
        &mut self,
        name: &str,
        description: Option<&str>,
        creator_id: &str,
    ) -> Result<RoomRecord, DirectoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DirectoryError::EmptyName);
        }

        let mut id = generate_room_id();
        while self.get(&id).is_some() {
            id = generate_room_id();
        }

        let room = RoomRecord {
            id,
            name: name.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            created_by: creator_id.to_string(),
            created_at: Utc::now(),
            is_active: true,
            participants: vec![creator_id.to_string()],
            max_participants: Some(DEFAULT_MAX_PARTICIPANTS),
        };

        self.rooms.push(room.clone());
        self.persist()?;

        tracing::info!("Created room '{}' ({})", room.name, room.id);
        Ok(room)
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> Result<(), DirectoryError> {
        self.room_mut(id)?.is_active = active;
        self.persist()
    }

    /// Flip a room's active flag; returns the new value
    pub fn toggle_active(&mut self, id: &str) -> Result<bool, DirectoryError> {
        let room = self.room_mut(id)?;
        room.is_active = !room.is_active;
        let active = room.is_active;
        self.persist()?;
        Ok(active)
    }

    /// Add `user_id` to a room's participants
    pub fn join(&mut self, id: &str, user_id: &str) -> Result<(), DirectoryError> {
        let room = self.room_mut(id)?;
        if room.has_participant(user_id) {
            return Ok(());
        }
        if let Some(max) = room.max_participants {
            if room.participants.len() >= max as usize {
                return Err(DirectoryError::Full {
                    id: id.to_string(),
                    max,
                });
            }
        }
        room.participants.push(user_id.to_string());
        self.persist()
    }

    pub fn remove(&mut self, id: &str) -> Result<RoomRecord, DirectoryError> {
        let index = self
            .rooms
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;

        let room = self.rooms.remove(index);
        self.persist()?;

        tracing::info!("Deleted room '{}' ({})", room.name, room.id);
        Ok(room)
    }

    /// Give back the underlying store
    pub fn into_store(self) -> S {
        self.store
    }

    fn room_mut(&mut self, id: &str) -> Result<&mut RoomRecord, DirectoryError> {
        self.rooms
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }

    fn persist(&mut self) -> Result<(), DirectoryError> {
        let text = serde_json::to_string(&self.rooms)?;
        self.store.set(ROOMS_KEY, &text)?;
        Ok(())
    }
}
