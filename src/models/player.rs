//! Player identity record and its wire summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable player identifier. Client-supplied (kept across reconnects) or a server-generated UUID.
pub type PlayerId = String;

/// Rating every new player starts with.
pub const INITIAL_RATING: i32 = 1200;

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 16;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Mobile,
    #[default]
    Desktop,
}

/// Medium the client reports it is connected through.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Wifi,
    Bluetooth,
    #[default]
    Internet,
}

impl ConnectionType {
    /// Local media take part in nearby discovery.
    pub fn is_local(self) -> bool {
        matches!(self, ConnectionType::Wifi | ConnectionType::Bluetooth)
    }
}

/// A registered player. Never deleted; the live connection may be absent.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub rating: i32,
    pub games_played: u32,
    pub games_won: u32,
    pub last_seen: DateTime<Utc>,
    pub device_type: DeviceType,
    pub connection_type: ConnectionType,
    /// Order of first registration; tie-breaker for matchmaking and leaderboards.
    #[serde(skip)]
    pub registered_seq: u64,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, registered_seq: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
            rating: INITIAL_RATING,
            games_played: 0,
            games_won: 0,
            last_seen: Utc::now(),
            device_type: DeviceType::default(),
            connection_type: ConnectionType::default(),
            registered_seq,
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            rating: self.rating,
        }
    }
}

/// Compact player view embedded in room and tournament snapshots.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub rating: i32,
}

/// Trim and bound-check a display name.
pub fn validate_name(name: &str) -> Result<String, crate::LobbyError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::LobbyError::validation("Name must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(crate::LobbyError::validation(format!(
            "Name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}
