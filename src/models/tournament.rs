//! Tournament, Round and TournamentMatch.

use crate::error::LobbyError;
use crate::models::chess::GameMode;
use crate::models::player::{PlayerId, PlayerSummary};
use crate::models::room::RoomId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Current phase of the tournament.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting participants.
    #[default]
    Registration,
    /// Bracket running.
    Active,
    /// Winner recorded; terminal.
    Finished,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

/// One match of a round, played in its own room.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentMatch {
    pub room_id: RoomId,
    pub players: Vec<PlayerId>,
    /// Set once the match is resolved; `None` after resolution means nobody advances.
    pub advancing: Option<PlayerId>,
    pub resolved: bool,
}

/// One bracket level.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// 1-based.
    pub round_number: u32,
    pub matches: Vec<TournamentMatch>,
    /// Players advanced without a match (trailing group of one).
    pub byes: Vec<PlayerId>,
    /// Planned number of players entering this round.
    pub expected_players: usize,
    pub status: RoundStatus,
}

impl Round {
    pub fn shell(round_number: u32, expected_players: usize) -> Self {
        Self {
            round_number,
            matches: Vec::new(),
            byes: Vec::new(),
            expected_players,
            status: RoundStatus::Pending,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.matches.iter().all(|m| m.resolved)
    }

    /// Match winners in match order, then byes.
    pub fn advancing_players(&self) -> Vec<PlayerId> {
        self.matches
            .iter()
            .filter_map(|m| m.advancing.clone())
            .chain(self.byes.iter().cloned())
            .collect()
    }
}

/// Bracket container.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub game_mode: GameMode,
    pub biome: String,
    pub status: TournamentStatus,
    /// Registration order.
    pub participants: Vec<PlayerId>,
    pub max_participants: usize,
    pub rounds: Vec<Round>,
    /// Index into `rounds`.
    pub current_round: usize,
    pub winner: Option<PlayerId>,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Create a new tournament in Registration with no participants.
    pub fn new(
        name: impl Into<String>,
        game_mode: GameMode,
        biome: impl Into<String>,
        max_participants: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            game_mode,
            biome: biome.into(),
            status: TournamentStatus::Registration,
            participants: Vec::new(),
            max_participants,
            rounds: Vec::new(),
            current_round: 0,
            winner: None,
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
        }
    }

    /// Add a participant (only valid in Registration, below the cap, not already registered).
    pub fn add_participant(&mut self, player_id: &str) -> Result<(), LobbyError> {
        if self.status != TournamentStatus::Registration {
            return Err(LobbyError::invalid_state("Tournament registration is closed"));
        }
        if self.participants.iter().any(|p| p == player_id) {
            return Err(LobbyError::invalid_state("Player already registered"));
        }
        if self.participants.len() >= self.max_participants {
            return Err(LobbyError::Full("Tournament"));
        }
        self.participants.push(player_id.to_string());
        Ok(())
    }

    pub fn round(&self) -> Option<&Round> {
        self.rounds.get(self.current_round)
    }

    pub fn round_mut(&mut self) -> Option<&mut Round> {
        self.rounds.get_mut(self.current_round)
    }
}

/// Tournament as sent to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSnapshot {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub players: Vec<PlayerSummary>,
}
