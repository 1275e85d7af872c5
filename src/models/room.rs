//! GameRoom: lobby/match container, its seats and in-progress game state.

use crate::error::LobbyError;
use crate::models::chess::{ChessMove, Color, GameMode};
use crate::models::player::{PlayerId, PlayerSummary};
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RoomId = Uuid;

/// Lifecycle of a room. Transitions only move forward.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatState {
    Active,
    /// Player left or disconnected mid-game.
    Forfeited,
    /// King captured.
    Eliminated,
}

/// One turn-order position, fixed when the game starts.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub player_id: PlayerId,
    pub color: Color,
    pub state: SeatState,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Victory,
    Draw,
    Forfeit,
    /// Every seat was vacated.
    Abandoned,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub winners: Vec<PlayerId>,
    pub reason: EndReason,
}

impl MatchResult {
    pub fn is_draw(&self) -> bool {
        self.reason == EndReason::Draw
    }
}

/// Turn pointer and move log of a started game.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub seats: Vec<Seat>,
    /// Index into `seats` of the player to move.
    pub current_turn: usize,
    pub current_color: Color,
    pub moves: Vec<ChessMove>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
}

impl GameState {
    fn new(members: &[PlayerId], mode: GameMode) -> Self {
        let seats: Vec<Seat> = members
            .iter()
            .zip(mode.colors())
            .map(|(player_id, &color)| Seat {
                player_id: player_id.clone(),
                color,
                state: SeatState::Active,
            })
            .collect();
        Self {
            seats,
            current_turn: 0,
            current_color: Color::White,
            moves: Vec::new(),
            started_at: Utc::now(),
            result: None,
        }
    }

    pub fn current_seat(&self) -> Option<&Seat> {
        self.seats.get(self.current_turn)
    }

    pub fn seat_of(&self, player_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.player_id == player_id)
    }

    pub fn seated_colors(&self) -> Vec<Color> {
        self.seats.iter().map(|s| s.color).collect()
    }

    pub fn active_seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter().filter(|s| s.state == SeatState::Active)
    }

    pub fn active_colors(&self) -> Vec<Color> {
        self.active_seats().map(|s| s.color).collect()
    }

    /// Move the pointer to the next active seat after the current one.
    /// Stays put when no other seat is active.
    pub fn advance_turn(&mut self) {
        let n = self.seats.len();
        for step in 1..=n {
            let idx = (self.current_turn + step) % n;
            if self.seats[idx].state == SeatState::Active {
                self.current_turn = idx;
                self.current_color = self.seats[idx].color;
                return;
            }
        }
    }

    /// Mark seats whose colour is not in `alive` as eliminated.
    pub fn eliminate_missing(&mut self, alive: &[Color]) {
        for seat in &mut self.seats {
            if seat.state == SeatState::Active && !alive.contains(&seat.color) {
                seat.state = SeatState::Eliminated;
            }
        }
    }

    /// Players seated on the given colours, in seat order.
    pub fn players_for(&self, colors: &[Color]) -> Vec<PlayerId> {
        self.seats
            .iter()
            .filter(|s| colors.contains(&s.color))
            .map(|s| s.player_id.clone())
            .collect()
    }
}

/// What happened to a room when a member left.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Removal {
    /// The room was `playing` and the seat is now forfeited.
    pub forfeited: bool,
    pub remaining: usize,
}

/// A lobby/match container.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRoom {
    pub id: RoomId,
    pub name: String,
    pub game_mode: GameMode,
    pub biome: String,
    /// Seating order = join order = turn order.
    pub members: Vec<PlayerId>,
    pub max_players: usize,
    pub is_private: bool,
    #[serde(skip)]
    pub password: Option<String>,
    pub status: RoomStatus,
    pub game_state: Option<GameState>,
    pub created_at: DateTime<Utc>,
    pub tournament_id: Option<TournamentId>,
}

impl GameRoom {
    /// Create an empty `waiting` room; occupancy follows the mode.
    pub fn new(
        name: impl Into<String>,
        game_mode: GameMode,
        biome: impl Into<String>,
        is_private: bool,
        password: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            game_mode,
            biome: biome.into(),
            members: Vec::new(),
            max_players: game_mode.occupancy(),
            is_private,
            password,
            status: RoomStatus::Waiting,
            game_state: None,
            created_at: Utc::now(),
            tournament_id: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_players
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.members.iter().any(|m| m == player_id)
    }

    /// Append a member after checking phase, password and capacity.
    pub fn admit(&mut self, player_id: &str, password: Option<&str>) -> Result<(), LobbyError> {
        if self.status != RoomStatus::Waiting {
            return Err(LobbyError::invalid_state("Room is not accepting players"));
        }
        if self.is_member(player_id) {
            return Err(LobbyError::invalid_state("Player is already in this room"));
        }
        if self.is_private && self.password.as_deref() != password {
            return Err(LobbyError::forbidden("Invalid room password"));
        }
        if self.is_full() {
            return Err(LobbyError::Full("Room"));
        }
        self.members.push(player_id.to_string());
        Ok(())
    }

    /// Remove a member. A seat vacated mid-game is forfeited and skipped by the turn pointer.
    pub fn remove_member(&mut self, player_id: &str) -> Result<Removal, LobbyError> {
        let idx = self
            .members
            .iter()
            .position(|m| m == player_id)
            .ok_or(LobbyError::NotFound("Player in room"))?;
        self.members.remove(idx);

        let mut forfeited = false;
        if self.status == RoomStatus::Playing {
            if let Some(state) = self.game_state.as_mut() {
                let held_turn = state
                    .current_seat()
                    .is_some_and(|s| s.player_id == player_id);
                if let Some(seat) = state
                    .seats
                    .iter_mut()
                    .find(|s| s.player_id == player_id && s.state == SeatState::Active)
                {
                    seat.state = SeatState::Forfeited;
                    forfeited = true;
                }
                if held_turn {
                    state.advance_turn();
                }
            }
        }
        Ok(Removal {
            forfeited,
            remaining: self.members.len(),
        })
    }

    /// `waiting` -> `playing` with at least two members; turn starts at seat 0.
    pub fn start(&mut self) -> Result<(), LobbyError> {
        if self.status != RoomStatus::Waiting {
            return Err(LobbyError::invalid_state("Game already started"));
        }
        if self.members.len() < 2 {
            return Err(LobbyError::invalid_state("Not enough players to start game"));
        }
        self.game_state = Some(GameState::new(&self.members, self.game_mode));
        self.status = RoomStatus::Playing;
        Ok(())
    }

    /// `playing` -> `finished`, recording the result.
    pub fn finish(&mut self, result: MatchResult) -> Result<(), LobbyError> {
        if self.status != RoomStatus::Playing {
            return Err(LobbyError::invalid_state("Game is not in progress"));
        }
        if let Some(state) = self.game_state.as_mut() {
            state.result = Some(result);
        }
        self.status = RoomStatus::Finished;
        Ok(())
    }
}

/// Room as sent to clients: member ids resolved to names and ratings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    #[serde(flatten)]
    pub room: GameRoom,
    pub players: Vec<PlayerSummary>,
}
