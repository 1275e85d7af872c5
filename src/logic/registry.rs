//! Player Registry: identity, stats, histories, live-connection handles and
//! matchmaking reservations, all behind one lock.

use crate::error::{lock, LobbyError};
use crate::gateway::fanout::{ConnectionId, Fanout};
use crate::gateway::protocol::{LeaderboardCategory, ServerMessage};
use crate::logic::rating::{rating_changes, RatedSeat};
use crate::models::{
    validate_name, Achievement, AchievementKind, ConnectionType, DeviceType, GameHistoryEntry,
    GameMode, GameOutcome, Player, PlayerHistory, PlayerId, PlayerSummary, RatingChange, RoomId,
    TournamentId, UnlockedAchievement,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Fields a client supplies when registering.
#[derive(Clone, Debug, Default)]
pub struct Registration {
    /// Stable id kept by the client across reconnects; generated when absent.
    pub requested_id: Option<PlayerId>,
    pub name: String,
    pub avatar: Option<String>,
    pub device_type: DeviceType,
    pub connection_type: ConnectionType,
}

/// A finished game as the registry needs it to update stats.
#[derive(Clone, Debug)]
pub struct CompletedGame {
    pub room_id: RoomId,
    pub game_mode: GameMode,
    pub biome: String,
    pub tournament_id: Option<TournamentId>,
    /// Every seat in seat order, with whether it ended on the winning side.
    pub seats: Vec<(PlayerId, bool)>,
    pub draw: bool,
    pub moves: usize,
    pub started_at: DateTime<Utc>,
}

/// Rating and achievement updates produced by [`PlayerRegistry::record_game`].
#[derive(Clone, Debug, Default)]
pub struct Settlement {
    pub rating_changes: Vec<RatingChange>,
    pub achievements: Vec<UnlockedAchievement>,
}

#[derive(Default)]
struct RegistryState {
    players: HashMap<PlayerId, Player>,
    histories: HashMap<PlayerId, PlayerHistory>,
    connections: HashMap<PlayerId, ConnectionId>,
    /// Players seated by matchmaking in a room that has not started yet.
    reservations: HashMap<PlayerId, RoomId>,
    next_seq: u64,
}

pub struct PlayerRegistry {
    state: Mutex<RegistryState>,
    fanout: Arc<Fanout>,
}

impl PlayerRegistry {
    pub fn new(fanout: Arc<Fanout>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            fanout,
        }
    }

    /// Register (or re-register) a player. The caller binds a connection afterwards.
    ///
    /// Idempotent on a stable id: rating and counters are restored from the player's
    /// history instead of being reset. Other connected players get `player_joined`.
    pub fn register(&self, registration: Registration) -> Result<Player, LobbyError> {
        let name = validate_name(&registration.name)?;
        let id = match registration.requested_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let mut st = lock(&self.state)?;
        let existing = st.players.get(&id).cloned();
        let mut player = match existing {
            Some(existing) => existing,
            None => {
                let seq = st.next_seq;
                st.next_seq += 1;
                Player::new(id.clone(), name.clone(), seq)
            }
        };
        player.name = name;
        player.avatar = registration.avatar;
        player.device_type = registration.device_type;
        player.connection_type = registration.connection_type;
        player.last_seen = Utc::now();

        let history = st
            .histories
            .entry(id.clone())
            .or_insert_with(|| PlayerHistory::new(id.clone(), player.rating));
        player.rating = history.rating;
        player.games_played = history.total_games_played;
        player.games_won = history.total_games_won;

        st.players.insert(id.clone(), player.clone());
        log::info!("Registered player {} ({})", player.name, id);

        self.fanout.broadcast(
            &ServerMessage::PlayerJoined {
                player: player.summary(),
            },
            Some(&id),
        );
        Ok(player)
    }

    pub fn lookup(&self, player_id: &str) -> Result<Player, LobbyError> {
        lock(&self.state)?
            .players
            .get(player_id)
            .cloned()
            .ok_or(LobbyError::NotFound("Player"))
    }

    /// Summaries for the given ids, in order, skipping unknown ids.
    pub fn summaries<'a>(&self, ids: impl IntoIterator<Item = &'a PlayerId>) -> Vec<PlayerSummary> {
        match lock(&self.state) {
            Ok(st) => ids
                .into_iter()
                .filter_map(|id| st.players.get(id).map(Player::summary))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Update last-seen for a player acting on `connection_id`.
    ///
    /// Fails with `Forbidden` once another connection has taken the player over.
    pub fn touch(&self, player_id: &str, connection_id: ConnectionId) -> Result<(), LobbyError> {
        let mut st = lock(&self.state)?;
        if st.connections.get(player_id) != Some(&connection_id) {
            return Err(LobbyError::forbidden("Connection superseded"));
        }
        let player = st
            .players
            .get_mut(player_id)
            .ok_or(LobbyError::NotFound("Player"))?;
        player.last_seen = Utc::now();
        Ok(())
    }

    /// Make `connection_id` the player's only live connection.
    ///
    /// Returns the connection it replaced, if a different one was bound.
    pub fn bind_connection(
        &self,
        player_id: &str,
        connection_id: ConnectionId,
    ) -> Result<Option<ConnectionId>, LobbyError> {
        let mut st = lock(&self.state)?;
        if !st.players.contains_key(player_id) {
            return Err(LobbyError::NotFound("Player"));
        }
        let previous = st.connections.insert(player_id.to_string(), connection_id);
        log::info!("Player {} bound to connection {}", player_id, connection_id);
        Ok(previous.filter(|&old| old != connection_id))
    }

    /// Drop the live association if it still points at `connection_id`.
    /// The player and its history are kept.
    pub fn unbind_connection(
        &self,
        player_id: &str,
        connection_id: ConnectionId,
    ) -> Result<bool, LobbyError> {
        let mut st = lock(&self.state)?;
        if st.connections.get(player_id) != Some(&connection_id) {
            return Ok(false);
        }
        st.connections.remove(player_id);
        if let Some(player) = st.players.get_mut(player_id) {
            player.last_seen = Utc::now();
        }
        Ok(true)
    }

    pub fn is_connected(&self, player_id: &str) -> bool {
        lock(&self.state).is_ok_and(|st| st.connections.contains_key(player_id))
    }

    pub fn history(&self, player_id: &str) -> Result<PlayerHistory, LobbyError> {
        lock(&self.state)?
            .histories
            .get(player_id)
            .cloned()
            .ok_or(LobbyError::NotFound("Player history"))
    }

    /// All known players sorted descending by `category`, ties by registration order.
    pub fn leaderboard(
        &self,
        category: LeaderboardCategory,
        limit: usize,
    ) -> Result<Vec<Player>, LobbyError> {
        let st = lock(&self.state)?;
        let mut players: Vec<Player> = st.players.values().cloned().collect();
        players.sort_by(|a, b| {
            let (ka, kb) = match category {
                LeaderboardCategory::Rating => (i64::from(a.rating), i64::from(b.rating)),
                LeaderboardCategory::GamesWon => (i64::from(a.games_won), i64::from(b.games_won)),
                LeaderboardCategory::GamesPlayed => {
                    (i64::from(a.games_played), i64::from(b.games_played))
                }
            };
            kb.cmp(&ka).then(a.registered_seq.cmp(&b.registered_seq))
        });
        players.truncate(limit.max(1));
        Ok(players)
    }

    /// Connected players on a local medium (wifi/bluetooth), excluding the caller.
    pub fn nearby(&self, player_id: &str, limit: usize) -> Result<Vec<PlayerSummary>, LobbyError> {
        let st = lock(&self.state)?;
        let mut found: Vec<&Player> = st
            .players
            .values()
            .filter(|p| p.id != player_id)
            .filter(|p| p.connection_type.is_local())
            .filter(|p| st.connections.contains_key(&p.id))
            .collect();
        found.sort_by_key(|p| p.registered_seq);
        Ok(found.into_iter().take(limit).map(Player::summary).collect())
    }

    /// Atomically pick and reserve opponents for `requester_id`.
    ///
    /// `select` sees the requester and every connected, unreserved player (registration
    /// order). When it returns a set, the requester and that set are reserved for
    /// `room_id` and returned in seating order; nobody else can select them meanwhile.
    pub(crate) fn reserve_opponents<F>(
        &self,
        requester_id: &str,
        room_id: RoomId,
        select: F,
    ) -> Result<Option<Vec<PlayerId>>, LobbyError>
    where
        F: FnOnce(&Player, &[&Player]) -> Option<Vec<PlayerId>>,
    {
        let mut st = lock(&self.state)?;
        let requester = st
            .players
            .get(requester_id)
            .ok_or(LobbyError::NotFound("Player"))?;
        if st.reservations.contains_key(requester_id) {
            return Err(LobbyError::invalid_state(
                "Player already has a pending match",
            ));
        }
        let mut pool: Vec<&Player> = st
            .players
            .values()
            .filter(|p| p.id != requester_id)
            .filter(|p| st.connections.contains_key(&p.id))
            .filter(|p| !st.reservations.contains_key(&p.id))
            .collect();
        pool.sort_by_key(|p| p.registered_seq);

        let Some(opponents) = select(requester, &pool) else {
            return Ok(None);
        };
        let mut seated = Vec::with_capacity(opponents.len() + 1);
        seated.push(requester_id.to_string());
        seated.extend(opponents);
        for id in &seated {
            st.reservations.insert(id.clone(), room_id);
        }
        Ok(Some(seated))
    }

    /// Clear reservations held for `room_id` by these players.
    pub fn release_reservations<'a>(
        &self,
        player_ids: impl IntoIterator<Item = &'a PlayerId>,
        room_id: RoomId,
    ) -> Result<(), LobbyError> {
        let mut st = lock(&self.state)?;
        for id in player_ids {
            if st.reservations.get(id) == Some(&room_id) {
                st.reservations.remove(id);
            }
        }
        Ok(())
    }

    pub fn reservation(&self, player_id: &str) -> Option<RoomId> {
        lock(&self.state)
            .ok()
            .and_then(|st| st.reservations.get(player_id).copied())
    }

    /// Current ratings, in order; unknown ids are skipped.
    pub fn ratings<'a>(&self, ids: impl IntoIterator<Item = &'a PlayerId>) -> Vec<(PlayerId, i32)> {
        match lock(&self.state) {
            Ok(st) => ids
                .into_iter()
                .filter_map(|id| st.players.get(id).map(|p| (id.clone(), p.rating)))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Apply a finished game: Elo update, counters, history entries, achievements.
    pub fn record_game(&self, game: &CompletedGame) -> Result<Settlement, LobbyError> {
        let mut st = lock(&self.state)?;
        let rated: Vec<RatedSeat> = game
            .seats
            .iter()
            .map(|(id, won)| RatedSeat {
                player_id: id.clone(),
                rating: st.players.get(id).map_or(crate::models::INITIAL_RATING, |p| p.rating),
                won: *won,
            })
            .collect();
        let updated = rating_changes(&rated, game.draw);
        let roster: Vec<PlayerId> = game.seats.iter().map(|(id, _)| id.clone()).collect();
        let now = Utc::now();

        let mut settlement = Settlement::default();
        for (seat, (player_id, new_rating)) in rated.iter().zip(updated) {
            let result = if game.draw {
                GameOutcome::Draw
            } else if seat.won {
                GameOutcome::Win
            } else {
                GameOutcome::Loss
            };
            if let Some(player) = st.players.get_mut(&player_id) {
                player.rating = new_rating;
                player.games_played += 1;
                if result == GameOutcome::Win {
                    player.games_won += 1;
                }
            }
            let entry = GameHistoryEntry {
                game_id: game.room_id,
                game_mode: game.game_mode.as_str().to_string(),
                biome: game.biome.clone(),
                players: roster.clone(),
                result,
                moves: game.moves,
                duration_secs: (now - game.started_at).num_seconds(),
                date: now,
                tournament_id: game.tournament_id,
            };
            let history = st
                .histories
                .entry(player_id.clone())
                .or_insert_with(|| PlayerHistory::new(player_id.clone(), seat.rating));
            for achievement in history.record_game(entry, new_rating) {
                settlement.achievements.push(UnlockedAchievement {
                    player_id: player_id.clone(),
                    achievement,
                });
            }
            settlement.rating_changes.push(RatingChange {
                player_id,
                old_rating: seat.rating,
                new_rating,
            });
        }
        Ok(settlement)
    }

    /// Unlock an achievement outside of game completion (tournament wins).
    pub fn unlock(
        &self,
        player_id: &str,
        kind: AchievementKind,
    ) -> Result<Option<Achievement>, LobbyError> {
        let mut st = lock(&self.state)?;
        let history = st
            .histories
            .get_mut(player_id)
            .ok_or(LobbyError::NotFound("Player history"))?;
        Ok(history.unlock(kind))
    }
}
