//! Room Manager: create/join/leave/start, one lock per room.
//!
//! Lock order is room -> registry; the room table itself is only held for lookups and
//! inserts/removals and never while acquiring another lock.

use crate::error::{lock, read, write, LobbyError};
use crate::gateway::fanout::Fanout;
use crate::gateway::protocol::ServerMessage;
use crate::logic::registry::PlayerRegistry;
use crate::models::{GameMode, GameRoom, PlayerId, RoomId, RoomSnapshot, RoomStatus, TournamentId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

pub type RoomHandle = Arc<Mutex<GameRoom>>;

/// Parameters of `create_room`.
#[derive(Clone, Debug)]
pub struct NewRoom {
    pub name: String,
    pub game_mode: GameMode,
    pub biome: String,
    pub is_private: bool,
    pub password: Option<String>,
}

/// Result of a member leaving, for the relay and tournament layer to react to.
#[derive(Clone, Debug)]
pub struct Departure {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub tournament_id: Option<TournamentId>,
    pub status: RoomStatus,
    /// Seat vacated mid-game.
    pub forfeited: bool,
    /// Room emptied and removed from the table.
    pub retired: bool,
    pub remaining: Vec<PlayerId>,
}

pub struct RoomManager {
    rooms: RwLock<HashMap<RoomId, RoomHandle>>,
    registry: Arc<PlayerRegistry>,
    fanout: Arc<Fanout>,
}

impl RoomManager {
    pub fn new(registry: Arc<PlayerRegistry>, fanout: Arc<Fanout>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            registry,
            fanout,
        }
    }

    /// Create an empty `waiting` room and announce the new room list.
    pub fn create(&self, new_room: NewRoom) -> Result<RoomSnapshot, LobbyError> {
        let name = new_room.name.trim();
        if name.is_empty() {
            return Err(LobbyError::validation("Room name must not be empty"));
        }
        let password = new_room.password.filter(|p| !p.is_empty());
        if new_room.is_private && password.is_none() {
            return Err(LobbyError::validation("Private rooms need a password"));
        }
        let room = GameRoom::new(
            name,
            new_room.game_mode,
            new_room.biome,
            new_room.is_private,
            password,
        );
        let snapshot = self.describe(&room);
        log::info!("Created room {} ({}, {})", room.id, room.name, room.game_mode.as_str());
        write(&self.rooms)?.insert(room.id, Arc::new(Mutex::new(room)));
        self.broadcast_room_list();
        Ok(snapshot)
    }

    /// Create a `waiting` room with its members already seated (matchmaking, brackets).
    pub(crate) fn open_seated(
        &self,
        room_id: RoomId,
        name: String,
        game_mode: GameMode,
        biome: String,
        members: Vec<PlayerId>,
        tournament_id: Option<TournamentId>,
    ) -> Result<RoomSnapshot, LobbyError> {
        if members.len() > game_mode.occupancy() {
            return Err(LobbyError::Full("Room"));
        }
        let mut room = GameRoom::new(name, game_mode, biome, false, None);
        room.id = room_id;
        room.members = members;
        room.tournament_id = tournament_id;
        let snapshot = self.describe(&room);
        write(&self.rooms)?.insert(room_id, Arc::new(Mutex::new(room)));
        Ok(snapshot)
    }

    /// Append `player_id` to the room; existing members get `player_joined_room`,
    /// the joiner gets `room_joined`.
    pub fn join(
        &self,
        room_id: RoomId,
        player_id: &str,
        password: Option<&str>,
    ) -> Result<RoomSnapshot, LobbyError> {
        let player = self.registry.lookup(player_id)?;
        let handle = self.entry(room_id)?;
        let mut room = lock(&handle)?;
        self.ensure_live(room_id)?;
        if room.tournament_id.is_some() {
            return Err(LobbyError::forbidden(
                "Tournament rooms are seated by the bracket",
            ));
        }
        room.admit(player_id, password)?;

        let snapshot = self.describe(&room);
        self.fanout.multicast(
            room.members.iter(),
            &ServerMessage::PlayerJoinedRoom {
                player: player.summary(),
                room: snapshot.clone(),
            },
            Some(player_id),
        );
        self.fanout.unicast(
            player_id,
            &ServerMessage::RoomJoined {
                room: snapshot.clone(),
            },
        );
        log::debug!(
            "{} joined room {} ({}/{})",
            player_id,
            room_id,
            room.members.len(),
            room.max_players
        );
        Ok(snapshot)
    }

    /// Remove a member. Emptied rooms are retired; a seat vacated mid-game is a forfeit.
    pub fn leave(&self, room_id: RoomId, player_id: &str) -> Result<Departure, LobbyError> {
        let handle = self.entry(room_id)?;
        let mut room = lock(&handle)?;
        self.ensure_live(room_id)?;
        let removal = room.remove_member(player_id)?;
        self.registry
            .release_reservations([&player_id.to_string()], room_id)?;

        let retired = removal.remaining == 0;
        self.fanout
            .unicast(player_id, &ServerMessage::RoomLeft { room_id });
        if retired {
            self.retire(room_id)?;
            log::info!("Room {} retired (empty)", room_id);
        } else {
            let snapshot = self.describe(&room);
            self.fanout.multicast(
                room.members.iter(),
                &ServerMessage::PlayerLeftRoom {
                    player_id: player_id.to_string(),
                    room: snapshot,
                },
                None,
            );
        }
        let departure = Departure {
            room_id,
            player_id: player_id.to_string(),
            tournament_id: room.tournament_id,
            status: room.status,
            forfeited: removal.forfeited,
            retired,
            remaining: room.members.clone(),
        };
        drop(room);

        if retired {
            self.broadcast_room_list();
        }
        Ok(departure)
    }

    /// `waiting` -> `playing`. Requires a member caller and at least two members.
    pub fn start(&self, room_id: RoomId, player_id: &str) -> Result<RoomSnapshot, LobbyError> {
        let handle = self.entry(room_id)?;
        let mut room = lock(&handle)?;
        self.ensure_live(room_id)?;
        if !room.is_member(player_id) {
            return Err(LobbyError::forbidden("Only room members can start the game"));
        }
        room.start()?;
        self.registry
            .release_reservations(room.members.iter(), room_id)?;

        let snapshot = self.describe(&room);
        self.fanout.multicast(
            room.members.iter(),
            &ServerMessage::GameStarted {
                room: snapshot.clone(),
            },
            None,
        );
        log::info!("Game started in room {} with {} players", room_id, room.members.len());
        Ok(snapshot)
    }

    pub fn snapshot(&self, room_id: RoomId) -> Result<RoomSnapshot, LobbyError> {
        let handle = self.entry(room_id)?;
        let room = lock(&handle)?;
        Ok(self.describe(&room))
    }

    /// Every live room, oldest first. Must not be called while holding a room lock.
    pub fn list(&self) -> Vec<RoomSnapshot> {
        let handles: Vec<RoomHandle> = match read(&self.rooms) {
            Ok(rooms) => rooms.values().cloned().collect(),
            Err(_) => return Vec::new(),
        };
        let mut snapshots: Vec<RoomSnapshot> = handles
            .iter()
            .filter_map(|h| lock(h).ok().map(|room| self.describe(&room)))
            .collect();
        snapshots.sort_by_key(|s| s.room.created_at);
        snapshots
    }

    /// Rooms that currently list `player_id` as a member.
    pub fn rooms_of(&self, player_id: &str) -> Vec<RoomId> {
        let handles: Vec<(RoomId, RoomHandle)> = match read(&self.rooms) {
            Ok(rooms) => rooms.iter().map(|(id, h)| (*id, h.clone())).collect(),
            Err(_) => return Vec::new(),
        };
        handles
            .into_iter()
            .filter(|(_, h)| lock(h).is_ok_and(|room| room.is_member(player_id)))
            .map(|(id, _)| id)
            .collect()
    }

    pub(crate) fn entry(&self, room_id: RoomId) -> Result<RoomHandle, LobbyError> {
        read(&self.rooms)?
            .get(&room_id)
            .cloned()
            .ok_or(LobbyError::NotFound("Room"))
    }

    /// A handle can outlive its table entry; callers re-check after locking the room.
    pub(crate) fn ensure_live(&self, room_id: RoomId) -> Result<(), LobbyError> {
        if read(&self.rooms)?.contains_key(&room_id) {
            Ok(())
        } else {
            Err(LobbyError::NotFound("Room"))
        }
    }

    /// Remove from the live table. Called with the room's lock held.
    pub(crate) fn retire(&self, room_id: RoomId) -> Result<(), LobbyError> {
        write(&self.rooms)?.remove(&room_id);
        Ok(())
    }

    /// Resolve member names. Takes the registry lock, so never call it while holding that.
    pub(crate) fn describe(&self, room: &GameRoom) -> RoomSnapshot {
        RoomSnapshot {
            room: room.clone(),
            players: self.registry.summaries(room.members.iter()),
        }
    }

    pub(crate) fn broadcast_room_list(&self) {
        let rooms = self.list();
        self.fanout
            .broadcast(&ServerMessage::RoomListUpdated { rooms }, None);
    }
}
