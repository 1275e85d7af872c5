//! Connection Gateway: decode, route to the owning component, report errors to the sender.

pub mod fanout;
pub mod protocol;

use crate::error::LobbyError;
use crate::lobby::Lobby;
use crate::logic::registry::Registration;
use crate::logic::rooms::NewRoom;
use crate::logic::tournaments::NewTournament;
use crate::models::PlayerId;
use fanout::{ConnectionId, Outbox};
use protocol::{ClientMessage, ServerMessage};

/// Per-socket state held by the connection's reader loop.
pub struct Connection {
    id: ConnectionId,
    outbox: Outbox,
    player_id: Option<PlayerId>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Player registered on this connection, if any.
    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }
}

pub struct Gateway {
    lobby: Lobby,
}

impl Gateway {
    pub fn new(lobby: Lobby) -> Self {
        Self { lobby }
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    /// Accept a socket whose writer drains `outbox`; sends `connection_status`.
    pub fn connect(&self, outbox: Outbox) -> Connection {
        let conn = Connection {
            id: self.lobby.fanout.next_connection_id(),
            outbox,
            player_id: None,
        };
        log::info!("Connection {} opened", conn.id);
        reply(
            &conn,
            &ServerMessage::ConnectionStatus {
                connected: true,
                connection_id: conn.id,
            },
        );
        conn
    }

    /// Handle one inbound text frame. Failures become an `error` event to this connection only.
    pub fn handle_text(&self, conn: &mut Connection, text: &str) {
        let result = ClientMessage::decode(text).and_then(|message| self.dispatch(conn, message));
        if let Err(e) = result {
            log::debug!("Connection {}: {} ({})", conn.id, e, e.code());
            reply(conn, &ServerMessage::error(&e));
        }
    }

    /// Socket closed: unbind the player and leave every room it occupies.
    /// The player and its history stay in the registry.
    pub fn disconnect(&self, conn: &Connection) {
        log::info!("Connection {} closed", conn.id);
        let Some(player_id) = conn.player_id.as_deref() else {
            return;
        };
        // a newer connection for the same player keeps its rooms
        match self.lobby.registry.unbind_connection(player_id, conn.id) {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                log::error!("Could not unbind {}: {}", player_id, e);
                return;
            }
        }
        self.lobby.fanout.detach(player_id, conn.id);
        self.leave_all_rooms(player_id);
    }

    /// Implicit leave of every room the player sits in.
    fn leave_all_rooms(&self, player_id: &str) {
        for room_id in self.lobby.rooms.rooms_of(player_id) {
            if let Err(e) = self.lobby.leave_room(room_id, player_id) {
                log::debug!("Implicit leave of room {} by {}: {}", room_id, player_id, e);
            }
        }
    }

    /// The connection's registered player, checked against an optional claimed id and
    /// against the registry's live binding.
    fn acting(&self, conn: &Connection, claimed: Option<&str>) -> Result<PlayerId, LobbyError> {
        let me = conn
            .player_id
            .clone()
            .ok_or_else(|| LobbyError::forbidden("Register before sending this message"))?;
        if claimed.is_some_and(|claimed| claimed != me) {
            return Err(LobbyError::forbidden("playerId does not match this connection"));
        }
        self.lobby.registry.touch(&me, conn.id)?;
        Ok(me)
    }

    fn dispatch(&self, conn: &mut Connection, message: ClientMessage) -> Result<(), LobbyError> {
        let lobby = &self.lobby;
        match message {
            ClientMessage::RegisterPlayer {
                player_id,
                name,
                avatar,
                device_type,
                connection_type,
            } => {
                if let (Some(current), Some(requested)) = (&conn.player_id, &player_id) {
                    if current != requested {
                        return Err(LobbyError::forbidden(
                            "Connection is registered as another player",
                        ));
                    }
                }
                let player = lobby.registry.register(Registration {
                    requested_id: player_id.or_else(|| conn.player_id.clone()),
                    name,
                    avatar,
                    device_type,
                    connection_type,
                })?;
                if let Some(replaced) = lobby.registry.bind_connection(&player.id, conn.id)? {
                    // one live connection per player: the old socket loses its seats
                    log::info!("Connection {} supersedes {} for {}", conn.id, replaced, player.id);
                    lobby.fanout.detach(&player.id, replaced);
                    self.leave_all_rooms(&player.id);
                }
                lobby
                    .fanout
                    .attach(&player.id, conn.id, conn.outbox.clone());
                conn.player_id = Some(player.id.clone());
                let rooms = lobby.rooms.list();
                reply(conn, &ServerMessage::PlayerRegistered { player, rooms });
            }
            ClientMessage::FindNearbyPlayers { player_id } => {
                let me = self.acting(conn, player_id.as_deref())?;
                let players = lobby.registry.nearby(&me, lobby.config.nearby_limit)?;
                reply(conn, &ServerMessage::NearbyPlayersFound { players });
            }
            ClientMessage::CreateRoom {
                name,
                game_mode,
                biome,
                is_private,
                password,
            } => {
                let room = lobby.rooms.create(NewRoom {
                    name,
                    game_mode,
                    biome,
                    is_private,
                    password,
                })?;
                reply(conn, &ServerMessage::RoomCreated { room });
            }
            ClientMessage::JoinRoom {
                room_id,
                player_id,
                password,
            } => {
                let me = self.acting(conn, player_id.as_deref())?;
                lobby.rooms.join(room_id, &me, password.as_deref())?;
            }
            ClientMessage::LeaveRoom { room_id, player_id } => {
                let me = self.acting(conn, player_id.as_deref())?;
                lobby.leave_room(room_id, &me)?;
            }
            ClientMessage::StartGame { room_id } => {
                let me = self.acting(conn, None)?;
                lobby.rooms.start(room_id, &me)?;
            }
            ClientMessage::GameMove {
                room_id,
                player_id,
                chess_move,
            } => {
                let me = self.acting(conn, player_id.as_deref())?;
                lobby.relay.submit_move(room_id, &me, chess_move)?;
            }
            ClientMessage::CreateTournament {
                name,
                game_mode,
                biome,
                max_participants,
            } => {
                let tournament = lobby.tournaments.create(NewTournament {
                    name,
                    game_mode,
                    biome,
                    max_participants,
                })?;
                reply(conn, &ServerMessage::TournamentCreated { tournament });
            }
            ClientMessage::JoinTournament {
                tournament_id,
                player_id,
            } => {
                let me = self.acting(conn, player_id.as_deref())?;
                lobby.tournaments.join(tournament_id, &me)?;
            }
            ClientMessage::GetPlayerHistory { player_id } => {
                let target = match player_id {
                    Some(id) => id,
                    None => self.acting(conn, None)?,
                };
                let history = lobby.registry.history(&target)?;
                reply(conn, &ServerMessage::PlayerHistory { history });
            }
            ClientMessage::GetLeaderboard { category, limit } => {
                let limit = limit.unwrap_or(lobby.config.leaderboard_limit).max(1);
                let leaderboard = lobby.registry.leaderboard(category, limit)?;
                reply(
                    conn,
                    &ServerMessage::Leaderboard {
                        leaderboard,
                        category,
                    },
                );
            }
            ClientMessage::InvitePlayer {
                from_player_id,
                to_player_id,
                room_id,
            } => {
                let me = self.acting(conn, from_player_id.as_deref())?;
                let room = lobby.rooms.snapshot(room_id)?;
                lobby.registry.lookup(&to_player_id)?;
                if !lobby.registry.is_connected(&to_player_id) {
                    return Err(LobbyError::invalid_state("Player is not connected"));
                }
                let from = lobby.registry.lookup(&me)?.summary();
                lobby
                    .fanout
                    .unicast(&to_player_id, &ServerMessage::RoomInvite { from, room });
                reply(
                    conn,
                    &ServerMessage::InviteSent {
                        to_player_id,
                        room_id,
                    },
                );
            }
            ClientMessage::MatchmakingRequest {
                player_id,
                game_mode,
                biome,
                rating_range,
            } => {
                let me = self.acting(conn, player_id.as_deref())?;
                let range = rating_range.unwrap_or(lobby.config.matchmaking_rating_range);
                lobby
                    .matchmaker
                    .request_match(&me, game_mode, &biome, range)?;
            }
        }
        Ok(())
    }
}

fn reply(conn: &Connection, message: &ServerMessage) {
    let Some(text) = message.encode() else { return };
    if conn.outbox.send(text).is_err() {
        log::debug!("Connection {} outbox closed, dropping {}", conn.id, message.kind());
    }
}
