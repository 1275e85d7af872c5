//! Game Session Relay: turn validation, move relay and game completion.

use crate::error::{lock, LobbyError};
use crate::gateway::fanout::Fanout;
use crate::gateway::protocol::ServerMessage;
use crate::logic::registry::{CompletedGame, PlayerRegistry, Settlement};
use crate::logic::rooms::RoomManager;
use crate::logic::rules::{BoardView, RuleEngine, Verdict};
use crate::logic::tournaments::TournamentManager;
use crate::models::{
    ChessMove, EndReason, GameMode, GameRoom, GameState, MatchResult, PlayerId, RoomId, RoomStatus,
    TournamentId,
};
use std::sync::Arc;

/// What a finished room reports once its lock is released.
struct Concluded {
    tournament_id: Option<TournamentId>,
    advancing: Option<PlayerId>,
}

pub struct GameRelay {
    rooms: Arc<RoomManager>,
    registry: Arc<PlayerRegistry>,
    tournaments: Arc<TournamentManager>,
    rules: Arc<dyn RuleEngine>,
    fanout: Arc<Fanout>,
}

impl GameRelay {
    pub fn new(
        rooms: Arc<RoomManager>,
        registry: Arc<PlayerRegistry>,
        tournaments: Arc<TournamentManager>,
        rules: Arc<dyn RuleEngine>,
        fanout: Arc<Fanout>,
    ) -> Self {
        Self {
            rooms,
            registry,
            tournaments,
            rules,
            fanout,
        }
    }

    /// Validate and apply one move, then relay it to every member.
    ///
    /// Rejections leave the move log and turn pointer untouched.
    pub fn submit_move(
        &self,
        room_id: RoomId,
        player_id: &str,
        chess_move: ChessMove,
    ) -> Result<GameState, LobbyError> {
        let handle = self.rooms.entry(room_id)?;
        let mut guard = lock(&handle)?;
        self.rooms.ensure_live(room_id)?;
        let room: &mut GameRoom = &mut guard;
        if room.status != RoomStatus::Playing {
            return Err(LobbyError::invalid_state("Game is not in progress"));
        }
        if !room.is_member(player_id) {
            return Err(LobbyError::forbidden("Not a member of this room"));
        }
        let mode = room.game_mode;
        let state = room
            .game_state
            .as_mut()
            .ok_or(LobbyError::Internal("playing room without game state"))?;
        let mover = match state.current_seat() {
            Some(seat) if seat.player_id == player_id => seat.color,
            _ => return Err(LobbyError::NotYourTurn),
        };
        let seated = state.seated_colors();
        let legal = self.rules.is_legal(
            &BoardView {
                mode,
                seated: &seated,
                moves: &state.moves,
                mover,
            },
            &chess_move,
        );
        if !legal {
            return Err(LobbyError::IllegalMove);
        }

        state.moves.push(chess_move.clone());
        let standing = self.rules.standing(&BoardView {
            mode,
            seated: &seated,
            moves: &state.moves,
            mover,
        });
        state.eliminate_missing(&standing.alive);

        let result = match standing.verdict {
            Some(Verdict::Won(colors)) => Some(MatchResult {
                winners: state.players_for(&colors),
                reason: EndReason::Victory,
            }),
            Some(Verdict::Draw) => Some(MatchResult {
                winners: Vec::new(),
                reason: EndReason::Draw,
            }),
            // forfeits are not visible to the engine
            None => Self::decided_by_seats(mode, state, EndReason::Victory),
        };
        if result.is_none() {
            state.advance_turn();
        }
        let game_state = state.clone();

        self.fanout.multicast(
            room.members.iter(),
            &ServerMessage::GameMove {
                room_id,
                player_id: player_id.to_string(),
                chess_move,
                game_state: game_state.clone(),
            },
            None,
        );
        log::debug!("Room {}: move {} by {}", room_id, game_state.moves.len(), player_id);

        let concluded = match result {
            Some(result) => Some(self.conclude(room, result)?),
            None => None,
        };
        drop(guard);

        if let Some(concluded) = concluded {
            self.after_conclusion(room_id, concluded);
        }
        Ok(game_state)
    }

    /// End a `playing` room whose remaining active seats are one player or one team.
    /// Called after a seat was forfeited; a no-op when the game goes on.
    pub fn settle_forfeit(&self, room_id: RoomId) -> Result<Option<MatchResult>, LobbyError> {
        let handle = self.rooms.entry(room_id)?;
        let mut guard = lock(&handle)?;
        self.rooms.ensure_live(room_id)?;
        let room: &mut GameRoom = &mut guard;
        if room.status != RoomStatus::Playing {
            return Ok(None);
        }
        let mode = room.game_mode;
        let Some(result) = room
            .game_state
            .as_ref()
            .and_then(|state| Self::decided_by_seats(mode, state, EndReason::Forfeit))
        else {
            return Ok(None);
        };
        log::info!("Room {}: decided by forfeit, winners {:?}", room_id, result.winners);
        let concluded = self.conclude(room, result.clone())?;
        drop(guard);

        self.after_conclusion(room_id, concluded);
        Ok(Some(result))
    }

    /// Result implied by the active seats alone, if they leave one side standing.
    fn decided_by_seats(
        mode: GameMode,
        state: &GameState,
        reason: EndReason,
    ) -> Option<MatchResult> {
        let active = state.active_colors();
        if active.is_empty() {
            return Some(MatchResult {
                winners: Vec::new(),
                reason: EndReason::Abandoned,
            });
        }
        let mode_winners = mode.decided(&state.seated_colors(), &active)?;
        let winners = match reason {
            // eliminated teammates share a victory; forfeited ones walked away
            EndReason::Victory => state.players_for(&mode_winners),
            _ => state
                .active_seats()
                .filter(|s| mode_winners.contains(&s.color))
                .map(|s| s.player_id.clone())
                .collect(),
        };
        Some(MatchResult { winners, reason })
    }

    /// `playing` -> `finished`: settle ratings and history, announce, archive the room.
    /// Runs under the room lock.
    fn conclude(&self, room: &mut GameRoom, result: MatchResult) -> Result<Concluded, LobbyError> {
        room.finish(result.clone())?;
        let state = room
            .game_state
            .as_ref()
            .ok_or(LobbyError::Internal("finished room without game state"))?;
        let seat_ids: Vec<PlayerId> = state.seats.iter().map(|s| s.player_id.clone()).collect();

        let advancing = match result.winners.first() {
            Some(first) => Some(first.clone()),
            None if result.is_draw() => {
                // highest rating first; the stable sort keeps seat order on ties
                let mut ratings = self.registry.ratings(seat_ids.iter());
                ratings.sort_by_key(|(_, rating)| std::cmp::Reverse(*rating));
                ratings.into_iter().next().map(|(id, _)| id)
            }
            None => None,
        };

        let settlement = if result.reason == EndReason::Abandoned {
            Settlement::default()
        } else {
            self.registry.record_game(&CompletedGame {
                room_id: room.id,
                game_mode: room.game_mode,
                biome: room.biome.clone(),
                tournament_id: room.tournament_id,
                seats: seat_ids
                    .iter()
                    .map(|id| (id.clone(), result.winners.contains(id)))
                    .collect(),
                draw: result.is_draw(),
                moves: state.moves.len(),
                started_at: state.started_at,
            })?
        };

        let snapshot = self.rooms.describe(room);
        self.fanout.multicast(
            room.members.iter(),
            &ServerMessage::GameFinished {
                room: snapshot,
                result: result.clone(),
                rating_changes: settlement.rating_changes,
                achievements: settlement.achievements,
            },
            None,
        );
        self.rooms.retire(room.id)?;
        log::info!(
            "Room {} finished ({:?}), winners {:?}",
            room.id,
            result.reason,
            result.winners
        );
        Ok(Concluded {
            tournament_id: room.tournament_id,
            advancing,
        })
    }

    /// Room lock released: refresh the room list and feed the bracket.
    fn after_conclusion(&self, room_id: RoomId, concluded: Concluded) {
        self.rooms.broadcast_room_list();
        if let Some(tournament_id) = concluded.tournament_id {
            if let Err(e) =
                self.tournaments
                    .record_result(tournament_id, room_id, concluded.advancing)
            {
                log::warn!(
                    "Could not record result of room {} in tournament {}: {}",
                    room_id,
                    tournament_id,
                    e
                );
            }
        }
    }
}
