//! Data structures for the lobby: players, histories, rooms, tournaments and moves.

mod chess;
mod history;
mod player;
mod room;
mod tournament;

pub use chess::{ChessMove, Color, GameMode, Piece, PieceKind, SpecialMove, Square};
pub use history::{
    Achievement, AchievementKind, GameHistoryEntry, GameOutcome, PlayerHistory, RatingChange,
    Rarity, UnlockedAchievement,
};
pub use player::{
    validate_name, ConnectionType, DeviceType, Player, PlayerId, PlayerSummary, INITIAL_RATING,
    MAX_NAME_LEN,
};
pub use room::{
    EndReason, GameRoom, GameState, MatchResult, Removal, RoomId, RoomSnapshot, RoomStatus, Seat,
    SeatState,
};
pub use tournament::{
    Round, RoundStatus, Tournament, TournamentId, TournamentMatch, TournamentSnapshot,
    TournamentStatus,
};
