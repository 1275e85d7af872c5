//! Multiplayer chess lobby: library with models, lobby components and the WebSocket gateway.

pub mod config;
pub mod error;
pub mod gateway;
pub mod lobby;
pub mod logic;
pub mod models;

pub use config::Config;
pub use error::LobbyError;
pub use gateway::fanout::{ConnectionId, Fanout, Outbox};
pub use gateway::protocol::{ClientMessage, LeaderboardCategory, ServerMessage};
pub use gateway::{Connection, Gateway};
pub use lobby::Lobby;
pub use logic::{
    group_players, rating_changes, round_sizes, select_opponents, BoardView, CompletedGame,
    Departure, GameRelay, Grouping, KingCaptureRules, MatchOutcome, Matchmaker, NewRoom,
    NewTournament, PlayerRegistry, RatedSeat, Registration, RoomManager, RuleEngine, Settlement,
    Standing, TournamentManager, Verdict,
};
pub use models::{
    ChessMove, Color, GameMode, GameRoom, GameState, MatchResult, Player, PlayerHistory, PlayerId,
    PlayerSummary, RoomId, RoomSnapshot, RoomStatus, Tournament, TournamentId, TournamentSnapshot,
    TournamentStatus,
};
