//! Wire protocol: `{ "type": ..., "data": { ... } }` JSON envelopes.

use crate::error::LobbyError;
use crate::models::{
    ChessMove, ConnectionType, DeviceType, GameMode, GameState, MatchResult, Player, PlayerHistory,
    PlayerId, PlayerSummary, RatingChange, RoomId, RoomSnapshot, TournamentId, TournamentSnapshot,
    UnlockedAchievement,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound `type` values the gateway routes.
pub const CLIENT_MESSAGE_TYPES: [&str; 13] = [
    "register_player",
    "find_nearby_players",
    "create_room",
    "join_room",
    "leave_room",
    "start_game",
    "game_move",
    "create_tournament",
    "join_tournament",
    "get_player_history",
    "get_leaderboard",
    "invite_player",
    "matchmaking_request",
];

fn default_biome() -> String {
    "forest".to_string()
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardCategory {
    #[default]
    Rating,
    GamesWon,
    GamesPlayed,
}

/// Client -> server messages.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    RegisterPlayer {
        player_id: Option<PlayerId>,
        name: String,
        avatar: Option<String>,
        #[serde(default)]
        device_type: DeviceType,
        #[serde(default)]
        connection_type: ConnectionType,
    },
    FindNearbyPlayers {
        player_id: Option<PlayerId>,
    },
    CreateRoom {
        name: String,
        game_mode: GameMode,
        #[serde(default = "default_biome")]
        biome: String,
        #[serde(default)]
        is_private: bool,
        password: Option<String>,
    },
    JoinRoom {
        room_id: RoomId,
        player_id: Option<PlayerId>,
        password: Option<String>,
    },
    LeaveRoom {
        room_id: RoomId,
        player_id: Option<PlayerId>,
    },
    StartGame {
        room_id: RoomId,
    },
    GameMove {
        room_id: RoomId,
        player_id: Option<PlayerId>,
        #[serde(rename = "move")]
        chess_move: ChessMove,
    },
    CreateTournament {
        name: String,
        game_mode: GameMode,
        #[serde(default = "default_biome")]
        biome: String,
        max_participants: Option<usize>,
    },
    JoinTournament {
        tournament_id: TournamentId,
        player_id: Option<PlayerId>,
    },
    GetPlayerHistory {
        player_id: Option<PlayerId>,
    },
    GetLeaderboard {
        #[serde(default)]
        category: LeaderboardCategory,
        limit: Option<usize>,
    },
    InvitePlayer {
        from_player_id: Option<PlayerId>,
        to_player_id: PlayerId,
        room_id: RoomId,
    },
    MatchmakingRequest {
        player_id: Option<PlayerId>,
        game_mode: GameMode,
        #[serde(default = "default_biome")]
        biome: String,
        rating_range: Option<i32>,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl ClientMessage {
    /// Decode one text frame. Unknown `type` and malformed payloads are distinct errors.
    pub fn decode(text: &str) -> Result<Self, LobbyError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|_| LobbyError::validation("Invalid message format"))?;
        if !CLIENT_MESSAGE_TYPES.contains(&envelope.kind.as_str()) {
            return Err(LobbyError::UnknownMessage(envelope.kind));
        }
        let data = match envelope.data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let tagged = serde_json::json!({ "type": envelope.kind, "data": data });
        serde_json::from_value(tagged).map_err(|e| {
            LobbyError::validation(format!("Invalid {} payload: {}", envelope.kind, e))
        })
    }
}

/// Server -> client messages.
#[derive(Clone, Debug, Serialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    ConnectionStatus {
        connected: bool,
        connection_id: u64,
    },
    PlayerRegistered {
        player: Player,
        rooms: Vec<RoomSnapshot>,
    },
    PlayerJoined {
        player: PlayerSummary,
    },
    NearbyPlayersFound {
        players: Vec<PlayerSummary>,
    },
    RoomCreated {
        room: RoomSnapshot,
    },
    RoomJoined {
        room: RoomSnapshot,
    },
    RoomLeft {
        room_id: RoomId,
    },
    RoomListUpdated {
        rooms: Vec<RoomSnapshot>,
    },
    PlayerJoinedRoom {
        player: PlayerSummary,
        room: RoomSnapshot,
    },
    PlayerLeftRoom {
        player_id: PlayerId,
        room: RoomSnapshot,
    },
    GameStarted {
        room: RoomSnapshot,
    },
    GameMove {
        room_id: RoomId,
        player_id: PlayerId,
        #[serde(rename = "move")]
        chess_move: ChessMove,
        game_state: GameState,
    },
    GameFinished {
        room: RoomSnapshot,
        result: MatchResult,
        rating_changes: Vec<RatingChange>,
        achievements: Vec<UnlockedAchievement>,
    },
    TournamentCreated {
        tournament: TournamentSnapshot,
    },
    TournamentListUpdated {
        tournaments: Vec<TournamentSnapshot>,
    },
    TournamentJoined {
        tournament: TournamentSnapshot,
    },
    TournamentStarted {
        tournament: TournamentSnapshot,
    },
    TournamentRoundStarted {
        tournament: TournamentSnapshot,
        round_number: u32,
    },
    TournamentFinished {
        tournament: TournamentSnapshot,
    },
    MatchmakingSuccess {
        room: RoomSnapshot,
    },
    MatchmakingFailed {
        message: String,
    },
    PlayerHistory {
        history: PlayerHistory,
    },
    Leaderboard {
        leaderboard: Vec<Player>,
        category: LeaderboardCategory,
    },
    RoomInvite {
        from: PlayerSummary,
        room: RoomSnapshot,
    },
    InviteSent {
        to_player_id: PlayerId,
        room_id: RoomId,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(err: &LobbyError) -> Self {
        ServerMessage::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }

    /// `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::ConnectionStatus { .. } => "connection_status",
            ServerMessage::PlayerRegistered { .. } => "player_registered",
            ServerMessage::PlayerJoined { .. } => "player_joined",
            ServerMessage::NearbyPlayersFound { .. } => "nearby_players_found",
            ServerMessage::RoomCreated { .. } => "room_created",
            ServerMessage::RoomJoined { .. } => "room_joined",
            ServerMessage::RoomLeft { .. } => "room_left",
            ServerMessage::RoomListUpdated { .. } => "room_list_updated",
            ServerMessage::PlayerJoinedRoom { .. } => "player_joined_room",
            ServerMessage::PlayerLeftRoom { .. } => "player_left_room",
            ServerMessage::GameStarted { .. } => "game_started",
            ServerMessage::GameMove { .. } => "game_move",
            ServerMessage::GameFinished { .. } => "game_finished",
            ServerMessage::TournamentCreated { .. } => "tournament_created",
            ServerMessage::TournamentListUpdated { .. } => "tournament_list_updated",
            ServerMessage::TournamentJoined { .. } => "tournament_joined",
            ServerMessage::TournamentStarted { .. } => "tournament_started",
            ServerMessage::TournamentRoundStarted { .. } => "tournament_round_started",
            ServerMessage::TournamentFinished { .. } => "tournament_finished",
            ServerMessage::MatchmakingSuccess { .. } => "matchmaking_success",
            ServerMessage::MatchmakingFailed { .. } => "matchmaking_failed",
            ServerMessage::PlayerHistory { .. } => "player_history",
            ServerMessage::Leaderboard { .. } => "leaderboard",
            ServerMessage::RoomInvite { .. } => "room_invite",
            ServerMessage::InviteSent { .. } => "invite_sent",
            ServerMessage::Error { .. } => "error",
        }
    }

    /// Serialize once for fan-out.
    pub fn encode(&self) -> Option<std::sync::Arc<str>> {
        match serde_json::to_string(self) {
            Ok(text) => Some(text.into()),
            Err(e) => {
                log::error!("Failed to encode {}: {}", self.kind(), e);
                None
            }
        }
    }
}
