//! Game modes, seat colours and the move payload relayed between players.

use serde::{Deserialize, Serialize};

/// Number of players a room or tournament match is built for.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    #[serde(rename = "2player")]
    TwoPlayer,
    #[serde(rename = "3player")]
    ThreePlayer,
    #[serde(rename = "4player")]
    FourPlayer,
}

impl GameMode {
    /// Seats per room (also players per tournament match).
    pub fn occupancy(self) -> usize {
        match self {
            GameMode::TwoPlayer => 2,
            GameMode::ThreePlayer => 3,
            GameMode::FourPlayer => 4,
        }
    }

    /// Turn order; seat `i` plays `colors()[i]`.
    pub fn colors(self) -> &'static [Color] {
        &Color::ALL[..self.occupancy()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::TwoPlayer => "2player",
            GameMode::ThreePlayer => "3player",
            GameMode::FourPlayer => "4player",
        }
    }

    /// Which of `alive` (a subset of `seated`) have won, if the game is decided.
    ///
    /// 4-player games are team games (white+black against red+blue) whenever both teams
    /// are seated; everything else is last player standing.
    pub fn decided(self, seated: &[Color], alive: &[Color]) -> Option<Vec<Color>> {
        let team_game = self == GameMode::FourPlayer
            && seated.iter().any(|c| c.team() == 0)
            && seated.iter().any(|c| c.team() == 1);
        if team_game {
            let team_alive = |team: u8| alive.iter().any(|c| c.team() == team);
            return match (team_alive(0), team_alive(1)) {
                (true, false) => Some(seated.iter().copied().filter(|c| c.team() == 0).collect()),
                (false, true) => Some(seated.iter().copied().filter(|c| c.team() == 1).collect()),
                _ => None,
            };
        }
        match alive {
            [only] => Some(vec![*only]),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    White,
    Black,
    Red,
    Blue,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::White, Color::Black, Color::Red, Color::Blue];

    /// Team index in 4-player team mode.
    pub fn team(self) -> u8 {
        match self {
            Color::White | Color::Black => 0,
            Color::Red | Color::Blue => 1,
        }
    }

    pub fn is_teammate_of(self, other: Color) -> bool {
        self != other && self.team() == other.team()
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub color: Color,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialMove {
    Castling,
    EnPassant,
    Promotion,
}

/// A move as sent by the client.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChessMove {
    pub from: Square,
    pub to: Square,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece: Option<Piece>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_piece: Option<Piece>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<SpecialMove>,
}

impl ChessMove {
    pub fn new(from: (u8, u8), to: (u8, u8)) -> Self {
        Self {
            from: Square { row: from.0, col: from.1 },
            to: Square { row: to.0, col: to.1 },
            piece: None,
            captured_piece: None,
            special: None,
        }
    }

    pub fn with_piece(mut self, kind: PieceKind, color: Color) -> Self {
        self.piece = Some(Piece { kind, color });
        self
    }

    pub fn capturing(mut self, kind: PieceKind, color: Color) -> Self {
        self.captured_piece = Some(Piece { kind, color });
        self
    }
}
