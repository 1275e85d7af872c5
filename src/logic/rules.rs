//! Chess-rule collaborator: move legality and victory conditions.
//!
//! The lobby only needs a synchronous, side-effect free answer to "is this move legal"
//! and "who is still in the game". Engines with full movement geometry plug in through
//! [`RuleEngine`].

use crate::models::{ChessMove, Color, GameMode, PieceKind, Square};

/// Board as seen by the rule engine: the mode, the seated colours and the move log so far.
#[derive(Clone, Copy, Debug)]
pub struct BoardView<'a> {
    pub mode: GameMode,
    pub seated: &'a [Color],
    pub moves: &'a [ChessMove],
    /// Colour whose turn it is.
    pub mover: Color,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Colours on the winning side.
    Won(Vec<Color>),
    /// Stalemate or any other drawn position.
    Draw,
}

/// Colours still in the game and, if the game is over, how it ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Standing {
    pub alive: Vec<Color>,
    pub verdict: Option<Verdict>,
}

pub trait RuleEngine: Send + Sync {
    /// Whether `mv` is legal for `board.mover` on `board`.
    fn is_legal(&self, board: &BoardView<'_>, mv: &ChessMove) -> bool;

    /// Check / elimination / mate status after the last move in `board.moves`.
    fn standing(&self, board: &BoardView<'_>) -> Standing;
}

/// Geometry, ownership and capture checks; a colour is out once its king is captured.
#[derive(Clone, Copy, Debug, Default)]
pub struct KingCaptureRules;

impl KingCaptureRules {
    fn on_board(mode: GameMode, square: Square) -> bool {
        match mode {
            GameMode::TwoPlayer => square.row < 8 && square.col < 8,
            // triangular board: row r holds columns 0..=r
            GameMode::ThreePlayer => square.row < 9 && square.col <= square.row,
            GameMode::FourPlayer => square.row < 10 && square.col < 10,
        }
    }

    fn team_game(board: &BoardView<'_>) -> bool {
        board.mode == GameMode::FourPlayer
            && board.seated.iter().any(|c| c.team() == 0)
            && board.seated.iter().any(|c| c.team() == 1)
    }
}

impl RuleEngine for KingCaptureRules {
    fn is_legal(&self, board: &BoardView<'_>, mv: &ChessMove) -> bool {
        if mv.from == mv.to {
            return false;
        }
        if !Self::on_board(board.mode, mv.from) || !Self::on_board(board.mode, mv.to) {
            return false;
        }
        if mv.piece.is_some_and(|p| p.color != board.mover) {
            return false;
        }
        match mv.captured_piece {
            Some(target) if target.color == board.mover => false,
            Some(target) if Self::team_game(board) && target.color.is_teammate_of(board.mover) => {
                false
            }
            Some(target) => board.seated.contains(&target.color),
            None => true,
        }
    }

    fn standing(&self, board: &BoardView<'_>) -> Standing {
        let fallen: Vec<Color> = board
            .moves
            .iter()
            .filter_map(|m| m.captured_piece)
            .filter(|p| p.kind == PieceKind::King)
            .map(|p| p.color)
            .collect();
        let alive: Vec<Color> = board
            .seated
            .iter()
            .copied()
            .filter(|c| !fallen.contains(c))
            .collect();
        let verdict = board.mode.decided(board.seated, &alive).map(Verdict::Won);
        Standing { alive, verdict }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view<'a>(
        mode: GameMode,
        seated: &'a [Color],
        moves: &'a [ChessMove],
        mover: Color,
    ) -> BoardView<'a> {
        BoardView {
            mode,
            seated,
            moves,
            mover,
        }
    }

    #[test]
    fn rejects_off_board_and_null_moves() {
        let seated = GameMode::TwoPlayer.colors();
        let b = view(GameMode::TwoPlayer, seated, &[], Color::White);
        assert!(KingCaptureRules.is_legal(&b, &ChessMove::new((6, 4), (4, 4))));
        assert!(!KingCaptureRules.is_legal(&b, &ChessMove::new((6, 4), (8, 4))));
        assert!(!KingCaptureRules.is_legal(&b, &ChessMove::new((6, 4), (6, 4))));
    }

    #[test]
    fn triangular_board_excludes_upper_half() {
        let seated = GameMode::ThreePlayer.colors();
        let b = view(GameMode::ThreePlayer, seated, &[], Color::White);
        assert!(KingCaptureRules.is_legal(&b, &ChessMove::new((8, 0), (7, 7))));
        assert!(!KingCaptureRules.is_legal(&b, &ChessMove::new((8, 0), (2, 5))));
    }

    #[test]
    fn rejects_moving_someone_elses_piece() {
        let seated = GameMode::TwoPlayer.colors();
        let b = view(GameMode::TwoPlayer, seated, &[], Color::White);
        let mv = ChessMove::new((1, 0), (2, 0)).with_piece(PieceKind::Pawn, Color::Black);
        assert!(!KingCaptureRules.is_legal(&b, &mv));
    }

    #[test]
    fn four_player_forbids_teammate_capture() {
        let seated = GameMode::FourPlayer.colors();
        let b = view(GameMode::FourPlayer, seated, &[], Color::White);
        let on_teammate = ChessMove::new((9, 0), (8, 0)).capturing(PieceKind::Pawn, Color::Black);
        let on_enemy = ChessMove::new((9, 0), (8, 0)).capturing(PieceKind::Pawn, Color::Red);
        assert!(!KingCaptureRules.is_legal(&b, &on_teammate));
        assert!(KingCaptureRules.is_legal(&b, &on_enemy));
    }

    #[test]
    fn king_capture_decides_two_player_game() {
        let seated = GameMode::TwoPlayer.colors();
        let moves = [ChessMove::new((1, 4), (0, 4)).capturing(PieceKind::King, Color::Black)];
        let s = KingCaptureRules.standing(&view(GameMode::TwoPlayer, seated, &moves, Color::White));
        assert_eq!(s.alive, vec![Color::White]);
        assert_eq!(s.verdict, Some(Verdict::Won(vec![Color::White])));
    }

    #[test]
    fn team_survives_while_one_king_stands() {
        let seated = GameMode::FourPlayer.colors();
        let one_down = [ChessMove::new((1, 1), (0, 0)).capturing(PieceKind::King, Color::Red)];
        let board = view(GameMode::FourPlayer, seated, &one_down, Color::White);
        let s = KingCaptureRules.standing(&board);
        assert_eq!(s.verdict, None);

        let both_down = [
            one_down[0].clone(),
            ChessMove::new((2, 2), (9, 9)).capturing(PieceKind::King, Color::Blue),
        ];
        let board = view(GameMode::FourPlayer, seated, &both_down, Color::Black);
        let s = KingCaptureRules.standing(&board);
        assert_eq!(s.verdict, Some(Verdict::Won(vec![Color::White, Color::Black])));
    }
}
