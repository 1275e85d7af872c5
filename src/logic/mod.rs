//! Lobby components: registry, rooms, matchmaking, tournaments and the game relay.

mod bracket;
mod matchmaking;
mod rating;
pub mod registry;
pub mod relay;
pub mod rooms;
mod rules;
pub mod tournaments;

pub use bracket::{group_players, round_sizes, Grouping};
pub use matchmaking::{select_opponents, MatchOutcome, Matchmaker};
pub use rating::{expected_score, rating_changes, RatedSeat, K_FACTOR};
pub use registry::{CompletedGame, PlayerRegistry, Registration, Settlement};
pub use relay::GameRelay;
pub use rooms::{Departure, NewRoom, RoomHandle, RoomManager};
pub use rules::{BoardView, KingCaptureRules, RuleEngine, Standing, Verdict};
pub use tournaments::{NewTournament, TournamentManager};
