//! Elo rating updates for two- and multi-seat games.

use crate::models::PlayerId;

pub const K_FACTOR: f64 = 32.0;

/// Expected score of `rating` against `opponent`.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// A seat's rating going into the game and whether it ended on the winning side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RatedSeat {
    pub player_id: PlayerId,
    pub rating: i32,
    pub won: bool,
}

/// New rating per seat, in seat order.
///
/// Each player's delta is the mean over contested opponents: on a draw everyone contests
/// everyone at 0.5, otherwise only winner/loser pairs count (teammates do not).
pub fn rating_changes(seats: &[RatedSeat], draw: bool) -> Vec<(PlayerId, i32)> {
    seats
        .iter()
        .map(|me| {
            let mut total = 0.0;
            let mut contested = 0u32;
            for other in seats.iter().filter(|o| o.player_id != me.player_id) {
                let score = if draw {
                    0.5
                } else if me.won && !other.won {
                    1.0
                } else if !me.won && other.won {
                    0.0
                } else {
                    continue;
                };
                total += score - expected_score(me.rating, other.rating);
                contested += 1;
            }
            let delta = if contested == 0 {
                0
            } else {
                (K_FACTOR * total / f64::from(contested)).round() as i32
            };
            (me.player_id.clone(), me.rating + delta)
        })
        .collect()
}
