//! Bracket grouping: split a round's roster into matches and byes.

use crate::models::PlayerId;

/// Matches and byes for one round.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Grouping {
    pub matches: Vec<Vec<PlayerId>>,
    pub byes: Vec<PlayerId>,
}

/// Partition the roster, in order, into groups of `per_match`.
///
/// Every group of two or more becomes a match; a trailing group of one gets a bye.
pub fn group_players(roster: &[PlayerId], per_match: usize) -> Grouping {
    let mut grouping = Grouping::default();
    for chunk in roster.chunks(per_match.max(2)) {
        match chunk {
            [single] => grouping.byes.push(single.clone()),
            _ => grouping.matches.push(chunk.to_vec()),
        }
    }
    grouping
}

/// Planned number of players entering each round, until one remains.
///
/// Each match sends one player on and each bye sends one, so a round of `n` feeds
/// `ceil(n / per_match)` players into the next.
pub fn round_sizes(participants: usize, per_match: usize) -> Vec<usize> {
    let per_match = per_match.max(2);
    let mut sizes = Vec::new();
    let mut n = participants;
    while n > 1 {
        sizes.push(n);
        n = n.div_ceil(per_match);
    }
    sizes
}
