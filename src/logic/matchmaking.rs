//! Matchmaker: seat the requester with the closest-rated connected players.

use crate::error::LobbyError;
use crate::gateway::fanout::Fanout;
use crate::gateway::protocol::ServerMessage;
use crate::logic::registry::PlayerRegistry;
use crate::logic::rooms::RoomManager;
use crate::models::{GameMode, Player, PlayerId, RoomSnapshot};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub enum MatchOutcome {
    Matched(RoomSnapshot),
    /// Not enough candidates in range. Requests are not queued.
    Failed(String),
}

/// Pick `needed` opponents within `rating_range` of the requester, closest first.
///
/// `pool` is in registration order, which breaks distance ties.
pub fn select_opponents(
    requester: &Player,
    pool: &[&Player],
    rating_range: i32,
    needed: usize,
) -> Option<Vec<PlayerId>> {
    let mut in_range: Vec<(i32, &Player)> = pool
        .iter()
        .map(|p| ((p.rating - requester.rating).abs(), *p))
        .filter(|(distance, _)| *distance <= rating_range)
        .collect();
    // stable sort keeps registration order among equal distances
    in_range.sort_by_key(|(distance, _)| *distance);
    if in_range.len() < needed {
        return None;
    }
    Some(
        in_range
            .into_iter()
            .take(needed)
            .map(|(_, p)| p.id.clone())
            .collect(),
    )
}

pub struct Matchmaker {
    registry: Arc<PlayerRegistry>,
    rooms: Arc<RoomManager>,
    fanout: Arc<Fanout>,
}

impl Matchmaker {
    pub fn new(
        registry: Arc<PlayerRegistry>,
        rooms: Arc<RoomManager>,
        fanout: Arc<Fanout>,
    ) -> Self {
        Self {
            registry,
            rooms,
            fanout,
        }
    }

    /// One synchronous attempt. On success every matched player gets `matchmaking_success`;
    /// on failure only the requester hears `matchmaking_failed`.
    pub fn request_match(
        &self,
        player_id: &str,
        game_mode: GameMode,
        biome: &str,
        rating_range: i32,
    ) -> Result<MatchOutcome, LobbyError> {
        if rating_range < 0 {
            return Err(LobbyError::validation("ratingRange must not be negative"));
        }
        let needed = game_mode.occupancy() - 1;
        let room_id = Uuid::new_v4();
        let reserved = self.registry.reserve_opponents(player_id, room_id, |me, pool| {
            select_opponents(me, pool, rating_range, needed)
        })?;

        let Some(seated) = reserved else {
            let message = "No suitable opponents found".to_string();
            log::debug!(
                "Matchmaking failed for {} ({}, range {})",
                player_id,
                game_mode.as_str(),
                rating_range
            );
            self.fanout.unicast(
                player_id,
                &ServerMessage::MatchmakingFailed {
                    message: message.clone(),
                },
            );
            return Ok(MatchOutcome::Failed(message));
        };

        let opened = self.rooms.open_seated(
            room_id,
            format!("Auto Match - {}", game_mode.as_str()),
            game_mode,
            biome.to_string(),
            seated.clone(),
            None,
        );
        let room = match opened {
            Ok(room) => room,
            Err(e) => {
                self.registry.release_reservations(seated.iter(), room_id)?;
                return Err(e);
            }
        };
        log::info!("Matched {:?} into room {}", seated, room_id);
        for id in &seated {
            self.fanout.unicast(
                id,
                &ServerMessage::MatchmakingSuccess { room: room.clone() },
            );
        }
        self.rooms.broadcast_room_list();
        Ok(MatchOutcome::Matched(room))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, rating: i32, seq: u64) -> Player {
        let mut p = Player::new(id, id, seq);
        p.rating = rating;
        p
    }

    #[test]
    fn closest_first_with_registration_tiebreak() {
        let me = player("me", 1200, 0);
        let far = player("far", 1390, 1);
        let tie_a = player("tie_a", 1250, 2);
        let tie_b = player("tie_b", 1150, 3);
        let near = player("near", 1210, 4);
        let pool = [&far, &tie_a, &tie_b, &near];
        assert_eq!(
            select_opponents(&me, &pool, 200, 3),
            Some(vec!["near".to_string(), "tie_a".to_string(), "tie_b".to_string()])
        );
    }

    #[test]
    fn out_of_range_candidates_are_ignored() {
        let me = player("me", 1200, 0);
        let far = player("far", 1500, 1);
        assert_eq!(select_opponents(&me, &[&far], 100, 1), None);
    }

    #[test]
    fn insufficient_candidates_fail() {
        let me = player("me", 1200, 0);
        let one = player("one", 1200, 1);
        assert_eq!(select_opponents(&me, &[&one], 100, 3), None);
    }
}
