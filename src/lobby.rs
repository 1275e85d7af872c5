//! The coordinating service object: owns every component, built once at startup.

use crate::config::Config;
use crate::error::LobbyError;
use crate::gateway::fanout::Fanout;
use crate::logic::{
    Departure, GameRelay, KingCaptureRules, Matchmaker, PlayerRegistry, RoomManager, RuleEngine,
    TournamentManager,
};
use crate::models::{RoomId, RoomStatus};
use std::sync::Arc;

pub struct Lobby {
    pub config: Config,
    pub fanout: Arc<Fanout>,
    pub registry: Arc<PlayerRegistry>,
    pub rooms: Arc<RoomManager>,
    pub matchmaker: Matchmaker,
    pub tournaments: Arc<TournamentManager>,
    pub relay: GameRelay,
}

impl Lobby {
    pub fn new(config: Config, rules: Arc<dyn RuleEngine>) -> Self {
        let fanout = Arc::new(Fanout::new());
        let registry = Arc::new(PlayerRegistry::new(fanout.clone()));
        let rooms = Arc::new(RoomManager::new(registry.clone(), fanout.clone()));
        let matchmaker = Matchmaker::new(registry.clone(), rooms.clone(), fanout.clone());
        let tournaments = Arc::new(TournamentManager::new(
            rooms.clone(),
            registry.clone(),
            fanout.clone(),
            config.tournament_min_participants,
            config.tournament_max_participants,
        ));
        let relay = GameRelay::new(
            rooms.clone(),
            registry.clone(),
            tournaments.clone(),
            rules,
            fanout.clone(),
        );
        Self {
            config,
            fanout,
            registry,
            rooms,
            matchmaker,
            tournaments,
            relay,
        }
    }

    /// Lobby with the bundled [`KingCaptureRules`].
    pub fn with_default_rules(config: Config) -> Self {
        Self::new(config, Arc::new(KingCaptureRules))
    }

    /// Explicit `leave_room` or an implicit leave on disconnect.
    pub fn leave_room(&self, room_id: RoomId, player_id: &str) -> Result<Departure, LobbyError> {
        let departure = self.rooms.leave(room_id, player_id)?;
        self.after_departure(&departure);
        Ok(departure)
    }

    /// Forfeit scoring and bracket bookkeeping once the room lock is released.
    fn after_departure(&self, departure: &Departure) {
        if departure.forfeited && !departure.retired {
            if let Err(e) = self.relay.settle_forfeit(departure.room_id) {
                log::warn!("Could not settle forfeit in room {}: {}", departure.room_id, e);
            }
        }

        let Some(tournament_id) = departure.tournament_id else {
            return;
        };
        let advancing = match departure.status {
            RoomStatus::Waiting if departure.remaining.len() == 1 => {
                log::info!(
                    "Tournament {}: walkover for {} in room {}",
                    tournament_id,
                    departure.remaining[0],
                    departure.room_id
                );
                Some(departure.remaining[0].clone())
            }
            RoomStatus::Waiting | RoomStatus::Playing if departure.retired => None,
            _ => return,
        };
        if let Err(e) = self
            .tournaments
            .record_result(tournament_id, departure.room_id, advancing)
        {
            log::warn!(
                "Could not record departure from room {} in tournament {}: {}",
                departure.room_id,
                tournament_id,
                e
            );
        }
    }
}
