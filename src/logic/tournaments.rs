//! Tournament Manager: registration, automatic start, bracket rounds and winner.
//!
//! Lock order is tournament -> room -> registry. Match rooms are ordinary rooms tagged
//! with the tournament id; results come back through [`TournamentManager::record_result`].

use crate::error::{lock, read, write, LobbyError};
use crate::gateway::fanout::Fanout;
use crate::gateway::protocol::ServerMessage;
use crate::logic::bracket::{group_players, round_sizes};
use crate::logic::registry::PlayerRegistry;
use crate::logic::rooms::RoomManager;
use crate::models::{
    AchievementKind, GameMode, PlayerId, RoomId, Round, RoundStatus, Tournament, TournamentId,
    TournamentMatch, TournamentSnapshot, TournamentStatus,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Parameters of `create_tournament`.
#[derive(Clone, Debug)]
pub struct NewTournament {
    pub name: String,
    pub game_mode: GameMode,
    pub biome: String,
    pub max_participants: Option<usize>,
}

pub struct TournamentManager {
    tournaments: RwLock<HashMap<TournamentId, Arc<Mutex<Tournament>>>>,
    rooms: Arc<RoomManager>,
    registry: Arc<PlayerRegistry>,
    fanout: Arc<Fanout>,
    min_participants: usize,
    default_max_participants: usize,
}

impl TournamentManager {
    pub fn new(
        rooms: Arc<RoomManager>,
        registry: Arc<PlayerRegistry>,
        fanout: Arc<Fanout>,
        min_participants: usize,
        default_max_participants: usize,
    ) -> Self {
        Self {
            tournaments: RwLock::new(HashMap::new()),
            rooms,
            registry,
            fanout,
            min_participants: min_participants.max(2),
            default_max_participants,
        }
    }

    /// Create a tournament in Registration and announce the new tournament list.
    pub fn create(&self, new: NewTournament) -> Result<TournamentSnapshot, LobbyError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(LobbyError::validation("Tournament name must not be empty"));
        }
        let max = new.max_participants.unwrap_or(self.default_max_participants);
        if max < self.min_participants {
            return Err(LobbyError::validation(format!(
                "maxParticipants must be at least {}",
                self.min_participants
            )));
        }
        let tournament = Tournament::new(name, new.game_mode, new.biome, max);
        let snapshot = self.describe(&tournament);
        log::info!("Created tournament {} ({})", tournament.id, tournament.name);
        write(&self.tournaments)?.insert(tournament.id, Arc::new(Mutex::new(tournament)));

        let tournaments = self.list();
        self.fanout
            .broadcast(&ServerMessage::TournamentListUpdated { tournaments }, None);
        Ok(snapshot)
    }

    /// Register a participant. The join that brings the count to the minimum starts the
    /// tournament; later joins fail with `InvalidState`.
    pub fn join(
        &self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> Result<TournamentSnapshot, LobbyError> {
        self.registry.lookup(player_id)?;
        let handle = self.entry(tournament_id)?;
        let mut t = lock(&handle)?;
        t.add_participant(player_id)?;
        self.fanout.unicast(
            player_id,
            &ServerMessage::TournamentJoined {
                tournament: self.describe(&t),
            },
        );

        if t.status == TournamentStatus::Registration
            && t.participants.len() >= self.min_participants
        {
            self.start_bracket(&mut t)?;
        }
        Ok(self.describe(&t))
    }

    /// Close the current round once every match is resolved and open the next one.
    pub fn advance_round(
        &self,
        tournament_id: TournamentId,
    ) -> Result<TournamentSnapshot, LobbyError> {
        let handle = self.entry(tournament_id)?;
        let mut t = lock(&handle)?;
        if t.status != TournamentStatus::Active {
            return Err(LobbyError::invalid_state("Tournament is not running"));
        }
        if !t.round().is_some_and(Round::is_resolved) {
            return Err(LobbyError::invalid_state(
                "Current round still has unfinished matches",
            ));
        }
        self.advance(&mut t)?;
        Ok(self.describe(&t))
    }

    /// Record the outcome of a match room. `advancing` is `None` when nobody goes through.
    /// Unknown or already resolved matches are ignored.
    pub fn record_result(
        &self,
        tournament_id: TournamentId,
        room_id: RoomId,
        advancing: Option<PlayerId>,
    ) -> Result<(), LobbyError> {
        let handle = self.entry(tournament_id)?;
        let mut t = lock(&handle)?;
        if t.status != TournamentStatus::Active {
            return Ok(());
        }
        let Some(round) = t.round_mut() else {
            return Ok(());
        };
        let Some(slot) = round
            .matches
            .iter_mut()
            .find(|m| m.room_id == room_id && !m.resolved)
        else {
            return Ok(());
        };
        log::info!(
            "Tournament {} round {}: match {} resolved, advancing {:?}",
            tournament_id,
            round.round_number,
            room_id,
            advancing
        );
        slot.advancing = advancing;
        slot.resolved = true;

        if round.is_resolved() {
            self.advance(&mut t)?;
        }
        Ok(())
    }

    pub fn snapshot(&self, tournament_id: TournamentId) -> Result<TournamentSnapshot, LobbyError> {
        let handle = self.entry(tournament_id)?;
        let t = lock(&handle)?;
        Ok(self.describe(&t))
    }

    pub fn list(&self) -> Vec<TournamentSnapshot> {
        let handles: Vec<Arc<Mutex<Tournament>>> = match read(&self.tournaments) {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => return Vec::new(),
        };
        let mut snapshots: Vec<TournamentSnapshot> = handles
            .iter()
            .filter_map(|h| lock(h).ok().map(|t| self.describe(&t)))
            .collect();
        snapshots.sort_by_key(|s| s.tournament.created_at);
        snapshots
    }

    fn entry(&self, tournament_id: TournamentId) -> Result<Arc<Mutex<Tournament>>, LobbyError> {
        read(&self.tournaments)?
            .get(&tournament_id)
            .cloned()
            .ok_or(LobbyError::NotFound("Tournament"))
    }

    fn describe(&self, t: &Tournament) -> TournamentSnapshot {
        TournamentSnapshot {
            tournament: t.clone(),
            players: self.registry.summaries(t.participants.iter()),
        }
    }

    /// Registration -> Active: plan round shells and materialise round 1.
    fn start_bracket(&self, t: &mut Tournament) -> Result<(), LobbyError> {
        t.status = TournamentStatus::Active;
        t.start_time = Some(Utc::now());
        t.rounds = round_sizes(t.participants.len(), t.game_mode.occupancy())
            .into_iter()
            .enumerate()
            .map(|(i, size)| Round::shell(i as u32 + 1, size))
            .collect();
        t.current_round = 0;
        log::info!(
            "Tournament {} started with {} participants, {} planned rounds",
            t.id,
            t.participants.len(),
            t.rounds.len()
        );

        let roster = t.participants.clone();
        self.materialize_round(t, roster)?;
        self.fanout.multicast(
            t.participants.iter(),
            &ServerMessage::TournamentStarted {
                tournament: self.describe(t),
            },
            None,
        );
        Ok(())
    }

    /// Open one seated room per group of the current round; a lone trailing player gets a bye.
    fn materialize_round(
        &self,
        t: &mut Tournament,
        roster: Vec<PlayerId>,
    ) -> Result<(), LobbyError> {
        let grouping = group_players(&roster, t.game_mode.occupancy());
        if !grouping.byes.is_empty() {
            log::warn!(
                "Tournament {} round {}: bye for {:?}",
                t.id,
                t.current_round + 1,
                grouping.byes
            );
        }

        let mut matches = Vec::with_capacity(grouping.matches.len());
        for (i, group) in grouping.matches.into_iter().enumerate() {
            let room_id = Uuid::new_v4();
            self.rooms.open_seated(
                room_id,
                format!("{} - Round {} - Match {}", t.name, t.current_round + 1, i + 1),
                t.game_mode,
                t.biome.clone(),
                group.clone(),
                Some(t.id),
            )?;
            matches.push(TournamentMatch {
                room_id,
                players: group,
                advancing: None,
                resolved: false,
            });
        }

        let round_number = t.current_round as u32 + 1;
        if t.round().is_none() {
            t.rounds.push(Round::shell(round_number, roster.len()));
        }
        if let Some(round) = t.round_mut() {
            round.expected_players = roster.len();
            round.matches = matches;
            round.byes = grouping.byes;
            round.status = RoundStatus::Active;
        }
        self.rooms.broadcast_room_list();
        Ok(())
    }

    fn advance(&self, t: &mut Tournament) -> Result<(), LobbyError> {
        let advancing = match t.round_mut() {
            Some(round) => {
                round.status = RoundStatus::Completed;
                round.advancing_players()
            }
            None => Vec::new(),
        };

        if advancing.len() <= 1 {
            return self.finish(t, advancing.into_iter().next());
        }

        t.current_round += 1;
        // rounds after the current one were only planned; results may reshape them
        t.rounds.truncate(t.current_round + 1);
        self.materialize_round(t, advancing)?;
        let round_number = t.current_round as u32 + 1;
        log::info!("Tournament {} advanced to round {}", t.id, round_number);
        self.fanout.multicast(
            t.participants.iter(),
            &ServerMessage::TournamentRoundStarted {
                tournament: self.describe(t),
                round_number,
            },
            None,
        );
        Ok(())
    }

    fn finish(&self, t: &mut Tournament, winner: Option<PlayerId>) -> Result<(), LobbyError> {
        t.status = TournamentStatus::Finished;
        t.end_time = Some(Utc::now());
        t.rounds.truncate(t.current_round + 1);
        if let Some(winner) = &winner {
            self.registry.unlock(winner, AchievementKind::TournamentWinner)?;
        }
        t.winner = winner;
        log::info!("Tournament {} finished, winner {:?}", t.id, t.winner);
        self.fanout.multicast(
            t.participants.iter(),
            &ServerMessage::TournamentFinished {
                tournament: self.describe(t),
            },
            None,
        );
        Ok(())
    }
}
