//! Per-player game log, aggregate counters and achievements.

use crate::models::player::PlayerId;
use crate::models::room::RoomId;
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Win,
    Loss,
    Draw,
}

/// One completed game from the point of view of one player.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameHistoryEntry {
    pub game_id: RoomId,
    pub game_mode: String,
    pub biome: String,
    pub players: Vec<PlayerId>,
    pub result: GameOutcome,
    pub moves: usize,
    pub duration_secs: i64,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<TournamentId>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    FirstWin,
    MultiplayerEnthusiast,
    ChessMaster,
    TournamentWinner,
}

impl AchievementKind {
    fn name(self) -> &'static str {
        match self {
            AchievementKind::FirstWin => "First Victory",
            AchievementKind::MultiplayerEnthusiast => "Social Player",
            AchievementKind::ChessMaster => "Chess Master",
            AchievementKind::TournamentWinner => "Tournament Champion",
        }
    }

    fn description(self) -> &'static str {
        match self {
            AchievementKind::FirstWin => "Win your first game",
            AchievementKind::MultiplayerEnthusiast => "Play 50 multiplayer games",
            AchievementKind::ChessMaster => "Win 100 games",
            AchievementKind::TournamentWinner => "Win a tournament",
        }
    }

    fn rarity(self) -> Rarity {
        match self {
            AchievementKind::FirstWin => Rarity::Common,
            AchievementKind::MultiplayerEnthusiast => Rarity::Rare,
            AchievementKind::ChessMaster => Rarity::Legendary,
            AchievementKind::TournamentWinner => Rarity::Epic,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: AchievementKind,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub unlocked_at: DateTime<Utc>,
}

/// Append-only history for one player. Created on first registration, never deleted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHistory {
    pub player_id: PlayerId,
    pub games: Vec<GameHistoryEntry>,
    pub achievements: Vec<Achievement>,
    pub total_games_played: u32,
    pub total_games_won: u32,
    pub rating: i32,
    pub favorite_opponents: Vec<PlayerId>,
}

impl PlayerHistory {
    pub fn new(player_id: impl Into<PlayerId>, rating: i32) -> Self {
        Self {
            player_id: player_id.into(),
            games: Vec::new(),
            achievements: Vec::new(),
            total_games_played: 0,
            total_games_won: 0,
            rating,
            favorite_opponents: Vec::new(),
        }
    }

    pub fn has(&self, kind: AchievementKind) -> bool {
        self.achievements.iter().any(|a| a.id == kind)
    }

    /// Unlock once; returns the achievement only the first time.
    pub fn unlock(&mut self, kind: AchievementKind) -> Option<Achievement> {
        if self.has(kind) {
            return None;
        }
        let achievement = Achievement {
            id: kind,
            name: kind.name().to_string(),
            description: kind.description().to_string(),
            rarity: kind.rarity(),
            unlocked_at: Utc::now(),
        };
        self.achievements.push(achievement.clone());
        Some(achievement)
    }

    /// Append a completed game, bump counters and return newly unlocked achievements.
    pub fn record_game(&mut self, entry: GameHistoryEntry, new_rating: i32) -> Vec<Achievement> {
        self.total_games_played += 1;
        if entry.result == GameOutcome::Win {
            self.total_games_won += 1;
        }
        self.rating = new_rating;
        self.games.push(entry);
        self.favorite_opponents = self.top_opponents(3);

        let mut unlocked = Vec::new();
        let thresholds = [
            (AchievementKind::FirstWin, self.total_games_won >= 1),
            (AchievementKind::MultiplayerEnthusiast, self.total_games_played >= 50),
            (AchievementKind::ChessMaster, self.total_games_won >= 100),
        ];
        for (kind, reached) in thresholds {
            if reached {
                unlocked.extend(self.unlock(kind));
            }
        }
        unlocked
    }

    /// Most frequent opponents; ties by who was met first.
    fn top_opponents(&self, n: usize) -> Vec<PlayerId> {
        let mut counts: HashMap<&PlayerId, (usize, usize)> = HashMap::new();
        let mut order = 0;
        for game in &self.games {
            for p in game.players.iter().filter(|p| **p != self.player_id) {
                let entry = counts.entry(p).or_insert((0, order));
                entry.0 += 1;
                order += 1;
            }
        }
        let mut ranked: Vec<(&PlayerId, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        ranked.into_iter().take(n).map(|(p, _)| p.clone()).collect()
    }
}

/// Rating movement of one seat in a finished game.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingChange {
    pub player_id: PlayerId,
    pub old_rating: i32,
    pub new_rating: i32,
}

/// Achievement unlocked by a player as a result of a finished game.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    pub player_id: PlayerId,
    pub achievement: Achievement,
}
