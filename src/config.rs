//! Server configuration read from the environment.

use std::str::FromStr;

/// Runtime settings. `Config::default()` matches an empty environment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Path of the WebSocket endpoint.
    pub ws_path: String,
    /// Participant count that triggers a tournament's automatic start.
    pub tournament_min_participants: usize,
    /// Cap used when `create_tournament` omits `maxParticipants`.
    pub tournament_max_participants: usize,
    /// Rating window used when `matchmaking_request` omits `ratingRange`.
    pub matchmaking_rating_range: i32,
    pub leaderboard_limit: usize,
    pub nearby_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            ws_path: "/multiplayer".to_string(),
            tournament_min_participants: 4,
            tournament_max_participants: 16,
            matchmaking_rating_range: 200,
            leaderboard_limit: 100,
            nearby_limit: 10,
        }
    }
}

impl Config {
    /// Override defaults with `HOST`, `PORT`, `WS_PATH` and the lobby tuning variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            ws_path: std::env::var("WS_PATH").unwrap_or(defaults.ws_path),
            tournament_min_participants: env_or(
                "TOURNAMENT_MIN_PARTICIPANTS",
                defaults.tournament_min_participants,
            ),
            tournament_max_participants: env_or(
                "TOURNAMENT_MAX_PARTICIPANTS",
                defaults.tournament_max_participants,
            ),
            matchmaking_rating_range: env_or(
                "MATCHMAKING_RATING_RANGE",
                defaults.matchmaking_rating_range,
            ),
            leaderboard_limit: env_or("LEADERBOARD_LIMIT", defaults.leaderboard_limit),
            nearby_limit: env_or("NEARBY_LIMIT", defaults.nearby_limit),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring unparseable {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
