use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Score of a single team as reported by a server info tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScore {
    pub team_id: u32,
    pub score: i32,
}

/// Periodic server status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub game_mode: String,
    pub team_scores: Vec<TeamScore>,
}

impl ServerInfo {
    pub fn new(game_mode: impl Into<String>, scores: &[i32]) -> Self {
        Self {
            game_mode: game_mode.into(),
            team_scores: scores
                .iter()
                .enumerate()
                .map(|(i, score)| TeamScore {
                    team_id: i as u32 + 1,
                    score: *score,
                })
                .collect(),
        }
    }

    /// Whether the mode is one of the Conquest variants (ConquestLarge0, ConquestSmall0, ...)
    pub fn is_conquest(&self) -> bool {
        self.game_mode.to_lowercase().contains("conquest")
    }
}

/// Kill record. Delivered to every message but no trigger uses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kill {
    pub killer: String,
    pub victim: String,
    pub weapon: String,
    pub headshot: bool,
}

/// Lifecycle events delivered by the game server host
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum GameEvent {
    /// Level loaded and a new round is starting
    #[strum(serialize = "round started")]
    RoundStarted {
        map: String,
        mode: String,
        round: u32,
        total_rounds: u32,
    },
    /// Round over, also raised for next-level and restart-level
    #[strum(serialize = "round ended")]
    RoundEnded { winning_team: u32 },
    #[strum(serialize = "player joined")]
    PlayerJoined { name: String },
    #[strum(serialize = "player spawned")]
    PlayerSpawned { name: String },
    #[strum(serialize = "player left")]
    PlayerLeft { name: String },
    #[strum(serialize = "player killed")]
    PlayerKilled(Kill),
    #[strum(serialize = "server info")]
    ServerInfo(ServerInfo),
}

impl GameEvent {
    pub fn joined(name: impl Into<String>) -> Self {
        GameEvent::PlayerJoined { name: name.into() }
    }

    pub fn spawned(name: impl Into<String>) -> Self {
        GameEvent::PlayerSpawned { name: name.into() }
    }

    pub fn left(name: impl Into<String>) -> Self {
        GameEvent::PlayerLeft { name: name.into() }
    }

    pub fn round_started(map: impl Into<String>, mode: impl Into<String>) -> Self {
        GameEvent::RoundStarted {
            map: map.into(),
            mode: mode.into(),
            round: 0,
            total_rounds: 0,
        }
    }

    pub fn round_ended(winning_team: u32) -> Self {
        GameEvent::RoundEnded { winning_team }
    }

    pub fn server_info(game_mode: impl Into<String>, scores: &[i32]) -> Self {
        GameEvent::ServerInfo(ServerInfo::new(game_mode, scores))
    }
}
