use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds a yell stays on screen when no duration is given
pub const DEFAULT_YELL_DURATION: u32 = 10;

/// Audience of a say or yell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastScope {
    All,
    Team(u32),
    Squad { team: u32, squad: u32 },
    Player(String),
}

impl BroadcastScope {
    /// Subset words appended to an admin.say / admin.yell command
    pub fn subset_words(&self) -> Vec<String> {
        match self {
            BroadcastScope::All => vec!["all".to_string()],
            BroadcastScope::Team(team) => vec!["team".to_string(), team.to_string()],
            BroadcastScope::Squad { team, squad } => vec![
                "squad".to_string(),
                team.to_string(),
                squad.to_string(),
            ],
            BroadcastScope::Player(name) => vec!["player".to_string(), name.clone()],
        }
    }
}

impl fmt::Display for BroadcastScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BroadcastScope::All => write!(f, "all"),
            BroadcastScope::Team(team) => write!(f, "Team {}", team),
            BroadcastScope::Squad { team, squad } => {
                write!(f, "Squad {} in Team {}", squad, team)
            }
            BroadcastScope::Player(name) => write!(f, "player '{}'", name),
        }
    }
}

/// A single outbound chat command. Say text is already split into
/// transmittable chunks by the time a command is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastCommand {
    Say {
        text: String,
        scope: BroadcastScope,
    },
    Yell {
        text: String,
        duration: u32,
        scope: BroadcastScope,
    },
}

impl BroadcastCommand {
    pub fn text(&self) -> &str {
        match self {
            BroadcastCommand::Say { text, .. } | BroadcastCommand::Yell { text, .. } => text,
        }
    }

    pub fn scope(&self) -> &BroadcastScope {
        match self {
            BroadcastCommand::Say { scope, .. } | BroadcastCommand::Yell { scope, .. } => scope,
        }
    }

    pub fn is_say(&self) -> bool {
        matches!(self, BroadcastCommand::Say { .. })
    }

    /// Words of the server command, e.g. `["admin.say", "hi", "player", "Alice"]`
    pub fn to_words(&self) -> Vec<String> {
        let mut words = Vec::new();
        match self {
            BroadcastCommand::Say { text, scope } => {
                words.push("admin.say".to_string());
                words.push(text.clone());
                words.extend(scope.subset_words());
            }
            BroadcastCommand::Yell {
                text,
                duration,
                scope,
            } => {
                words.push("admin.yell".to_string());
                words.push(text.clone());
                words.push(duration.to_string());
                words.extend(scope.subset_words());
            }
        }
        words
    }
}
