//! Line-oriented text form of game events, used to replay a recorded or
//! hand-written session against a configuration.
//!
//! ```text
//! # comment
//! @0    round-start MP_Subway ConquestLarge0 1 2
//! @2.5  join Alice
//! @4    spawn Alice
//! @60   server-info ConquestLarge0 150 210
//! @600  round-end 1
//! ```
//!
//! The `@<seconds>` prefix is the offset from the start of the replay and is
//! optional; lines without one happen at the previous line's offset.

use std::time::Duration;

use thiserror::Error;

use crate::game_events::{GameEvent, Kill, ServerInfo};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayParseError {
    #[error("line {line}: unknown event '{word}'")]
    UnknownEvent { line: usize, word: String },
    #[error("line {line}: '{event}' is missing {what}")]
    MissingArgument {
        line: usize,
        event: String,
        what: &'static str,
    },
    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },
    #[error("line {line}: offset {offset} is earlier than the previous line")]
    OffsetWentBackwards { line: usize, offset: String },
    #[error("line {line}: offset {offset} is past the {max}s limit")]
    OffsetTooLarge {
        line: usize,
        offset: String,
        max: u64,
    },
}

/// Latest offset a replay line may carry
pub const MAX_REPLAY_OFFSET: Duration = Duration::from_secs(24 * 60 * 60);

/// One parsed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayLine {
    /// 1-based line number in the source text
    pub line: usize,
    pub offset: Duration,
    pub event: GameEvent,
}

/// Parse a whole replay script
pub fn parse_replay(source: &str) -> Result<Vec<ReplayLine>, ReplayParseError> {
    let mut lines = Vec::new();
    let mut offset = Duration::ZERO;

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let text = raw.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let mut words: Vec<&str> = text.split_whitespace().collect();
        if let Some(stamp) = words.first().and_then(|w| w.strip_prefix('@')) {
            let seconds: f64 = stamp.parse().map_err(|_| ReplayParseError::InvalidNumber {
                line,
                value: stamp.to_string(),
            })?;
            let next =
                Duration::try_from_secs_f64(seconds).map_err(|_| ReplayParseError::InvalidNumber {
                    line,
                    value: stamp.to_string(),
                })?;
            if next > MAX_REPLAY_OFFSET {
                return Err(ReplayParseError::OffsetTooLarge {
                    line,
                    offset: stamp.to_string(),
                    max: MAX_REPLAY_OFFSET.as_secs(),
                });
            }
            if next < offset {
                return Err(ReplayParseError::OffsetWentBackwards {
                    line,
                    offset: stamp.to_string(),
                });
            }
            offset = next;
            words.remove(0);
        }

        if words.is_empty() {
            continue;
        }

        let event = parse_event(line, &words)?;
        lines.push(ReplayLine {
            line,
            offset,
            event,
        });
    }

    Ok(lines)
}

fn parse_event(line: usize, words: &[&str]) -> Result<GameEvent, ReplayParseError> {
    let name = words[0];
    let arg = |i: usize, what: &'static str| -> Result<String, ReplayParseError> {
        words
            .get(i)
            .map(|w| w.to_string())
            .ok_or_else(|| ReplayParseError::MissingArgument {
                line,
                event: name.to_string(),
                what,
            })
    };
    // Optional numeric argument; out-of-range values are rejected, not wrapped
    fn number<T: std::str::FromStr>(
        line: usize,
        words: &[&str],
        i: usize,
    ) -> Result<Option<T>, ReplayParseError> {
        match words.get(i) {
            None => Ok(None),
            Some(w) => w
                .parse::<T>()
                .map(Some)
                .map_err(|_| ReplayParseError::InvalidNumber {
                    line,
                    value: w.to_string(),
                }),
        }
    }
    let unsigned = |i: usize| number::<u32>(line, words, i).map(Option::unwrap_or_default);

    let event = match name {
        "round-start" => GameEvent::RoundStarted {
            map: arg(1, "a map name")?,
            mode: arg(2, "a game mode")?,
            round: unsigned(3)?,
            total_rounds: unsigned(4)?,
        },
        "round-end" | "round-over" => GameEvent::RoundEnded {
            winning_team: unsigned(1)?,
        },
        "next-level" | "restart-level" => GameEvent::RoundEnded { winning_team: 0 },
        "join" => GameEvent::PlayerJoined {
            name: arg(1, "a player name")?,
        },
        "spawn" => GameEvent::PlayerSpawned {
            name: arg(1, "a player name")?,
        },
        "leave" => GameEvent::PlayerLeft {
            name: arg(1, "a player name")?,
        },
        "kill" => GameEvent::PlayerKilled(Kill {
            killer: arg(1, "a killer")?,
            victim: arg(2, "a victim")?,
            weapon: arg(3, "a weapon")?,
            headshot: words.get(4).is_some_and(|w| *w == "headshot"),
        }),
        "server-info" => {
            let mode = arg(1, "a game mode")?;
            let mut scores = Vec::new();
            for i in 2..words.len() {
                if let Some(score) = number::<i32>(line, words, i)? {
                    scores.push(score);
                }
            }
            GameEvent::ServerInfo(ServerInfo::new(mode, &scores))
        }
        other => {
            return Err(ReplayParseError::UnknownEvent {
                line,
                word: other.to_string(),
            })
        }
    };

    Ok(event)
}
