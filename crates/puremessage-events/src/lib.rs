/// Event types shared between the game server host and the message engine
///
/// This crate holds the lifecycle events the host delivers, the broadcast
/// commands the engine sends back, and the `EventConsumer` trait, so the
/// engine and the runner can agree on them without depending on each other.
use std::time::Instant;

pub mod broadcast;
pub mod game_events;
pub mod replay;

pub use broadcast::{BroadcastCommand, BroadcastScope, DEFAULT_YELL_DURATION};
pub use game_events::{GameEvent, Kill, ServerInfo, TeamScore};
pub use replay::{MAX_REPLAY_OFFSET, ReplayLine, ReplayParseError, parse_replay};

/// Event together with the instant it was observed
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub event: GameEvent,
    pub timestamp: Instant,
}

impl EventEnvelope {
    pub fn new(event: GameEvent) -> Self {
        Self {
            event,
            timestamp: Instant::now(),
        }
    }

    pub fn at(event: GameEvent, timestamp: Instant) -> Self {
        Self { event, timestamp }
    }
}

/// Anything that wants to observe game server lifecycle events
pub trait EventConsumer: Send {
    fn handle_event(&mut self, envelope: EventEnvelope);
}
