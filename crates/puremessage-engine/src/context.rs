use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::broadcast::Broadcaster;
use crate::scheduler::{TaskHandle, TaskKey, TaskScheduler};

/// State shared by every message of the same trigger kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedTriggerState {
    /// Delay before a join message is sent. One value for all join
    /// messages; whichever message set it last wins.
    pub player_join_delay: Duration,
    /// Team 0's tickets when the current round was first observed.
    /// Cleared at every round boundary.
    pub start_ticket_count: Option<i32>,
}

/// Names of the players currently connected to the server
#[derive(Debug, Clone, Default)]
pub struct PlayerRoster {
    players: BTreeSet<String>,
}

impl PlayerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, player: &str) -> bool {
        self.players.insert(player.to_string())
    }

    pub fn leave(&mut self, player: &str) -> bool {
        self.players.remove(player)
    }

    pub fn contains(&self, player: &str) -> bool {
        self.players.contains(player)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(String::as_str)
    }
}

/// Everything a message may touch while handling one event
pub struct MessageContext<'a> {
    scheduler: &'a mut TaskScheduler,
    broadcaster: &'a mut Broadcaster,
    shared: &'a mut SharedTriggerState,
    roster: &'a PlayerRoster,
    now: Instant,
}

impl<'a> MessageContext<'a> {
    pub fn new(
        scheduler: &'a mut TaskScheduler,
        broadcaster: &'a mut Broadcaster,
        shared: &'a mut SharedTriggerState,
        roster: &'a PlayerRoster,
        now: Instant,
    ) -> Self {
        Self {
            scheduler,
            broadcaster,
            shared,
            roster,
            now,
        }
    }

    // ===== Scheduling =====

    /// Schedule a task `delay` from now, replacing any pending task with the same key
    pub fn schedule(&mut self, key: TaskKey, delay: Duration) -> TaskHandle {
        self.scheduler.schedule(key, delay, self.now)
    }

    pub fn cancel(&mut self, key: &TaskKey) -> bool {
        self.scheduler.cancel(key)
    }

    pub fn is_scheduled(&self, key: &TaskKey) -> bool {
        self.scheduler.is_scheduled(key)
    }

    /// Move a pending task to a new key, keeping its due time measured from `scheduled_at`
    pub fn reschedule_remaining(
        &mut self,
        old: &TaskKey,
        new: TaskKey,
        scheduled_at: Instant,
        delay: Duration,
    ) -> Option<Duration> {
        if !self.scheduler.cancel(old) {
            return None;
        }
        let remaining = delay.saturating_sub(self.elapsed_since(scheduled_at));
        self.scheduler.schedule(new, remaining, self.now);
        Some(remaining)
    }

    // ===== Output and state =====

    pub fn broadcaster(&mut self) -> &mut Broadcaster {
        self.broadcaster
    }

    pub fn shared(&self) -> &SharedTriggerState {
        self.shared
    }

    pub fn shared_mut(&mut self) -> &mut SharedTriggerState {
        self.shared
    }

    pub fn roster(&self) -> &PlayerRoster {
        self.roster
    }

    /// Time the current event is being handled at
    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn elapsed_since(&self, then: Instant) -> Duration {
        self.now.saturating_duration_since(then)
    }
}
