use std::time::Instant;

use puremessage_events::{EventConsumer, EventEnvelope, GameEvent};
use tracing::{debug, error, info, warn};

use crate::broadcast::Broadcaster;
use crate::context::{MessageContext, PlayerRoster, SharedTriggerState};
use crate::error::ConfigError;
use crate::message::{MessageField, TriggerKind};
use crate::registry::{MessageRegistry, REMOVE_TRIGGER};
use crate::scheduler::{TaskKey, TaskScheduler};
use crate::settings::{self, Setting, SettingCommand};

/// Running totals, for logs and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events and tasks handed to a message without error
    pub delivered: u64,
    /// Events and tasks a message returned an error for
    pub failed: u64,
    /// Scheduled tasks that came due
    pub tasks_fired: u64,
}

/// Owns every message and routes lifecycle events and due tasks to them.
///
/// Work happens one event at a time: the owner passes the current time into
/// every call, due tasks are fired before the event they arrived with, and a
/// message that fails never stops the others from seeing the event.
pub struct Dispatcher {
    registry: MessageRegistry,
    scheduler: TaskScheduler,
    broadcaster: Broadcaster,
    shared: SharedTriggerState,
    roster: PlayerRoster,
    debug: bool,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self {
            registry: MessageRegistry::new(),
            scheduler: TaskScheduler::new(),
            broadcaster,
            shared: SharedTriggerState::default(),
            roster: PlayerRoster::new(),
            debug: false,
            stats: DispatchStats::default(),
        }
    }

    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TaskScheduler {
        &mut self.scheduler
    }

    pub fn shared(&self) -> &SharedTriggerState {
        &self.shared
    }

    pub fn roster(&self) -> &PlayerRoster {
        &self.roster
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, enabled: bool) {
        if self.debug != enabled {
            let state = if enabled { "on" } else { "off" };
            info!(target: "dispatcher", "Debug output {}", state);
        }
        self.debug = enabled;
    }

    /// Earliest time a scheduled task comes due
    pub fn next_due(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    /// Split borrow: the registry plus a context over everything else
    fn parts(&mut self, now: Instant) -> (&mut MessageRegistry, MessageContext<'_>) {
        (
            &mut self.registry,
            MessageContext::new(
                &mut self.scheduler,
                &mut self.broadcaster,
                &mut self.shared,
                &self.roster,
                now,
            ),
        )
    }

    // ===== Events =====

    /// Fire due tasks, then deliver `event` to every enabled message
    pub fn handle_event(&mut self, event: &GameEvent, now: Instant) {
        self.tick(now);

        debug!(target: "dispatcher", "Event: {:?}", event);
        match event {
            GameEvent::PlayerJoined { name } => {
                self.roster.join(name);
            }
            GameEvent::PlayerLeft { name } => {
                self.roster.leave(name);
            }
            _ => {}
        }

        let mut delivered = 0;
        let mut failed = 0;
        let (registry, mut ctx) = self.parts(now);
        for message in registry.iter_mut().filter(|m| m.enabled()) {
            match message.handle_event(event, &mut ctx) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    error!(
                        target: "dispatcher",
                        "Message '{}' ({}) failed handling {}: {}",
                        message.name(),
                        message.kind(),
                        event,
                        e
                    );
                }
            }
        }

        self.stats.delivered += delivered;
        self.stats.failed += failed;
    }

    /// Deliver every task due at `now` to the message that owns it.
    /// Returns how many tasks came due.
    pub fn tick(&mut self, now: Instant) -> usize {
        let fired = self.scheduler.tick(now);
        if fired.is_empty() {
            return 0;
        }

        let count = fired.len();
        let mut delivered = 0;
        let mut failed = 0;
        let (registry, mut ctx) = self.parts(now);
        for task in fired {
            let Some(message) = registry
                .get_mut(task.key.message_name())
                .filter(|m| m.enabled())
            else {
                debug!(target: "dispatcher", "No enabled message for task {}, dropping it", task.key);
                continue;
            };

            match message.process_scheduled_task(&task.key, &mut ctx) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    error!(
                        target: "dispatcher",
                        "Message '{}' failed on scheduled task {}: {}",
                        message.name(),
                        task.key,
                        e
                    );
                }
            }
        }

        self.stats.tasks_fired += count as u64;
        self.stats.delivered += delivered;
        self.stats.failed += failed;
        count
    }

    // ===== Configuration =====

    /// Add a new, disabled message with a generated name
    pub fn add_message(&mut self, kind: TriggerKind) -> String {
        self.registry.add(kind)
    }

    pub fn insert_message(&mut self, name: &str, kind: TriggerKind) -> Result<(), ConfigError> {
        self.registry.insert(name, kind).map(|_| ())
    }

    pub fn remove_message(&mut self, name: &str, now: Instant) -> Result<(), ConfigError> {
        let (registry, mut ctx) = self.parts(now);
        registry.remove(name, &mut ctx).map(|_| ())
    }

    pub fn rename_message(
        &mut self,
        old_name: &str,
        new_name: &str,
        now: Instant,
    ) -> Result<(), ConfigError> {
        let (registry, mut ctx) = self.parts(now);
        registry.rename(old_name, new_name, &mut ctx)
    }

    pub fn replace_trigger(
        &mut self,
        name: &str,
        kind: TriggerKind,
        now: Instant,
    ) -> Result<(), ConfigError> {
        let (registry, mut ctx) = self.parts(now);
        registry.replace(name, kind, &mut ctx)
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool, now: Instant) -> Result<(), ConfigError> {
        let (registry, mut ctx) = self.parts(now);
        registry.set_enabled(name, enabled, &mut ctx)
    }

    pub fn get_field(&self, name: &str, field: MessageField) -> Result<String, ConfigError> {
        self.registry.get_field(name, field, &self.shared)
    }

    pub fn set_field(
        &mut self,
        name: &str,
        field: MessageField,
        value: &str,
        now: Instant,
    ) -> Result<(), ConfigError> {
        let (registry, mut ctx) = self.parts(now);
        registry.set_field(name, field, value, &mut ctx)
    }

    /// Switch every message on, as when the host enables the plugin
    pub fn enable_all(&mut self, now: Instant) {
        let (registry, mut ctx) = self.parts(now);
        registry.enable_all(&mut ctx);
        info!(target: "dispatcher", "Enabled");
    }

    /// Switch every message off, cancelling everything scheduled
    pub fn disable_all(&mut self, now: Instant) {
        let (registry, mut ctx) = self.parts(now);
        registry.disable_all(&mut ctx);
        info!(target: "dispatcher", "Disabled");
    }

    // ===== Flat settings =====

    /// Every setting in `<name>|<name> - <label>` form
    pub fn settings(&self) -> Vec<Setting> {
        settings::list_settings(&self.registry, &self.shared, self.debug)
    }

    /// Apply one flat setting.
    ///
    /// A field of a message that does not exist yet creates it, as happens
    /// when a host replays saved settings: the trigger field creates a
    /// message of that kind, any other field a player spawn message.
    pub fn apply_setting(&mut self, variable: &str, value: &str, now: Instant) -> Result<(), ConfigError> {
        let command = settings::parse_setting(variable, value)?;
        if command != SettingCommand::Ignore {
            debug!(target: "dispatcher", "{} = {}", variable, value);
        }

        match command {
            SettingCommand::Ignore => Ok(()),
            SettingCommand::SetDebug(debug) => {
                self.set_debug(debug);
                Ok(())
            }
            SettingCommand::AddMessage(kind) => {
                self.add_message(kind);
                Ok(())
            }
            SettingCommand::SetField {
                message,
                field,
                value,
            } => {
                if !self.registry.contains(&message) {
                    self.create_for_replay(&message, field, &value)?;
                    if field == MessageField::Trigger {
                        return Ok(());
                    }
                }
                self.set_field(&message, field, &value, now)
            }
        }
    }

    fn create_for_replay(
        &mut self,
        name: &str,
        field: MessageField,
        value: &str,
    ) -> Result<(), ConfigError> {
        let kind = match field {
            MessageField::Trigger if value.trim().eq_ignore_ascii_case(REMOVE_TRIGGER) => {
                return Err(ConfigError::UnknownMessage(name.to_string()));
            }
            MessageField::Trigger => value.parse()?,
            _ => TriggerKind::PlayerSpawn,
        };

        warn!(
            target: "dispatcher",
            "Setting for unknown message '{}', creating it as {}",
            name,
            kind
        );
        self.insert_message(name, kind)
    }

    /// Apply a batch of flat settings in order. Failures are logged and
    /// skipped; returns how many were rejected.
    pub fn apply_settings<'a>(
        &mut self,
        settings: impl IntoIterator<Item = (&'a str, &'a str)>,
        now: Instant,
    ) -> usize {
        let mut rejected = 0;
        for (variable, value) in settings {
            if let Err(e) = self.apply_setting(variable, value, now) {
                warn!(target: "dispatcher", "Rejected setting '{}': {}", variable, e);
                rejected += 1;
            }
        }
        rejected
    }

    /// Names of messages with something scheduled
    pub fn scheduled_messages(&self) -> Vec<&str> {
        self.registry
            .iter()
            .map(|m| m.name())
            .filter(|name| {
                self.scheduler.is_scheduled(&TaskKey::message(*name))
                    || self.roster.iter().any(|player| {
                        self.scheduler.is_scheduled(&TaskKey::player(*name, player))
                    })
            })
            .collect()
    }
}

impl EventConsumer for Dispatcher {
    fn handle_event(&mut self, envelope: EventEnvelope) {
        Dispatcher::handle_event(self, &envelope.event, envelope.timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puremessage_events::{BroadcastCommand, BroadcastScope};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn dispatcher() -> (Dispatcher, mpsc::UnboundedReceiver<BroadcastCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Dispatcher::new(Broadcaster::new(tx)), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<BroadcastCommand>) -> Vec<BroadcastCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            out.push(cmd);
        }
        out
    }

    fn secs(start: Instant, n: u64) -> Instant {
        start + Duration::from_secs(n)
    }

    #[test]
    fn test_debug_setting_round_trips() {
        let (mut d, _rx) = dispatcher();
        let start = Instant::now();
        assert!(!d.debug());

        d.apply_setting("Add New/Settings|Debug", "True", start).unwrap();
        assert!(d.debug());
        let listed = d
            .settings()
            .into_iter()
            .find(|s| s.variable == "Add New/Settings|Debug")
            .unwrap();
        assert_eq!(listed.value, "True");

        // Setting the same value again is a no-op
        d.set_debug(true);
        assert!(d.debug());
        d.set_debug(false);
        assert!(!d.debug());
    }

    #[test]
    fn test_only_enabled_messages_see_events() {
        let (mut d, mut rx) = dispatcher();
        let start = Instant::now();
        d.insert_message("on", TriggerKind::PlayerSpawn).unwrap();
        d.insert_message("off", TriggerKind::PlayerSpawn).unwrap();
        d.set_field("on", MessageField::Body, "on {0}", start).unwrap();
        d.set_field("off", MessageField::Body, "off {0}", start).unwrap();
        d.set_enabled("on", true, start).unwrap();

        d.handle_event(&GameEvent::joined("Alice"), start);
        d.handle_event(&GameEvent::spawned("Alice"), start);

        let texts: Vec<String> = drain(&mut rx).iter().map(|c| c.text().to_string()).collect();
        assert_eq!(texts, vec!["on Alice"]);
        assert_eq!(d.stats().delivered, 2);
    }

    #[test]
    fn test_roster_tracks_joins_regardless_of_messages() {
        let (mut d, _rx) = dispatcher();
        let start = Instant::now();
        d.handle_event(&GameEvent::joined("Alice"), start);
        d.handle_event(&GameEvent::joined("Bob"), start);
        d.handle_event(&GameEvent::left("Alice"), start);

        assert!(d.roster().contains("Bob"));
        assert!(!d.roster().contains("Alice"));
    }

    #[test]
    fn test_failing_task_does_not_block_others() {
        let (mut d, mut rx) = dispatcher();
        let start = Instant::now();
        d.insert_message("welcome", TriggerKind::PlayerJoin).unwrap();
        d.insert_message("timed", TriggerKind::TimedCounter).unwrap();
        d.set_field("timed", MessageField::Body, "Still here", start).unwrap();
        d.set_field("timed", MessageField::RoundSeconds, "5", start).unwrap();
        d.enable_all(start);

        // A join task without a player cannot be delivered
        d.scheduler_mut()
            .schedule(TaskKey::message("welcome"), Duration::from_secs(1), start);
        d.handle_event(&GameEvent::round_started("MP_Subway", "ConquestLarge0"), start);

        assert_eq!(d.tick(secs(start, 10)), 2);
        assert_eq!(
            drain(&mut rx),
            vec![BroadcastCommand::Say {
                text: "Still here".to_string(),
                scope: BroadcastScope::All,
            }]
        );
        let stats = d.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.tasks_fired, 2);
    }

    #[test]
    fn test_due_tasks_fire_before_event() {
        let (mut d, mut rx) = dispatcher();
        let start = Instant::now();
        d.insert_message("welcome", TriggerKind::PlayerJoin).unwrap();
        d.set_field("welcome", MessageField::Body, "Welcome {0}!", start).unwrap();
        d.set_field("welcome", MessageField::JoinDelay, "5", start).unwrap();
        d.set_enabled("welcome", true, start).unwrap();

        d.handle_event(&GameEvent::joined("Alice"), start);
        // Alice leaves after her message was due but before anyone ticked
        d.handle_event(&GameEvent::left("Alice"), secs(start, 6));

        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_tasks_of_disabled_messages_never_fire() {
        let (mut d, mut rx) = dispatcher();
        let start = Instant::now();
        d.insert_message("welcome", TriggerKind::PlayerJoin).unwrap();
        d.set_field("welcome", MessageField::JoinDelay, "30", start).unwrap();
        d.set_enabled("welcome", true, start).unwrap();

        d.handle_event(&GameEvent::joined("Alice"), start);
        assert_eq!(d.scheduled_messages(), vec!["welcome"]);
        d.disable_all(secs(start, 10));

        assert_eq!(d.tick(secs(start, 40)), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_apply_settings_replays_host_state() {
        let (mut d, _rx) = dispatcher();
        let now = Instant::now();
        let rejected = d.apply_settings(
            [
                ("Add New/Settings|Debug", "True"),
                ("welcome|welcome - Message trigger", "PLAYER_JOIN"),
                ("welcome|welcome - Message body", "Welcome {0}!"),
                ("welcome|welcome - Message delay (seconds)", "5"),
                ("welcome|welcome - Message enabled", "True"),
                ("spawn|spawn - Message body", "Good luck"),
                ("bad|bad - Message trigger", "PLAYER_DEATH"),
                ("IGNORE", "IGNORE"),
            ],
            now,
        );

        assert_eq!(rejected, 1);
        assert!(d.debug());
        let welcome = d.registry().get("welcome").unwrap();
        assert_eq!(welcome.kind(), TriggerKind::PlayerJoin);
        assert!(welcome.enabled());
        assert_eq!(d.get_field("welcome", MessageField::JoinDelay), Ok("5".to_string()));
        assert_eq!(d.registry().get("spawn").unwrap().kind(), TriggerKind::PlayerSpawn);
        assert!(d.registry().get("bad").is_none());
    }

    #[test]
    fn test_apply_setting_adds_and_removes() {
        let (mut d, _rx) = dispatcher();
        let now = Instant::now();
        d.apply_setting("Add New/Settings|Add a message", "TIMED_COUNTER", now)
            .unwrap();
        d.apply_setting("Add New/Settings|Add a message", "Choose...", now)
            .unwrap();
        assert_eq!(d.registry().len(), 1);

        d.apply_setting(
            "Timed Counter Message #0|Timed Counter Message #0 - Message trigger",
            "Remove",
            now,
        )
        .unwrap();
        assert!(d.registry().is_empty());
        assert_eq!(
            d.apply_setting("gone|gone - Message trigger", "Remove", now),
            Err(ConfigError::UnknownMessage("gone".to_string()))
        );
    }
}
