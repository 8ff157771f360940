//! Configured messages and their trigger state machines
//!
//! A [`Message`] pairs the settings every message has (name, output mode,
//! destination, body, enabled flag) with a [`Trigger`], the per-kind state
//! machine that decides when to send. Triggers implement [`TriggerHooks`];
//! every hook has a no-op default so a trigger only overrides the events it
//! reacts to.

use std::str::FromStr;

use puremessage_events::{GameEvent, Kill, ServerInfo};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::debug;

use crate::context::{MessageContext, SharedTriggerState};
use crate::error::{ConfigError, MessageError};
use crate::scheduler::TaskKey;

pub mod field;
pub mod player_join;
pub mod player_spawn;
pub mod ticket_count;
pub mod timed_counter;

pub use field::{MessageField, SettingKind};
pub use player_join::PlayerJoinTrigger;
pub use player_spawn::PlayerSpawnTrigger;
pub use ticket_count::TicketCountTrigger;
pub use timed_counter::TimedCounterTrigger;

use field::{normalize_choice, parse_bool};

/// Event class a message reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    #[strum(serialize = "PLAYER_JOIN")]
    PlayerJoin,
    #[strum(serialize = "PLAYER_SPAWN")]
    PlayerSpawn,
    #[strum(serialize = "TICKET_COUNT")]
    TicketCount,
    #[strum(serialize = "TIMED_COUNTER")]
    TimedCounter,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 4] = [
        TriggerKind::PlayerJoin,
        TriggerKind::PlayerSpawn,
        TriggerKind::TicketCount,
        TriggerKind::TimedCounter,
    ];

    /// Human name used for generated message names ("Player Join Message #0")
    pub fn label(&self) -> &'static str {
        match self {
            TriggerKind::PlayerJoin => "Player Join",
            TriggerKind::PlayerSpawn => "Player Spawn",
            TriggerKind::TicketCount => "Ticket Count",
            TriggerKind::TimedCounter => "Timed Counter",
        }
    }

    /// Ticket count and timed messages are not about any one player
    pub fn allows_player_destination(&self) -> bool {
        matches!(self, TriggerKind::PlayerJoin | TriggerKind::PlayerSpawn)
    }
}

impl FromStr for TriggerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_choice(s);
        TriggerKind::ALL
            .into_iter()
            .find(|kind| kind.to_string() == wanted)
            .ok_or_else(|| ConfigError::UnknownTrigger(s.to_string()))
    }
}

/// How a message is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    #[strum(serialize = "SAY")]
    Say,
    #[strum(serialize = "YELL")]
    Yell,
    #[strum(serialize = "SAY_AND_YELL")]
    SayAndYell,
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_choice(s).as_str() {
            "SAY" => Ok(OutputMode::Say),
            "YELL" => Ok(OutputMode::Yell),
            "SAY_AND_YELL" => Ok(OutputMode::SayAndYell),
            _ => Err(ConfigError::invalid_value(
                MessageField::Output,
                s,
                "SAY, YELL or SAY_AND_YELL",
            )),
        }
    }
}

/// Who receives a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    #[strum(serialize = "PLAYER")]
    Player,
    #[default]
    #[strum(serialize = "ALL")]
    All,
}

impl FromStr for Destination {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_choice(s).as_str() {
            "PLAYER" => Ok(Destination::Player),
            "ALL" => Ok(Destination::All),
            _ => Err(ConfigError::invalid_value(
                MessageField::Destination,
                s,
                "PLAYER or ALL",
            )),
        }
    }
}

/// Settings shared by every kind of message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSettings {
    name: String,
    enabled: bool,
    pub output: OutputMode,
    pub destination: Destination,
    pub body: String,
}

impl MessageSettings {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Turn the message off from inside a trigger, e.g. when the game mode
    /// does not support it
    pub(crate) fn switch_off(&mut self) {
        self.enabled = false;
    }

    /// Send `text` according to the destination and output mode. `player`
    /// is the player the triggering event was about.
    pub fn send(
        &self,
        text: &str,
        player: Option<&str>,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        match (self.destination, player) {
            (Destination::All, _) => {
                self.send_all(text, ctx);
                Ok(())
            }
            (Destination::Player, Some(player)) => {
                self.send_player(text, player, ctx);
                Ok(())
            }
            (Destination::Player, None) => {
                debug_assert!(
                    false,
                    "message '{}' is player-scoped but was sent without a player",
                    self.name
                );
                Err(MessageError::MissingRecipient {
                    message: self.name.clone(),
                })
            }
        }
    }

    fn send_all(&self, text: &str, ctx: &mut MessageContext) {
        let broadcaster = ctx.broadcaster();
        match self.output {
            OutputMode::Say => broadcaster.say_all(text),
            OutputMode::Yell => broadcaster.yell_all(text),
            OutputMode::SayAndYell => {
                broadcaster.say_all(text);
                broadcaster.yell_all(text);
            }
        }
    }

    fn send_player(&self, text: &str, player: &str, ctx: &mut MessageContext) {
        let broadcaster = ctx.broadcaster();
        match self.output {
            OutputMode::Say => broadcaster.say_player(text, player),
            OutputMode::Yell => broadcaster.yell_player(text, player),
            OutputMode::SayAndYell => {
                broadcaster.say_player(text, player);
                broadcaster.yell_player(text, player);
            }
        }
    }
}

/// Behaviour of one trigger kind
///
/// Handlers receive the owning message's settings and the context for the
/// event being handled. Errors are logged by the dispatcher and do not stop
/// other messages from seeing the event.
#[allow(unused_variables)]
pub trait TriggerHooks {
    fn kind(&self) -> TriggerKind;

    /// The message was switched on
    fn enable(&mut self, msg: &mut MessageSettings, ctx: &mut MessageContext) {}

    /// The message was switched off. Must cancel everything the trigger
    /// scheduled and be safe to call repeatedly.
    fn disable(&mut self, msg: &mut MessageSettings, ctx: &mut MessageContext) {}

    /// The message is being renamed; pending tasks must move to `new_name`
    fn rename(&mut self, old_name: &str, new_name: &str, ctx: &mut MessageContext) {}

    fn on_round_start(
        &mut self,
        msg: &mut MessageSettings,
        map: &str,
        mode: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        Ok(())
    }

    fn on_round_end(
        &mut self,
        msg: &mut MessageSettings,
        winning_team: u32,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        Ok(())
    }

    fn on_player_join(
        &mut self,
        msg: &mut MessageSettings,
        player: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        Ok(())
    }

    fn on_player_spawn(
        &mut self,
        msg: &mut MessageSettings,
        player: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        Ok(())
    }

    fn on_player_leave(
        &mut self,
        msg: &mut MessageSettings,
        player: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        Ok(())
    }

    fn on_player_killed(
        &mut self,
        msg: &mut MessageSettings,
        kill: &Kill,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        Ok(())
    }

    fn on_server_info(
        &mut self,
        msg: &mut MessageSettings,
        info: &ServerInfo,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        Ok(())
    }

    /// A task this trigger scheduled has come due
    fn process_scheduled_task(
        &mut self,
        msg: &mut MessageSettings,
        task: &TaskKey,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        Ok(())
    }

    /// Trigger-specific fields and their current values
    fn fields(&self, shared: &SharedTriggerState) -> Vec<(MessageField, String)> {
        Vec::new()
    }

    fn set_field(
        &mut self,
        msg: &MessageSettings,
        field: MessageField,
        value: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        Err(ConfigError::FieldNotSupported {
            field,
            kind: self.kind(),
        })
    }
}

/// Trigger state machine of a message, one variant per kind
#[derive(Debug)]
pub enum Trigger {
    PlayerJoin(PlayerJoinTrigger),
    PlayerSpawn(PlayerSpawnTrigger),
    TicketCount(TicketCountTrigger),
    TimedCounter(TimedCounterTrigger),
}

impl Trigger {
    /// Fresh state machine for `kind`
    pub fn new(kind: TriggerKind) -> Self {
        match kind {
            TriggerKind::PlayerJoin => Trigger::PlayerJoin(PlayerJoinTrigger::default()),
            TriggerKind::PlayerSpawn => Trigger::PlayerSpawn(PlayerSpawnTrigger::default()),
            TriggerKind::TicketCount => Trigger::TicketCount(TicketCountTrigger::default()),
            TriggerKind::TimedCounter => Trigger::TimedCounter(TimedCounterTrigger::default()),
        }
    }

    pub fn kind(&self) -> TriggerKind {
        self.hooks().kind()
    }

    fn hooks(&self) -> &dyn TriggerHooks {
        match self {
            Trigger::PlayerJoin(t) => t,
            Trigger::PlayerSpawn(t) => t,
            Trigger::TicketCount(t) => t,
            Trigger::TimedCounter(t) => t,
        }
    }

    fn hooks_mut(&mut self) -> &mut dyn TriggerHooks {
        match self {
            Trigger::PlayerJoin(t) => t,
            Trigger::PlayerSpawn(t) => t,
            Trigger::TicketCount(t) => t,
            Trigger::TimedCounter(t) => t,
        }
    }
}

/// A configured message
#[derive(Debug)]
pub struct Message {
    settings: MessageSettings,
    trigger: Trigger,
}

impl Message {
    /// New, disabled message with an empty body
    pub fn new(name: impl Into<String>, kind: TriggerKind) -> Self {
        Self {
            settings: MessageSettings {
                name: name.into(),
                enabled: false,
                output: OutputMode::default(),
                destination: Destination::default(),
                body: String::new(),
            },
            trigger: Trigger::new(kind),
        }
    }

    /// Message with the same settings as `previous` but a fresh trigger of
    /// `kind`. Starts disabled; a player destination the new kind cannot
    /// use falls back to ALL.
    pub fn with_settings_of(previous: &Message, kind: TriggerKind) -> Self {
        let mut settings = previous.settings.clone();
        settings.enabled = false;
        if !kind.allows_player_destination() {
            settings.destination = Destination::All;
        }
        Self {
            settings,
            trigger: Trigger::new(kind),
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn kind(&self) -> TriggerKind {
        self.trigger.kind()
    }

    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn settings(&self) -> &MessageSettings {
        &self.settings
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Switch the message on. Does nothing if it is already on.
    pub fn enable(&mut self, ctx: &mut MessageContext) {
        if self.settings.enabled {
            return;
        }
        self.settings.enabled = true;
        self.trigger.hooks_mut().enable(&mut self.settings, ctx);
    }

    /// Switch the message off and cancel anything it has scheduled
    pub fn disable(&mut self, ctx: &mut MessageContext) {
        self.settings.enabled = false;
        self.trigger.hooks_mut().disable(&mut self.settings, ctx);
    }

    /// Rename the message, moving pending tasks to the new name. Name
    /// validation and uniqueness are the registry's job.
    pub(crate) fn rename(&mut self, new_name: &str, ctx: &mut MessageContext) {
        let old_name = std::mem::replace(&mut self.settings.name, new_name.to_string());
        self.trigger.hooks_mut().rename(&old_name, new_name, ctx);
    }

    /// Deliver a lifecycle event to the trigger
    pub fn handle_event(
        &mut self,
        event: &GameEvent,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        let msg = &mut self.settings;
        let hooks = self.trigger.hooks_mut();
        match event {
            GameEvent::RoundStarted { map, mode, .. } => hooks.on_round_start(msg, map, mode, ctx),
            GameEvent::RoundEnded { winning_team } => hooks.on_round_end(msg, *winning_team, ctx),
            GameEvent::PlayerJoined { name } => hooks.on_player_join(msg, name, ctx),
            GameEvent::PlayerSpawned { name } => hooks.on_player_spawn(msg, name, ctx),
            GameEvent::PlayerLeft { name } => hooks.on_player_leave(msg, name, ctx),
            GameEvent::PlayerKilled(kill) => hooks.on_player_killed(msg, kill, ctx),
            GameEvent::ServerInfo(info) => hooks.on_server_info(msg, info, ctx),
        }
    }

    /// Deliver a task that came due
    pub fn process_scheduled_task(
        &mut self,
        task: &TaskKey,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        debug!(target: "messages", "Trigger message on {}", task);
        self.trigger
            .hooks_mut()
            .process_scheduled_task(&mut self.settings, task, ctx)
    }

    /// Every field this kind of message exposes, with its current value
    pub fn fields(&self, shared: &SharedTriggerState) -> Vec<(MessageField, String)> {
        let kind = self.kind();
        let mut fields = vec![
            (MessageField::Name, self.settings.name.clone()),
            (MessageField::Trigger, kind.to_string()),
            (MessageField::Enabled, display_bool(self.settings.enabled)),
            (MessageField::Output, self.settings.output.to_string()),
        ];
        if kind.allows_player_destination() {
            fields.push((MessageField::Destination, self.settings.destination.to_string()));
        }
        fields.push((MessageField::Body, self.settings.body.clone()));
        fields.extend(self.trigger.hooks().fields(shared));
        fields
    }

    pub fn get_field(
        &self,
        field: MessageField,
        shared: &SharedTriggerState,
    ) -> Result<String, ConfigError> {
        self.fields(shared)
            .into_iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value)
            .ok_or(ConfigError::FieldNotSupported {
                field,
                kind: self.kind(),
            })
    }

    /// Set a field from its text form. Name and trigger changes go through
    /// the registry since they affect other messages.
    pub fn set_field(
        &mut self,
        field: MessageField,
        value: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        match field {
            MessageField::Name | MessageField::Trigger => Err(ConfigError::FieldNotSupported {
                field,
                kind: self.kind(),
            }),
            MessageField::Enabled => {
                if parse_bool(field, value)? {
                    self.enable(ctx);
                } else {
                    self.disable(ctx);
                }
                Ok(())
            }
            MessageField::Output => {
                self.settings.output = value.parse()?;
                Ok(())
            }
            MessageField::Destination => {
                let destination: Destination = value.parse()?;
                if destination == Destination::Player && !self.kind().allows_player_destination()
                {
                    return Err(ConfigError::DestinationNotAllowed(self.kind()));
                }
                self.settings.destination = destination;
                Ok(())
            }
            MessageField::Body => {
                self.settings.body = value.to_string();
                Ok(())
            }
            _ => self
                .trigger
                .hooks_mut()
                .set_field(&self.settings, field, value, ctx),
        }
    }
}

pub(crate) fn display_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}
