use std::collections::HashSet;

use super::field::{EVERY_SPAWN, ONLY_FIRST_SPAWN};
use super::{MessageField, MessageSettings, TriggerHooks, TriggerKind};
use crate::context::{MessageContext, SharedTriggerState};
use crate::error::{ConfigError, MessageError};
use crate::template::format_template;

/// Sends the message when a player spawns, either on every spawn or only
/// the first one after joining.
#[derive(Debug)]
pub struct PlayerSpawnTrigger {
    /// Joined but not yet messaged
    awaiting: HashSet<String>,
    /// Already messaged; only filled while `trigger_once` is set
    messaged: HashSet<String>,
    trigger_once: bool,
}

impl Default for PlayerSpawnTrigger {
    fn default() -> Self {
        Self {
            awaiting: HashSet::new(),
            messaged: HashSet::new(),
            trigger_once: true,
        }
    }
}

impl PlayerSpawnTrigger {
    pub fn trigger_once(&self) -> bool {
        self.trigger_once
    }

    pub fn was_messaged(&self, player: &str) -> bool {
        self.messaged.contains(player)
    }

    /// Switch between first-spawn-only and every-spawn.
    ///
    /// Going to first-spawn-only treats everyone already connected and not
    /// waiting for a first message as messaged, so only players who join
    /// from now on get it.
    pub fn set_trigger_once(&mut self, trigger_once: bool, ctx: &MessageContext) {
        self.trigger_once = trigger_once;
        self.messaged.clear();

        if trigger_once {
            let already_playing = ctx
                .roster()
                .iter()
                .filter(|player| !self.awaiting.contains(*player))
                .map(str::to_string)
                .collect::<Vec<_>>();
            self.messaged.extend(already_playing);
        }
    }
}

impl TriggerHooks for PlayerSpawnTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::PlayerSpawn
    }

    fn on_player_join(
        &mut self,
        _msg: &mut MessageSettings,
        player: &str,
        _ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        self.awaiting.insert(player.to_string());
        Ok(())
    }

    fn on_player_spawn(
        &mut self,
        msg: &mut MessageSettings,
        player: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        if self.messaged.contains(player) {
            return Ok(());
        }

        self.awaiting.remove(player);
        if self.trigger_once {
            self.messaged.insert(player.to_string());
        }

        msg.send(&format_template(&msg.body, &[player]), Some(player), ctx)
    }

    fn on_player_leave(
        &mut self,
        _msg: &mut MessageSettings,
        player: &str,
        _ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        self.awaiting.remove(player);
        self.messaged.remove(player);
        Ok(())
    }

    fn fields(&self, _shared: &SharedTriggerState) -> Vec<(MessageField, String)> {
        let frequency = if self.trigger_once {
            ONLY_FIRST_SPAWN
        } else {
            EVERY_SPAWN
        };
        vec![(MessageField::TriggerFrequency, frequency.to_string())]
    }

    fn set_field(
        &mut self,
        _msg: &MessageSettings,
        field: MessageField,
        value: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        if field != MessageField::TriggerFrequency {
            return Err(ConfigError::FieldNotSupported {
                field,
                kind: self.kind(),
            });
        }

        let value = value.trim();
        let trigger_once = if value.eq_ignore_ascii_case(ONLY_FIRST_SPAWN) {
            true
        } else if value.eq_ignore_ascii_case(EVERY_SPAWN) {
            false
        } else {
            // TOML stores this one as a plain boolean
            super::field::parse_bool(field, value).map_err(|_| {
                ConfigError::invalid_value(field, value, "'Only first spawn' or 'Every spawn'")
            })?
        };

        self.set_trigger_once(trigger_once, ctx);
        Ok(())
    }
}
