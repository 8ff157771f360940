use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use super::field::parse_seconds;
use super::{MessageField, MessageSettings, TriggerHooks, TriggerKind};
use crate::context::{MessageContext, SharedTriggerState};
use crate::error::{ConfigError, MessageError};
use crate::scheduler::TaskKey;
use crate::template::format_template;

/// Sends the message a fixed delay after each player joins.
///
/// The delay lives in [`SharedTriggerState::player_join_delay`] and is the
/// same for every join message.
#[derive(Debug, Default)]
pub struct PlayerJoinTrigger {
    /// Player -> when their join task was scheduled
    pending: HashMap<String, Instant>,
}

impl PlayerJoinTrigger {
    /// Players with a join message still to come
    pub fn pending_players(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }

    fn cancel_all(&mut self, name: &str, ctx: &mut MessageContext) {
        for player in self.pending.keys() {
            ctx.cancel(&TaskKey::player(name, player.clone()));
        }
        self.pending.clear();
    }
}

impl TriggerHooks for PlayerJoinTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::PlayerJoin
    }

    fn disable(&mut self, msg: &mut MessageSettings, ctx: &mut MessageContext) {
        self.cancel_all(msg.name(), ctx);
    }

    fn rename(&mut self, old_name: &str, new_name: &str, ctx: &mut MessageContext) {
        let delay = ctx.shared().player_join_delay;
        let mut finished = Vec::new();

        for (player, scheduled_at) in &self.pending {
            let old = TaskKey::player(old_name, player.clone());
            let new = TaskKey::player(new_name, player.clone());
            match ctx.reschedule_remaining(&old, new, *scheduled_at, delay) {
                Some(remaining) => {
                    debug!(target: "messages", "Moved join message for '{}' to '{}', {:?} left", player, new_name, remaining);
                }
                None => finished.push(player.clone()),
            }
        }

        for player in finished {
            self.pending.remove(&player);
        }
    }

    fn on_player_join(
        &mut self,
        msg: &mut MessageSettings,
        player: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        let delay = ctx.shared().player_join_delay;
        ctx.schedule(TaskKey::player(msg.name(), player), delay);
        self.pending.insert(player.to_string(), ctx.now());
        Ok(())
    }

    fn on_player_leave(
        &mut self,
        msg: &mut MessageSettings,
        player: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        if self.pending.remove(player).is_some() {
            ctx.cancel(&TaskKey::player(msg.name(), player));
        }
        Ok(())
    }

    fn process_scheduled_task(
        &mut self,
        msg: &mut MessageSettings,
        task: &TaskKey,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        let player = task
            .player_name()
            .ok_or_else(|| MessageError::MissingTaskPlayer {
                message: msg.name().to_string(),
            })?;

        self.pending.remove(player);
        msg.send(&format_template(&msg.body, &[player]), Some(player), ctx)
    }

    fn fields(&self, shared: &SharedTriggerState) -> Vec<(MessageField, String)> {
        vec![(
            MessageField::JoinDelay,
            shared.player_join_delay.as_secs().to_string(),
        )]
    }

    fn set_field(
        &mut self,
        _msg: &MessageSettings,
        field: MessageField,
        value: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        match field {
            MessageField::JoinDelay => {
                let seconds = parse_seconds(field, value)?;
                ctx.shared_mut().player_join_delay = Duration::from_secs(seconds);
                Ok(())
            }
            _ => Err(ConfigError::FieldNotSupported {
                field,
                kind: self.kind(),
            }),
        }
    }
}
