use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::field::parse_seconds;
use super::{MessageField, MessageSettings, TriggerHooks, TriggerKind};
use crate::context::{MessageContext, SharedTriggerState};
use crate::error::{ConfigError, MessageError};
use crate::scheduler::TaskKey;

/// Sends the message a fixed number of seconds into every round
#[derive(Debug, Default)]
pub struct TimedCounterTrigger {
    seconds: u64,
    /// When this round's task was scheduled. Stays set after the task fires
    /// so the message goes out at most once per round.
    scheduled_at: Option<Instant>,
}

impl TimedCounterTrigger {
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn scheduled_at(&self) -> Option<Instant> {
        self.scheduled_at
    }

    fn delay(&self) -> Duration {
        Duration::from_secs(self.seconds)
    }

    fn cancel(&mut self, name: &str, ctx: &mut MessageContext) {
        if self.scheduled_at.take().is_some() {
            debug!(target: "messages", "Disabling task for {} at {} seconds.", name, self.seconds);
            ctx.cancel(&TaskKey::message(name));
        }
    }
}

impl TriggerHooks for TimedCounterTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::TimedCounter
    }

    fn enable(&mut self, msg: &mut MessageSettings, _ctx: &mut MessageContext) {
        info!(
            target: "messages",
            "Timed Counter '{}' will be enabled at the start of the next round.",
            msg.name()
        );
    }

    fn disable(&mut self, msg: &mut MessageSettings, ctx: &mut MessageContext) {
        self.cancel(msg.name(), ctx);
    }

    fn rename(&mut self, old_name: &str, new_name: &str, ctx: &mut MessageContext) {
        let Some(scheduled_at) = self.scheduled_at else {
            return;
        };

        let old = TaskKey::message(old_name);
        if let Some(remaining) =
            ctx.reschedule_remaining(&old, TaskKey::message(new_name), scheduled_at, self.delay())
        {
            debug!(target: "messages", "Moved timed task to '{}', {:?} left", new_name, remaining);
        }
    }

    fn on_round_start(
        &mut self,
        msg: &mut MessageSettings,
        _map: &str,
        _mode: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        if self.scheduled_at.is_some() {
            return Ok(());
        }

        debug!(target: "messages", "Enabling task for {} at {} seconds.", msg.name(), self.seconds);
        ctx.schedule(TaskKey::message(msg.name()), self.delay());
        self.scheduled_at = Some(ctx.now());
        Ok(())
    }

    fn on_round_end(
        &mut self,
        msg: &mut MessageSettings,
        _winning_team: u32,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        self.cancel(msg.name(), ctx);
        Ok(())
    }

    fn process_scheduled_task(
        &mut self,
        msg: &mut MessageSettings,
        _task: &TaskKey,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        msg.send(&msg.body, None, ctx)
    }

    fn fields(&self, _shared: &SharedTriggerState) -> Vec<(MessageField, String)> {
        vec![(MessageField::RoundSeconds, self.seconds.to_string())]
    }

    fn set_field(
        &mut self,
        _msg: &MessageSettings,
        field: MessageField,
        value: &str,
        _ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        match field {
            MessageField::RoundSeconds => {
                self.seconds = parse_seconds(field, value)?;
                Ok(())
            }
            _ => Err(ConfigError::FieldNotSupported {
                field,
                kind: self.kind(),
            }),
        }
    }
}
