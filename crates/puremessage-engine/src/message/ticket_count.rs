use puremessage_events::ServerInfo;
use tracing::{info, warn};

use super::field::parse_percent;
use super::{MessageField, MessageSettings, TriggerHooks, TriggerKind};
use crate::context::{MessageContext, SharedTriggerState};
use crate::error::{ConfigError, MessageError};
use crate::template::format_template;

/// Sends the message once per round when either team's tickets drop to a
/// percentage of the round's starting tickets. Conquest only.
///
/// The starting count is shared by every ticket count message and lives in
/// [`SharedTriggerState::start_ticket_count`].
#[derive(Debug, Default)]
pub struct TicketCountTrigger {
    percent: u32,
    triggered: bool,
    /// Set once a round has started while the message was enabled. Until
    /// then the starting count cannot be trusted.
    armed: bool,
}

impl TicketCountTrigger {
    pub fn percent(&self) -> u32 {
        self.percent
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    fn threshold_reached(&self, score: i32, start: i32) -> bool {
        i64::from(score) * 100 <= i64::from(self.percent) * i64::from(start)
    }
}

impl TriggerHooks for TicketCountTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::TicketCount
    }

    fn enable(&mut self, msg: &mut MessageSettings, _ctx: &mut MessageContext) {
        self.armed = false;
        info!(
            target: "messages",
            "Ticket Count Message '{}' requires a round restart to grab the initial ticket count.",
            msg.name()
        );
    }

    fn disable(&mut self, _msg: &mut MessageSettings, _ctx: &mut MessageContext) {
        self.triggered = false;
    }

    fn on_round_start(
        &mut self,
        _msg: &mut MessageSettings,
        _map: &str,
        _mode: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        self.armed = true;
        self.triggered = false;
        ctx.shared_mut().start_ticket_count = None;
        Ok(())
    }

    fn on_round_end(
        &mut self,
        _msg: &mut MessageSettings,
        _winning_team: u32,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        ctx.shared_mut().start_ticket_count = None;
        self.triggered = false;
        Ok(())
    }

    fn on_server_info(
        &mut self,
        msg: &mut MessageSettings,
        info: &ServerInfo,
        ctx: &mut MessageContext,
    ) -> Result<(), MessageError> {
        if !info.is_conquest() {
            msg.switch_off();
            self.triggered = false;
            warn!(
                target: "messages",
                "Ticket Count Message '{}' only works in Conquest, disabling it ({})",
                msg.name(),
                info.game_mode
            );
            return Ok(());
        }

        if !self.armed || info.team_scores.len() < 2 {
            return Ok(());
        }

        let start = *ctx
            .shared_mut()
            .start_ticket_count
            .get_or_insert(info.team_scores[0].score);

        if self.triggered {
            return Ok(());
        }

        let reached = info.team_scores[..2]
            .iter()
            .any(|team| self.threshold_reached(team.score, start));
        if reached {
            self.triggered = true;
            let percent = self.percent.to_string();
            msg.send(&format_template(&msg.body, &[&percent]), None, ctx)?;
        }
        Ok(())
    }

    fn fields(&self, _shared: &SharedTriggerState) -> Vec<(MessageField, String)> {
        vec![(MessageField::TicketPercent, self.percent.to_string())]
    }

    fn set_field(
        &mut self,
        _msg: &MessageSettings,
        field: MessageField,
        value: &str,
        _ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        match field {
            MessageField::TicketPercent => {
                self.percent = parse_percent(field, value)?;
                Ok(())
            }
            _ => Err(ConfigError::FieldNotSupported {
                field,
                kind: self.kind(),
            }),
        }
    }
}
