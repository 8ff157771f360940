use serde::{Deserialize, Serialize};

use crate::context::SharedTriggerState;
use crate::message::{Destination, Message, MessageField, OutputMode, Trigger, TriggerKind};

/// One `[[messages]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageConfig {
    pub name: String,
    pub trigger: TriggerKind,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub output: OutputMode,

    /// Only join and spawn messages may use `player`
    #[serde(default)]
    pub destination: Destination,

    /// Text to send; `{0}` is the player name or the ticket percentage
    #[serde(default)]
    pub body: String,

    /// Player join: seconds between joining and the message. Shared by all
    /// join messages; the last one loaded wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u64>,

    /// Player spawn: only the first spawn after joining (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_once: Option<bool>,

    /// Ticket count: percentage of the starting tickets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_percent: Option<u32>,

    /// Timed counter: seconds after round start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
}

impl MessageConfig {
    pub fn new(name: impl Into<String>, trigger: TriggerKind) -> Self {
        Self {
            name: name.into(),
            trigger,
            enabled: false,
            output: OutputMode::default(),
            destination: Destination::default(),
            body: String::new(),
            delay_seconds: None,
            trigger_once: None,
            ticket_percent: None,
            seconds: None,
        }
    }

    /// Snapshot of a live message
    pub fn from_message(message: &Message, shared: &SharedTriggerState) -> Self {
        let settings = message.settings();
        let mut config = Self::new(message.name(), message.kind());
        config.enabled = message.enabled();
        config.output = settings.output;
        config.destination = settings.destination;
        config.body = settings.body.clone();

        match message.trigger() {
            Trigger::PlayerJoin(_) => {
                config.delay_seconds = Some(shared.player_join_delay.as_secs());
            }
            Trigger::PlayerSpawn(t) => config.trigger_once = Some(t.trigger_once()),
            Trigger::TicketCount(t) => config.ticket_percent = Some(t.percent()),
            Trigger::TimedCounter(t) => config.seconds = Some(t.seconds()),
        }
        config
    }

    /// Field assignments that recreate this message, in the order they must
    /// be applied. Enabling comes last so triggers start fully configured.
    pub fn field_values(&self) -> Vec<(MessageField, String)> {
        let mut values = vec![
            (MessageField::Output, self.output.to_string()),
            (MessageField::Destination, self.destination.to_string()),
            (MessageField::Body, self.body.clone()),
        ];

        let specific = [
            (MessageField::JoinDelay, self.delay_seconds.map(|v| v.to_string())),
            (MessageField::TriggerFrequency, self.trigger_once.map(|v| v.to_string())),
            (MessageField::TicketPercent, self.ticket_percent.map(|v| v.to_string())),
            (MessageField::RoundSeconds, self.seconds.map(|v| v.to_string())),
        ];
        values.extend(
            specific
                .into_iter()
                .filter_map(|(field, value)| value.map(|value| (field, value))),
        );

        if self.enabled {
            values.push((MessageField::Enabled, "True".to_string()));
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_entry_uses_defaults() {
        let config: MessageConfig = toml::from_str(
            r#"
            name = "welcome"
            trigger = "player_join"
            "#,
        )
        .unwrap();

        assert_eq!(config, MessageConfig::new("welcome", TriggerKind::PlayerJoin));
    }

    #[test]
    fn test_field_values_order() {
        let mut config = MessageConfig::new("tickets", TriggerKind::TicketCount);
        config.enabled = true;
        config.output = OutputMode::SayAndYell;
        config.ticket_percent = Some(25);

        let fields: Vec<MessageField> = config.field_values().into_iter().map(|(f, _)| f).collect();
        assert_eq!(
            fields,
            vec![
                MessageField::Output,
                MessageField::Destination,
                MessageField::Body,
                MessageField::TicketPercent,
                MessageField::Enabled,
            ]
        );
        assert_eq!(config.field_values()[0].1, "SAY_AND_YELL");
    }
}
