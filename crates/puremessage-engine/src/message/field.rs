use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A configurable property of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageField {
    Name,
    Trigger,
    Enabled,
    Output,
    Destination,
    Body,
    /// PlayerJoin: seconds between joining and the message
    JoinDelay,
    /// PlayerSpawn: first spawn only, or every spawn
    TriggerFrequency,
    /// TicketCount: threshold as a percentage of the starting tickets
    TicketPercent,
    /// TimedCounter: seconds after round start
    RoundSeconds,
}

/// Shape of a field's value, for whoever renders the settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    String,
    Multiline,
    Bool,
    Int,
    Choice(&'static [&'static str]),
}

pub const ONLY_FIRST_SPAWN: &str = "Only first spawn";
pub const EVERY_SPAWN: &str = "Every spawn";

impl MessageField {
    pub const ALL: [MessageField; 10] = [
        MessageField::Name,
        MessageField::Trigger,
        MessageField::Enabled,
        MessageField::Output,
        MessageField::Destination,
        MessageField::Body,
        MessageField::JoinDelay,
        MessageField::TriggerFrequency,
        MessageField::TicketPercent,
        MessageField::RoundSeconds,
    ];

    /// Label used in the flat `<name>|<name> - <label>` settings
    pub fn label(&self) -> &'static str {
        match self {
            MessageField::Name => "Message name",
            MessageField::Trigger => "Message trigger",
            MessageField::Enabled => "Message enabled",
            MessageField::Output => "Message type",
            MessageField::Destination => "Message destination",
            MessageField::Body => "Message body",
            MessageField::JoinDelay => "Message delay (seconds)",
            MessageField::TriggerFrequency => "Trigger options",
            MessageField::TicketPercent => "Ticket Count Percent",
            MessageField::RoundSeconds => "Seconds from start of round",
        }
    }

    /// Key used in the TOML configuration
    pub fn key(&self) -> &'static str {
        match self {
            MessageField::Name => "name",
            MessageField::Trigger => "trigger",
            MessageField::Enabled => "enabled",
            MessageField::Output => "output",
            MessageField::Destination => "destination",
            MessageField::Body => "body",
            MessageField::JoinDelay => "delay_seconds",
            MessageField::TriggerFrequency => "trigger_once",
            MessageField::TicketPercent => "ticket_percent",
            MessageField::RoundSeconds => "seconds",
        }
    }

    pub fn setting_kind(&self) -> SettingKind {
        match self {
            MessageField::Name => SettingKind::String,
            MessageField::Trigger => SettingKind::Choice(&[
                "Remove",
                "PLAYER_JOIN",
                "PLAYER_SPAWN",
                "TICKET_COUNT",
                "TIMED_COUNTER",
            ]),
            MessageField::Enabled => SettingKind::Bool,
            MessageField::Output => SettingKind::Choice(&["SAY", "YELL", "SAY_AND_YELL"]),
            MessageField::Destination => SettingKind::Choice(&["PLAYER", "ALL"]),
            MessageField::Body => SettingKind::Multiline,
            MessageField::JoinDelay | MessageField::TicketPercent | MessageField::RoundSeconds => {
                SettingKind::Int
            }
            MessageField::TriggerFrequency => {
                SettingKind::Choice(&[ONLY_FIRST_SPAWN, EVERY_SPAWN])
            }
        }
    }
}

impl fmt::Display for MessageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MessageField {
    type Err = ConfigError;

    /// Accepts either the settings label or the TOML key, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        MessageField::ALL
            .into_iter()
            .find(|field| field.label().eq_ignore_ascii_case(s) || field.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownField(s.to_string()))
    }
}

/// Upper-case with `-` and spaces folded to `_`, so `say-and-yell`,
/// `Say and yell` and `SAY_AND_YELL` all read the same
pub(crate) fn normalize_choice(value: &str) -> String {
    value.trim().to_ascii_uppercase().replace(['-', ' '], "_")
}

pub(crate) fn parse_bool(field: MessageField, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::invalid_value(field, value, "True or False")),
    }
}

pub(crate) fn parse_seconds(field: MessageField, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid_value(field, value, "a whole number of seconds"))
}

pub(crate) fn parse_percent(field: MessageField, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(percent) if percent <= 100 => Ok(percent),
        _ => Err(ConfigError::invalid_value(field, value, "a percentage from 0 to 100")),
    }
}
