//! Flat `<name>|<name> - <label>` settings, the form a host plugin UI
//! lists and sets message fields in

use crate::context::SharedTriggerState;
use crate::error::ConfigError;
use crate::message::{display_bool, MessageField, SettingKind, TriggerKind};
use crate::registry::MessageRegistry;

/// Section holding the settings that are not about one message
pub const GLOBAL_SECTION: &str = "Add New/Settings";
pub const DEBUG_LABEL: &str = "Debug";
pub const ADD_MESSAGE_LABEL: &str = "Add a message";
/// Placeholder value of the add-a-message choice
pub const CHOOSE: &str = "Choose...";
/// Variable the host sets to refresh its view; carries no change
pub const IGNORE: &str = "IGNORE";

const ADD_MESSAGE_CHOICES: &[&str] = &[
    CHOOSE,
    "PLAYER_JOIN",
    "PLAYER_SPAWN",
    "TICKET_COUNT",
    "TIMED_COUNTER",
];

/// One listed setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub variable: String,
    pub kind: SettingKind,
    pub value: String,
}

/// A parsed settings assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingCommand {
    Ignore,
    SetDebug(bool),
    AddMessage(TriggerKind),
    SetField {
        message: String,
        field: MessageField,
        value: String,
    },
}

/// Variable name for one field of one message
pub fn variable_name(message: &str, field: MessageField) -> String {
    format!("{0}|{0} - {1}", message, field.label())
}

fn global_variable(label: &str) -> String {
    format!("{}|{}", GLOBAL_SECTION, label)
}

/// Every setting the registry exposes, message by message, followed by the
/// global ones
pub fn list_settings(
    registry: &MessageRegistry,
    shared: &SharedTriggerState,
    debug: bool,
) -> Vec<Setting> {
    let mut settings: Vec<Setting> = registry
        .iter()
        .flat_map(|message| {
            message
                .fields(shared)
                .into_iter()
                .map(move |(field, value)| Setting {
                    variable: variable_name(message.name(), field),
                    kind: field.setting_kind(),
                    value,
                })
        })
        .collect();

    settings.push(Setting {
        variable: global_variable(DEBUG_LABEL),
        kind: SettingKind::Bool,
        value: display_bool(debug),
    });
    settings.push(Setting {
        variable: global_variable(ADD_MESSAGE_LABEL),
        kind: SettingKind::Choice(ADD_MESSAGE_CHOICES),
        value: CHOOSE.to_string(),
    });
    settings
}

/// Parse one `variable = value` assignment
pub fn parse_setting(variable: &str, value: &str) -> Result<SettingCommand, ConfigError> {
    let variable = variable.trim();
    if variable == IGNORE {
        return Ok(SettingCommand::Ignore);
    }

    // Global settings may arrive with or without their section
    let label = variable
        .strip_prefix(GLOBAL_SECTION)
        .and_then(|rest| rest.strip_prefix('|'))
        .unwrap_or(variable);

    if label == DEBUG_LABEL {
        let debug = crate::message::field::parse_bool(MessageField::Enabled, value)
            .map_err(|_| ConfigError::invalid_value(DEBUG_LABEL, value, "True or False"))?;
        return Ok(SettingCommand::SetDebug(debug));
    }

    if label == ADD_MESSAGE_LABEL {
        if value.trim() == CHOOSE {
            return Ok(SettingCommand::Ignore);
        }
        return Ok(SettingCommand::AddMessage(value.parse()?));
    }

    let (section, label) = variable
        .split_once(" - ")
        .ok_or_else(|| ConfigError::MalformedVariable(variable.to_string()))?;
    let message = section
        .split_once('|')
        .map_or(section, |(name, _)| name)
        .trim();
    if message.is_empty() {
        return Err(ConfigError::MalformedVariable(variable.to_string()));
    }

    Ok(SettingCommand::SetField {
        message: message.to_string(),
        field: label.parse()?,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_settings() {
        assert_eq!(
            parse_setting("welcome|welcome - Message body", "Welcome {0}!"),
            Ok(SettingCommand::SetField {
                message: "welcome".to_string(),
                field: MessageField::Body,
                value: "Welcome {0}!".to_string(),
            })
        );
        assert_eq!(
            parse_setting("Player Join Message #0 - Message delay (seconds)", "5"),
            Ok(SettingCommand::SetField {
                message: "Player Join Message #0".to_string(),
                field: MessageField::JoinDelay,
                value: "5".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_global_settings() {
        assert_eq!(
            parse_setting("Add New/Settings|Debug", "False"),
            Ok(SettingCommand::SetDebug(false))
        );
        assert_eq!(
            parse_setting("Add New/Settings|Add a message", "TICKET_COUNT"),
            Ok(SettingCommand::AddMessage(TriggerKind::TicketCount))
        );
        assert_eq!(
            parse_setting("Add a message", "Choose..."),
            Ok(SettingCommand::Ignore)
        );
        assert_eq!(parse_setting("IGNORE", "IGNORE"), Ok(SettingCommand::Ignore));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_setting("welcome", "x"),
            Err(ConfigError::MalformedVariable("welcome".to_string()))
        );
        assert_eq!(
            parse_setting("welcome|welcome - Message colour", "red"),
            Err(ConfigError::UnknownField("Message colour".to_string()))
        );
        assert!(parse_setting("Add a message", "PLAYER_DEATH").is_err());
    }

    #[test]
    fn test_list_settings_round_trips_through_parse() {
        let mut registry = MessageRegistry::new();
        registry.insert("welcome", TriggerKind::PlayerJoin).unwrap();
        let settings = list_settings(&registry, &SharedTriggerState::default(), true);

        assert_eq!(settings[0].variable, "welcome|welcome - Message name");
        assert_eq!(settings[0].value, "welcome");

        let debug = &settings[settings.len() - 2];
        assert_eq!(debug.variable, "Add New/Settings|Debug");
        assert_eq!(debug.value, "True");

        for setting in &settings {
            assert!(parse_setting(&setting.variable, &setting.value).is_ok());
        }
    }
}
