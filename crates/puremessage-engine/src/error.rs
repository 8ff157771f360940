use thiserror::Error;

use crate::message::{MessageField, TriggerKind};

/// Failure raised by a message while handling an event or a fired task.
/// The dispatcher logs these and carries on with the next message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("message '{message}' sends to a player but no player was given")]
    MissingRecipient { message: String },

    #[error("task for message '{message}' fired without a player")]
    MissingTaskPlayer { message: String },
}

/// Rejected configuration change. Returned to whoever applied the setting;
/// never escapes as a panic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("A message named '{0}' already exists")]
    DuplicateName(String),

    #[error("No message named '{0}'")]
    UnknownMessage(String),

    #[error("Unknown setting '{0}'")]
    UnknownField(String),

    #[error("'{field}' is not a setting of {kind} messages")]
    FieldNotSupported {
        field: MessageField,
        kind: TriggerKind,
    },

    #[error("Invalid value '{value}' for '{field}': expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("{0} messages can only be sent to ALL")]
    DestinationNotAllowed(TriggerKind),

    #[error("Unknown message trigger '{0}'")]
    UnknownTrigger(String),

    #[error("Malformed setting name '{0}'")]
    MalformedVariable(String),
}

impl ConfigError {
    pub(crate) fn invalid_value(
        field: impl ToString,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.into(),
            expected,
        }
    }
}
