use tracing::{debug, info};

use crate::context::{MessageContext, SharedTriggerState};
use crate::error::ConfigError;
use crate::message::{Message, MessageField, TriggerKind};

/// Value of the trigger field that deletes a message
pub const REMOVE_TRIGGER: &str = "Remove";

/// Reject names the flat settings protocol could not round trip
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    let reason = if name.trim().is_empty() {
        "cannot be empty"
    } else if name.contains('-') {
        "cannot use dash"
    } else if name.contains('|') {
        "cannot use vertical bar/pipe"
    } else {
        return Ok(());
    };

    Err(ConfigError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Configured messages in creation order, unique by name
#[derive(Debug, Default)]
pub struct MessageRegistry {
    messages: Vec<Message>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Message> {
        self.messages.iter_mut()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name() == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.name() == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.name() == name)
    }

    fn require(&self, name: &str) -> Result<usize, ConfigError> {
        self.position(name)
            .ok_or_else(|| ConfigError::UnknownMessage(name.to_string()))
    }

    /// Add a new, disabled message of `kind` with a generated name and
    /// return that name
    pub fn add(&mut self, kind: TriggerKind) -> String {
        let mut count = self.messages.len();
        let name = loop {
            let candidate = format!("{} Message #{}", kind.label(), count);
            if !self.contains(&candidate) {
                break candidate;
            }
            count += 1;
        };

        info!(target: "registry", "Added {} message '{}'", kind, name);
        self.messages.push(Message::new(name.clone(), kind));
        name
    }

    /// Add a disabled message under a chosen name
    pub fn insert(&mut self, name: &str, kind: TriggerKind) -> Result<&mut Message, ConfigError> {
        validate_name(name)?;
        if self.contains(name) {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }

        debug!(target: "registry", "Inserted {} message '{}'", kind, name);
        self.messages.push(Message::new(name, kind));
        let last = self.messages.len() - 1;
        Ok(&mut self.messages[last])
    }

    /// Change the trigger kind of a message. The old state machine is
    /// disabled and dropped; the new one keeps the common settings and is
    /// enabled again if the old one was.
    pub fn replace(
        &mut self,
        name: &str,
        kind: TriggerKind,
        ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        let index = self.require(name)?;
        let old = &mut self.messages[index];
        if old.kind() == kind {
            return Ok(());
        }

        let was_enabled = old.enabled();
        old.disable(ctx);

        let mut replacement = Message::with_settings_of(old, kind);
        if was_enabled {
            replacement.enable(ctx);
        }

        info!(target: "registry", "Changed '{}' from {} to {}", name, old.kind(), kind);
        self.messages[index] = replacement;
        Ok(())
    }

    /// Disable and drop a message
    pub fn remove(&mut self, name: &str, ctx: &mut MessageContext) -> Result<Message, ConfigError> {
        let index = self.require(name)?;
        let mut message = self.messages.remove(index);
        message.disable(ctx);

        info!(target: "registry", "Removed message '{}'", name);
        Ok(message)
    }

    /// Rename a message; anything it has scheduled follows it
    pub fn rename(
        &mut self,
        old_name: &str,
        new_name: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        let index = self.require(old_name)?;
        if old_name == new_name {
            return Ok(());
        }

        validate_name(new_name)?;
        if self.contains(new_name) {
            return Err(ConfigError::DuplicateName(new_name.to_string()));
        }

        self.messages[index].rename(new_name, ctx);
        info!(target: "registry", "Renamed '{}' to '{}'", old_name, new_name);
        Ok(())
    }

    pub fn set_enabled(
        &mut self,
        name: &str,
        enabled: bool,
        ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        let index = self.require(name)?;
        let message = &mut self.messages[index];
        if enabled {
            message.enable(ctx);
        } else if message.enabled() {
            message.disable(ctx);
        }
        Ok(())
    }

    /// Switch on every message that is off
    pub fn enable_all(&mut self, ctx: &mut MessageContext) {
        for message in self.messages.iter_mut().filter(|m| !m.enabled()) {
            message.enable(ctx);
        }
    }

    /// Switch off every message that is on
    pub fn disable_all(&mut self, ctx: &mut MessageContext) {
        for message in self.messages.iter_mut().filter(|m| m.enabled()) {
            message.disable(ctx);
        }
    }

    pub fn fields(
        &self,
        name: &str,
        shared: &SharedTriggerState,
    ) -> Result<Vec<(MessageField, String)>, ConfigError> {
        let index = self.require(name)?;
        Ok(self.messages[index].fields(shared))
    }

    pub fn get_field(
        &self,
        name: &str,
        field: MessageField,
        shared: &SharedTriggerState,
    ) -> Result<String, ConfigError> {
        let index = self.require(name)?;
        self.messages[index].get_field(field, shared)
    }

    /// Set one field of a message from its text form.
    ///
    /// The name field renames, and the trigger field either replaces the
    /// state machine or, given [`REMOVE_TRIGGER`], removes the message.
    pub fn set_field(
        &mut self,
        name: &str,
        field: MessageField,
        value: &str,
        ctx: &mut MessageContext,
    ) -> Result<(), ConfigError> {
        match field {
            MessageField::Name => self.rename(name, value.trim(), ctx),
            MessageField::Trigger if value.trim().eq_ignore_ascii_case(REMOVE_TRIGGER) => {
                self.remove(name, ctx).map(|_| ())
            }
            MessageField::Trigger => self.replace(name, value.parse()?, ctx),
            _ => {
                let index = self.require(name)?;
                self.messages[index].set_field(field, value, ctx)
            }
        }
    }
}
