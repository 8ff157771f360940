/// Message trigger engine
///
/// Administrators configure named messages, each bound to a trigger: a
/// player joining, a player spawning, a team's tickets dropping below a
/// percentage, or a fixed time into the round. The [`Dispatcher`] feeds
/// lifecycle events and due tasks to the enabled messages, which send their
/// text through a [`Broadcaster`].
///
/// Nothing in this crate reads the clock or spawns tasks. Callers pass the
/// current `Instant` in and call [`Dispatcher::tick`] often enough for
/// scheduled messages to go out on time.
pub mod broadcast;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod template;
pub mod text_splitter;

pub use broadcast::{BroadcastChannel, Broadcaster};
pub use config::{ConfigLoadError, EngineConfig, MessageConfig};
pub use context::{MessageContext, PlayerRoster, SharedTriggerState};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::{ConfigError, MessageError};
pub use message::{
    Destination, Message, MessageField, MessageSettings, OutputMode, SettingKind, Trigger,
    TriggerHooks, TriggerKind,
};
pub use registry::{MessageRegistry, validate_name};
pub use scheduler::{ScheduledTask, TaskHandle, TaskKey, TaskScheduler};
pub use settings::{Setting, SettingCommand};
pub use template::format_template;
pub use text_splitter::{SAY_MAX_LENGTH, YELL_MAX_LENGTH, split_message};
