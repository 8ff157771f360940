pub mod engine_config;
pub mod message_config;

pub use engine_config::{ConfigLoadError, EngineConfig};
pub use message_config::MessageConfig;
