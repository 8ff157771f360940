use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::message_config::MessageConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ConfigError;
use crate::message::{Destination, OutputMode, TriggerKind};
use puremessage_events::DEFAULT_YELL_DURATION;

#[derive(Debug)]
pub enum ConfigLoadError {
    NotFound(PathBuf),
    ParseError(String),
    IoError(String),
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::NotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            ConfigLoadError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigLoadError::IoError(msg) => write!(f, "IO error reading config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigLoadError {}

/// Contents of `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log at debug level
    #[serde(default)]
    pub debug: bool,

    /// How often the runner checks for due tasks, in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Seconds a yell stays on screen
    #[serde(default = "default_yell_duration")]
    pub yell_duration: u32,

    #[serde(default)]
    pub messages: Vec<MessageConfig>,
}

fn default_tick_interval() -> u64 {
    250
}

fn default_yell_duration() -> u32 {
    DEFAULT_YELL_DURATION
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            tick_interval_ms: default_tick_interval(),
            yell_duration: default_yell_duration(),
            messages: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "puremessage")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("puremessage.toml"))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound(path.to_path_buf()));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        let config = Self::parse(&content)?;
        info!(target: "config", "Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigLoadError> {
        toml::from_str(content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&self)?;
        fs::write(path, content)?;
        info!(target: "config", "Saved config to {}", path.display());
        Ok(())
    }

    /// Recreate every configured message in `dispatcher`, going through the
    /// same validation as live changes. Entries that fail are skipped and
    /// returned with their message name.
    pub fn apply_to(&self, dispatcher: &mut Dispatcher, now: Instant) -> Vec<(String, ConfigError)> {
        dispatcher.set_debug(self.debug);

        let mut rejected = Vec::new();
        for entry in &self.messages {
            if let Err(e) = dispatcher.insert_message(&entry.name, entry.trigger) {
                warn!(target: "config", "Skipping message '{}': {}", entry.name, e);
                rejected.push((entry.name.clone(), e));
                continue;
            }

            for (field, value) in entry.field_values() {
                if let Err(e) = dispatcher.set_field(&entry.name, field, &value, now) {
                    warn!(target: "config", "Message '{}': {}", entry.name, e);
                    rejected.push((entry.name.clone(), e));
                }
            }
        }
        rejected
    }

    /// Snapshot of the dispatcher's messages, for saving
    pub fn from_dispatcher(dispatcher: &Dispatcher, base: &EngineConfig) -> Self {
        Self {
            debug: dispatcher.debug(),
            tick_interval_ms: base.tick_interval_ms,
            yell_duration: base.yell_duration,
            messages: dispatcher
                .registry()
                .iter()
                .map(|m| MessageConfig::from_message(m, dispatcher.shared()))
                .collect(),
        }
    }

    /// A config with one message of each kind, written by `puremessage init`
    pub fn example() -> Self {
        let mut welcome = MessageConfig::new("welcome", TriggerKind::PlayerJoin);
        welcome.enabled = true;
        welcome.destination = Destination::Player;
        welcome.body = "Welcome to the server, {0}!".to_string();
        welcome.delay_seconds = Some(5);

        let mut rules = MessageConfig::new("rules", TriggerKind::PlayerSpawn);
        rules.enabled = true;
        rules.destination = Destination::Player;
        rules.body = "Hi {0}. Rules: no base camping. No glitching. Be respectful in chat; \
                      repeat offenders will be kicked, then banned."
            .to_string();
        rules.trigger_once = Some(true);

        let mut halfway = MessageConfig::new("halfway", TriggerKind::TicketCount);
        halfway.enabled = true;
        halfway.output = OutputMode::SayAndYell;
        halfway.body = "Only {0}% of the tickets left!".to_string();
        halfway.ticket_percent = Some(50);

        let mut reminder = MessageConfig::new("reminder", TriggerKind::TimedCounter);
        reminder.enabled = true;
        reminder.body = "Visit our website to report players.".to_string();
        reminder.seconds = Some(300);

        Self {
            messages: vec![welcome, rules, halfway, reminder],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::message::MessageField;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn dispatcher() -> Dispatcher {
        let (tx, _rx) = mpsc::unbounded_channel();
        Dispatcher::new(Broadcaster::new(tx))
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.yell_duration, 10);
    }

    #[test]
    fn test_parse_error() {
        let result = EngineConfig::parse("[[messages]]\nname = 3\n");
        assert!(matches!(result, Err(ConfigLoadError::ParseError(_))));
    }

    #[test]
    fn test_apply_example() {
        let mut d = dispatcher();
        let rejected = EngineConfig::example().apply_to(&mut d, Instant::now());
        assert!(rejected.is_empty(), "{:?}", rejected);

        assert_eq!(d.registry().len(), 4);
        assert!(d.registry().iter().all(|m| m.enabled()));
        assert_eq!(d.get_field("welcome", MessageField::JoinDelay), Ok("5".to_string()));
        assert_eq!(
            d.get_field("rules", MessageField::Destination),
            Ok("PLAYER".to_string())
        );
        assert_eq!(d.get_field("reminder", MessageField::RoundSeconds), Ok("300".to_string()));
    }

    #[test]
    fn test_apply_reports_bad_entries() {
        let config = EngineConfig::parse(
            r#"
            [[messages]]
            name = "bad-name"
            trigger = "player_join"

            [[messages]]
            name = "tickets"
            trigger = "ticket_count"
            destination = "player"
            ticket_percent = 40

            [[messages]]
            name = "tickets"
            trigger = "timed_counter"
            "#,
        )
        .unwrap();

        let mut d = dispatcher();
        let rejected = config.apply_to(&mut d, Instant::now());
        let names: Vec<&str> = rejected.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["bad-name", "tickets", "tickets"]);
        assert_eq!(
            rejected[1].1,
            ConfigError::DestinationNotAllowed(TriggerKind::TicketCount)
        );
        assert_eq!(rejected[2].1, ConfigError::DuplicateName("tickets".to_string()));

        // The good parts of the ticket entry still applied
        assert_eq!(d.get_field("tickets", MessageField::TicketPercent), Ok("40".to_string()));
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut d = dispatcher();
        let example = EngineConfig::example();
        example.apply_to(&mut d, Instant::now());
        d.set_field("rules", MessageField::TriggerFrequency, "Every spawn", Instant::now())
            .unwrap();

        let snapshot = EngineConfig::from_dispatcher(&d, &example);
        snapshot.save_to(&path).unwrap();

        let reloaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(reloaded, snapshot);
        let rules = reloaded.messages.iter().find(|m| m.name == "rules").unwrap();
        assert_eq!(rules.trigger_once, Some(false));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            EngineConfig::load_from(&path),
            Err(ConfigLoadError::NotFound(p)) if p == path
        ));
    }
}
