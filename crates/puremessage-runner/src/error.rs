use puremessage_engine::ConfigLoadError;
use puremessage_events::ReplayParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("engine task has stopped")]
    EngineStopped,
    #[error("{0}")]
    Config(#[from] ConfigLoadError),
    #[error("replay: {0}")]
    Replay(#[from] ReplayParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
