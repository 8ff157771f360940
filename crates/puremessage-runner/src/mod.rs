mod command_printer;
mod engine_runner;
mod error;
pub mod logging;
mod replay;

pub use command_printer::{format_command, print_commands};
pub use engine_runner::{
    EngineConsumer, EngineHandle, EngineInput, build_dispatcher, engine_channel, run_engine,
};
pub use error::RunnerError;
pub use logging::LogLevel;
pub use replay::{TimedCommand, format_offset, run_replay};
