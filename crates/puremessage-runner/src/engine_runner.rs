use std::time::{Duration, Instant};

use puremessage_engine::{Broadcaster, ConfigError, Dispatcher, EngineConfig};
use puremessage_events::{BroadcastCommand, EventConsumer, EventEnvelope, GameEvent};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::RunnerError;
use crate::logging::LogLevel;

/// Work for the engine task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineInput {
    Event(GameEvent),
    /// A flat `<name>|<name> - <label>` setting change
    Setting { variable: String, value: String },
    /// Stop reading input and stop once nothing is scheduled
    Drain,
    Shutdown,
}

/// Cloneable sender side of a running engine
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineInput>,
}

impl EngineHandle {
    pub fn send_event(&self, event: GameEvent) -> Result<(), RunnerError> {
        self.send(EngineInput::Event(event))
    }

    pub fn apply_setting(
        &self,
        variable: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), RunnerError> {
        self.send(EngineInput::Setting {
            variable: variable.into(),
            value: value.into(),
        })
    }

    /// Let pending tasks go out, then stop
    pub fn drain(&self) -> Result<(), RunnerError> {
        self.send(EngineInput::Drain)
    }

    pub fn shutdown(&self) -> Result<(), RunnerError> {
        self.send(EngineInput::Shutdown)
    }

    fn send(&self, input: EngineInput) -> Result<(), RunnerError> {
        self.tx.send(input).map_err(|_| RunnerError::EngineStopped)
    }
}

/// Create the input channel for [`run_engine`]
pub fn engine_channel() -> (EngineHandle, mpsc::UnboundedReceiver<EngineInput>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EngineHandle { tx }, rx)
}

/// Build a dispatcher from `config`, sending its commands to `commands_tx`.
/// Config entries that were rejected are returned alongside it.
pub fn build_dispatcher(
    config: &EngineConfig,
    commands_tx: mpsc::UnboundedSender<BroadcastCommand>,
    now: Instant,
) -> (Dispatcher, Vec<(String, ConfigError)>) {
    let broadcaster = Broadcaster::new(commands_tx).with_yell_duration(config.yell_duration);
    let mut dispatcher = Dispatcher::new(broadcaster);
    let rejected = config.apply_to(&mut dispatcher, now);
    info!(
        target: "runner",
        "Loaded {} message(s), {} rejected setting(s)",
        dispatcher.registry().len(),
        rejected.len()
    );
    (dispatcher, rejected)
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Drive `dispatcher` until a shutdown input arrives, every handle is
/// dropped, or `shutdown_rx` flips to true. After a drain input, no more
/// input is read and the engine stops once nothing is scheduled. Due tasks
/// are checked every `tick_interval`. When `log_level` is given, the Debug
/// setting switches it. Returns the dispatcher so the caller can save its state.
pub async fn run_engine(
    mut dispatcher: Dispatcher,
    mut input_rx: mpsc::UnboundedReceiver<EngineInput>,
    tick_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    log_level: Option<LogLevel>,
) -> Dispatcher {
    let mut last_tick = tokio::time::Instant::now();
    let mut draining = false;

    loop {
        if draining && dispatcher.next_due().is_none() {
            info!(target: "runner", "Nothing left scheduled, stopping");
            break;
        }

        tokio::select! {
            input = input_rx.recv(), if !draining => {
                match input {
                    Some(EngineInput::Event(event)) => {
                        dispatcher.handle_event(&event, now());
                    }
                    Some(EngineInput::Setting { variable, value }) => {
                        let was_debug = dispatcher.debug();
                        if let Err(e) = dispatcher.apply_setting(&variable, &value, now()) {
                            warn!(target: "runner", "Rejected setting '{}': {}", variable, e);
                        }
                        if dispatcher.debug() != was_debug {
                            set_log_level(log_level.as_ref(), dispatcher.debug());
                        }
                    }
                    Some(EngineInput::Drain) => {
                        let pending = dispatcher.scheduled_messages();
                        if !pending.is_empty() {
                            info!(
                                target: "runner",
                                "Input finished, waiting for: {}",
                                pending.join(", ")
                            );
                        }
                        draining = true;
                    }
                    Some(EngineInput::Shutdown) | None => {
                        info!(target: "runner", "Engine input closed, stopping");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep_until(last_tick + tick_interval) => {
                last_tick = tokio::time::Instant::now();
                let fired = dispatcher.tick(last_tick.into_std());
                if fired > 0 {
                    debug!(target: "runner", "{} task(s) fired", fired);
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!(target: "runner", "Shutdown requested");
                    break;
                }
            }
        }
    }

    let stats = dispatcher.stats();
    info!(
        target: "runner",
        "Engine stopped: {} delivered, {} failed, {} task(s) fired",
        stats.delivered,
        stats.failed,
        stats.tasks_fired
    );
    dispatcher
}

fn set_log_level(log_level: Option<&LogLevel>, debug: bool) {
    let Some(log_level) = log_level else { return };
    if let Err(e) = log_level.set_debug(debug) {
        warn!(target: "runner", "Failed to change log level: {}", e);
    }
}

/// Event consumer that forwards to a running engine
pub struct EngineConsumer {
    handle: EngineHandle,
}

impl EngineConsumer {
    pub fn new(handle: EngineHandle) -> Self {
        Self { handle }
    }
}

impl EventConsumer for EngineConsumer {
    fn handle_event(&mut self, envelope: EventEnvelope) {
        if let Err(e) = self.handle.send_event(envelope.event) {
            warn!(target: "runner", "Dropping event: {}", e);
        }
    }
}
