mod input;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use puremessage_engine::{EngineConfig, SAY_MAX_LENGTH, YELL_MAX_LENGTH, split_message};
use puremessage_events::parse_replay;
use puremessage_runner::{
    LogLevel, build_dispatcher, engine_channel, format_command, format_offset, logging,
    print_commands, run_engine, run_replay,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use input::{InputLine, parse_input_line};

#[derive(Parser)]
#[command(name = "puremessage", version, about, long_about = None)]
struct Cli {
    /// Log at debug level, as does `debug = true` in the config
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read events and settings from stdin and print commands as they go out
    Run {
        /// Also log to a file in the data directory
        #[arg(long)]
        log_file: bool,

        /// Write the final message setup back to the config file on exit
        #[arg(long)]
        save: bool,
    },
    /// Replay a recorded session instantly and print the resulting timeline
    Replay {
        /// Replay script, or stdin when omitted
        file: Option<PathBuf>,

        /// Seconds to keep the clock running after the last event
        #[arg(long, default_value_t = 60)]
        settle: u64,
    },
    /// Validate the config and list the resulting settings
    Check {
        /// Print every setting with its current value
        #[arg(long)]
        settings: bool,
    },
    /// Show how a message body would be split when said or yelled
    Split {
        text: String,

        #[arg(long)]
        yell: bool,
    },
    /// Write an example config file
    Init,
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(EngineConfig::config_path)
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    EngineConfig::load_from(path).with_context(|| {
        format!(
            "Failed to load config. Run `puremessage init` to create {}",
            path.display()
        )
    })
}

fn init(path: &Path) -> Result<()> {
    // Never overwrite an existing config file
    if path.exists() {
        bail!(
            "Config file already exists at {}. Edit it or delete it to start over.",
            path.display()
        );
    }

    EngineConfig::example()
        .save_to(path)
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    eprintln!("Config file created at: {}", path.display());
    Ok(())
}

fn check(config: &EngineConfig, show_settings: bool) -> Result<()> {
    let (commands_tx, _commands_rx) = mpsc::unbounded_channel();
    let (dispatcher, rejected) = build_dispatcher(config, commands_tx, Instant::now());

    for (name, e) in &rejected {
        println!("{}: {}", name, e);
    }
    println!(
        "{} message(s), {} enabled, {} problem(s)",
        dispatcher.registry().len(),
        dispatcher.registry().iter().filter(|m| m.enabled()).count(),
        rejected.len()
    );

    if show_settings {
        for setting in dispatcher.settings() {
            println!("{} = {}", setting.variable, setting.value);
        }
    }

    if !rejected.is_empty() {
        bail!("config has {} problem(s)", rejected.len());
    }
    Ok(())
}

/// The commands a body turns into: says are split, a yell always goes out whole
fn preview_chunks(text: &str, yell: bool) -> Vec<String> {
    if yell {
        vec![text.to_string()]
    } else {
        split_message(text, SAY_MAX_LENGTH)
    }
}

fn split(text: &str, yell: bool) {
    for (i, chunk) in preview_chunks(text, yell).iter().enumerate() {
        let len = chunk.chars().count();
        println!("{:>3} [{:>3}] {}", i + 1, len, chunk);
        if yell && len > YELL_MAX_LENGTH {
            warn!(
                "Yell longer than {} characters, the server may reject it",
                YELL_MAX_LENGTH
            );
        }
    }
}

fn replay(config: &EngineConfig, file: Option<&Path>, settle: u64) -> Result<()> {
    let script = match file {
        Some(file) => fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?,
        None => {
            let mut script = String::new();
            io::stdin().read_to_string(&mut script)?;
            script
        }
    };
    let lines = parse_replay(&script)?;

    let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
    let (mut dispatcher, rejected) = build_dispatcher(config, commands_tx, Instant::now());
    for (name, e) in &rejected {
        warn!(target: "config", "{}: {}", name, e);
    }

    let sent = run_replay(
        &mut dispatcher,
        &mut commands_rx,
        &lines,
        config.tick_interval(),
        Duration::from_secs(settle),
    );
    for timed in &sent {
        println!("@{} {}", format_offset(timed.offset), format_command(&timed.command));
    }

    let stats = dispatcher.stats();
    info!(
        "{} line(s) replayed, {} command(s) sent, {} failure(s)",
        lines.len(),
        sent.len(),
        stats.failed
    );
    Ok(())
}

async fn run(path: &Path, config: &EngineConfig, save: bool, log_level: LogLevel) -> Result<()> {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (dispatcher, _) = build_dispatcher(config, commands_tx, Instant::now());

    let (handle, input_rx) = engine_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut stop_rx = shutdown_rx.clone();

    let printer = tokio::spawn(print_commands(commands_rx, io::stdout()));
    let engine = tokio::spawn(run_engine(
        dispatcher,
        input_rx,
        config.tick_interval(),
        shutdown_rx,
        Some(log_level),
    ));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    info!("Reading events from stdin");
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut finished = false;
    loop {
        let line = tokio::select! {
            line = stdin.next_line() => line?,
            _ = stop_rx.changed() => break,
        };
        let Some(line) = line else {
            finished = true;
            break;
        };

        let sent = match parse_input_line(&line) {
            Ok(InputLine::Event(event)) => handle.send_event(event),
            Ok(InputLine::Setting { variable, value }) => handle.apply_setting(variable, value),
            Ok(InputLine::Blank) => Ok(()),
            Err(e) => {
                error!("{:#}", e);
                Ok(())
            }
        };
        if sent.is_err() {
            break;
        }
    }

    // At end of input, scheduled messages still go out before the engine
    // stops. A closed engine here just means Ctrl+C got there first.
    let _ = if finished {
        handle.drain()
    } else {
        handle.shutdown()
    };
    drop(handle);
    let dispatcher = engine.await?;

    if save {
        EngineConfig::from_dispatcher(&dispatcher, config)
            .save_to(path)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    // The printer stops once the dispatcher's sender is gone
    drop(dispatcher);
    let printed = printer.await?;
    info!("{} command(s) sent", printed);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = config_path(&cli);

    // The config is read first so its debug flag can set the log level
    let config = match cli.command {
        Command::Split { .. } | Command::Init => None,
        _ => Some(load_config(&path)?),
    };
    let debug = cli.debug || config.as_ref().is_some_and(|c| c.debug);

    let file_logging = matches!(cli.command, Command::Run { log_file: true, .. });
    let (log_level, _log_guard) = logging::init_logging("puremessage", file_logging, debug)?;

    match (&cli.command, &config) {
        (Command::Run { save, .. }, Some(config)) => run(&path, config, *save, log_level).await,
        (Command::Replay { file, settle }, Some(config)) => {
            replay(config, file.as_deref(), *settle)
        }
        (Command::Check { settings }, Some(config)) => check(config, *settings),
        (Command::Split { text, yell }, _) => {
            split(text, *yell);
            Ok(())
        }
        (Command::Init, _) => init(&path),
        (_, None) => bail!("no config loaded"),
    }
}
