use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

const MAX_LOG_SIZE: u64 = 1024 * 1024; // 1MB

/// Handle to the installed level filter, so the Debug setting can change it
/// while the engine runs
#[derive(Clone)]
pub struct LogLevel {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` was given and always wins
    pinned: bool,
}

impl LogLevel {
    pub fn new(handle: reload::Handle<EnvFilter, Registry>) -> Self {
        Self {
            handle,
            pinned: false,
        }
    }

    /// Switch between the `debug` and `info` default levels
    pub fn set_debug(&self, debug: bool) -> Result<(), reload::Error> {
        if self.pinned {
            tracing::debug!(target: "runner", "RUST_LOG is set, keeping its filter");
            return Ok(());
        }
        self.handle.reload(EnvFilter::new(default_level(debug)))
    }

    /// The active filter, e.g. `"debug"`
    pub fn current(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }
}

fn default_level(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

/// Initialize logging for a component.
///
/// - `component_name`: Name of the component (e.g., "run", "replay")
/// - `file_logging`: If true, also writes to `<data dir>/logs/<component>.log`.
/// - `debug`: Default level is `debug` instead of `info`. `RUST_LOG` still wins.
///
/// Logs go to stderr so stdout stays free for broadcast output.
/// The guard must be kept alive for the duration of the program.
pub fn init_logging(
    component_name: &str,
    file_logging: bool,
    debug: bool,
) -> io::Result<(LogLevel, Option<WorkerGuard>)> {
    let (env_filter, pinned) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_level(debug)), false),
    };
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    let level = LogLevel { handle, pinned };

    let stderr_layer = fmt::layer().with_writer(io::stderr).with_ansi(true);

    if file_logging {
        let log_dir = get_log_directory()?;
        fs::create_dir_all(&log_dir)?;

        let log_path = log_dir.join(format!("{}.log", component_name));

        // Truncate if over 1MB
        truncate_if_needed(&log_path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(stderr_layer)
            .with(
                fmt::layer()
                    .with_writer(non_blocking_file)
                    .with_ansi(false)
                    .with_target(true),
            )
            .init();

        tracing::info!(target: "runner", "Logging to file: {}", log_path.display());

        Ok((level, Some(guard)))
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(stderr_layer)
            .init();

        Ok((level, None))
    }
}

/// Get the log directory path.
pub fn get_log_directory() -> io::Result<PathBuf> {
    directories::ProjectDirs::from("", "", "puremessage")
        .map(|dirs| dirs.data_dir().join("logs"))
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Failed to find home directory"))
}

/// Truncate log file if it exceeds MAX_LOG_SIZE.
fn truncate_if_needed(log_path: &Path) -> io::Result<()> {
    if log_path.exists() {
        let metadata = fs::metadata(log_path)?;
        if metadata.len() > MAX_LOG_SIZE {
            let file = File::create(log_path)?;
            file.set_len(0)?;
        }
    }
    Ok(())
}
