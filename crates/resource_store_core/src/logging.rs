//! Store logging bootstrap.
//!
//! # Responsibility
//! - Start rotating file logs once per process for a store deployment.
//! - Record which database the process serves when logging starts.
//! - Route panics through the log with a single-line, capped payload.
//!
//! # Invariants
//! - A second `init_logging` with identical settings is a no-op.
//! - A second `init_logging` with different settings is rejected, never applied.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "resource_store";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

/// Database the logging process serves; reported in the start event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTarget<'a> {
    Memory,
    File(&'a Path),
}

impl Display for StoreTarget<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "db_mode=memory"),
            Self::File(path) => write!(f, "db_mode=file db_path={}", path.display()),
        }
    }
}

/// Validated logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: &'static str,
    dir: PathBuf,
}

impl LogSettings {
    fn parse(level: &str, log_dir: &str) -> Result<Self, LoggingError> {
        let level = match level.trim().to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" | "warning" => "warn",
            "error" => "error",
            other => return Err(LoggingError::UnsupportedLevel(other.to_string())),
        };

        let trimmed = log_dir.trim();
        if trimmed.is_empty() {
            return Err(LoggingError::EmptyDirectory);
        }
        let dir = Path::new(trimmed);
        if !dir.is_absolute() {
            return Err(LoggingError::RelativeDirectory(dir.to_path_buf()));
        }

        Ok(Self {
            level,
            dir: dir.to_path_buf(),
        })
    }
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Failure to start store logging.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    EmptyDirectory,
    RelativeDirectory(PathBuf),
    CreateDirectory { dir: PathBuf, source: std::io::Error },
    Backend(flexi_logger::FlexiLoggerError),
    /// Logging already runs with other settings.
    Conflict { active: String, requested: String },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyDirectory => write!(f, "log directory cannot be empty"),
            Self::RelativeDirectory(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDirectory { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already initialized with {active}; refusing to switch to {requested}"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts rotating file logs under `log_dir` and logs which store this
/// process serves.
///
/// # Errors
/// - Unknown `level`, or a blank/relative `log_dir`.
/// - The directory cannot be created or the backend fails to start.
/// - Logging is already active with a different level or directory.
pub fn init_logging(level: &str, log_dir: &str, target: StoreTarget<'_>) -> Result<(), LoggingError> {
    let requested = LogSettings::parse(level, log_dir)?;

    let active = ACTIVE.get_or_try_init(|| start_logger(&requested, target))?;
    if active.settings != requested {
        return Err(LoggingError::Conflict {
            active: describe(&active.settings),
            requested: describe(&requested),
        });
    }
    Ok(())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(settings: &LogSettings, target: StoreTarget<'_>) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&settings.dir).map_err(|source| LoggingError::CreateDirectory {
        dir: settings.dir.clone(),
        source,
    })?;

    let handle = Logger::try_with_str(settings.level)
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_hook();
    info!(
        "event=store_start module=logging status=ok {target} schema_version={} version={} level={} log_dir={}",
        crate::db::migrations::latest_version(),
        env!("CARGO_PKG_VERSION"),
        settings.level,
        settings.dir.display()
    );

    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

fn describe(settings: &LogSettings) -> String {
    format!("level `{}` at `{}`", settings.level, settings.dir.display())
}

// Runs at most once: only reachable from the `ACTIVE` initializer.
fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=logging status=error location={location} payload={}",
            single_line(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous_hook(panic_info);
    }));
}

/// Panic payloads may echo request content such as resource locations.
fn single_line(value: &str, max_chars: usize) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    let mut capped: String = flattened.chars().take(max_chars).collect();
    if flattened.chars().count() > max_chars {
        capped.push_str("...");
    }
    capped
}

#[cfg(test)]
mod tests {
    use super::{init_logging, single_line, LogSettings, LoggingError, StoreTarget};
    use std::path::Path;

    #[test]
    fn settings_normalize_level_and_reject_bad_directories() {
        let settings = LogSettings::parse(" WARNING ", "/var/log/store").unwrap();
        assert_eq!(settings.level, "warn");
        assert_eq!(settings.dir, Path::new("/var/log/store"));

        assert!(matches!(
            LogSettings::parse("loud", "/tmp"),
            Err(LoggingError::UnsupportedLevel(_))
        ));
        assert!(matches!(
            LogSettings::parse("info", "  "),
            Err(LoggingError::EmptyDirectory)
        ));
        assert!(matches!(
            LogSettings::parse("info", "logs/dev"),
            Err(LoggingError::RelativeDirectory(_))
        ));
    }

    #[test]
    fn store_target_renders_db_mode() {
        assert_eq!(StoreTarget::Memory.to_string(), "db_mode=memory");
        assert_eq!(
            StoreTarget::File(Path::new("/data/resources.db")).to_string(),
            "db_mode=file db_path=/data/resources.db"
        );
    }

    #[test]
    fn single_line_flattens_and_caps() {
        let flattened = single_line("line1\nline2\rline3", 8);
        assert_eq!(flattened, "line1 li...");
        assert_eq!(single_line("short", 8), "short");
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap();
        let other_str = other.path().to_str().unwrap();

        init_logging("info", dir_str, StoreTarget::Memory).unwrap();
        init_logging("INFO", dir_str, StoreTarget::Memory).unwrap();

        assert!(matches!(
            init_logging("debug", dir_str, StoreTarget::Memory),
            Err(LoggingError::Conflict { .. })
        ));
        assert!(matches!(
            init_logging("info", other_str, StoreTarget::Memory),
            Err(LoggingError::Conflict { .. })
        ));
    }
}
