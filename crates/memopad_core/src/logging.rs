//! File-based logging bootstrap.
//!
//! # Responsibility
//! - Start rolling file logs exactly once per process.
//!
//! # Invariants
//! - Repeating `init_logging` with the identical level and directory is a
//!   no-op; any other repeat is rejected.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "memopad";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 4;

static ACTIVE: OnceCell<ActiveLogging> = OnceCell::new();

/// Failure starting or re-checking the logging backend.
#[derive(Debug)]
pub enum LoggingError {
    /// The requested level is not one of trace|debug|info|warn|error.
    UnknownLevel(String),
    /// The log directory is empty or not an absolute path.
    InvalidLogDir(String),
    /// The log directory could not be created.
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    /// The logger backend refused to start.
    Backend(String),
    /// Logging is already active with a different configuration.
    AlreadyActive {
        setting: &'static str,
        active: String,
        requested: String,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidLogDir(dir) => {
                write!(f, "log_dir must be a non-empty absolute path, got `{dir}`")
            }
            Self::CreateDir { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
            Self::AlreadyActive {
                setting,
                active,
                requested,
            } => write!(
                f,
                "logging already active with {setting} `{active}`; refusing to switch to `{requested}`"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogConfig {
    level: &'static str,
    dir: PathBuf,
}

impl LogConfig {
    fn parse(level: &str, log_dir: &str) -> Result<Self, LoggingError> {
        Ok(Self {
            level: parse_level(level)?,
            dir: parse_log_dir(log_dir)?,
        })
    }
}

struct ActiveLogging {
    config: LogConfig,
    _handle: LoggerHandle,
}

impl ActiveLogging {
    fn start(config: LogConfig) -> Result<Self, LoggingError> {
        std::fs::create_dir_all(&config.dir).map_err(|source| LoggingError::CreateDir {
            dir: config.dir.clone(),
            source,
        })?;

        let handle = Logger::try_with_str(config.level)
            .map_err(|err| LoggingError::Backend(err.to_string()))?
            .log_to_file(
                FileSpec::default()
                    .directory(&config.dir)
                    .basename(LOG_BASENAME),
            )
            .rotate(
                Criterion::Size(ROTATE_AT_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(KEEP_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| LoggingError::Backend(err.to_string()))?;

        info!(
            "event=log_init module=logging status=ok level={} log_dir={} version={}",
            config.level,
            config.dir.display(),
            env!("CARGO_PKG_VERSION")
        );

        Ok(Self {
            config,
            _handle: handle,
        })
    }

    fn ensure_matches(&self, requested: &LogConfig) -> Result<(), LoggingError> {
        if self.config.dir != requested.dir {
            return Err(LoggingError::AlreadyActive {
                setting: "log_dir",
                active: self.config.dir.display().to_string(),
                requested: requested.dir.display().to_string(),
            });
        }
        if self.config.level != requested.level {
            return Err(LoggingError::AlreadyActive {
                setting: "level",
                active: self.config.level.to_string(),
                requested: requested.level.to_string(),
            });
        }
        Ok(())
    }
}

/// Starts rolling file logs at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - Unsupported level, relative/empty directory, or unwritable directory.
/// - A previous initialization with a different level or directory.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    let requested = LogConfig::parse(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| ActiveLogging::start(requested.clone()))?;
    active.ensure_matches(&requested)
}

/// Returns `(level, log_dir)` when logging is active.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.config.level, active.config.dir.clone()))
}

/// Default level per build mode: `debug` when debug assertions are on,
/// `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn parse_level(raw: &str) -> Result<&'static str, LoggingError> {
    const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

    let mut lowered = raw.trim().to_ascii_lowercase();
    if lowered == "warning" {
        lowered = "warn".to_string();
    }
    LEVELS
        .iter()
        .find(|&&level| level == lowered)
        .copied()
        .ok_or_else(|| LoggingError::UnknownLevel(raw.to_string()))
}

fn parse_log_dir(raw: &str) -> Result<PathBuf, LoggingError> {
    let trimmed = raw.trim();
    let path = Path::new(trimmed);
    if trimmed.is_empty() || !path.is_absolute() {
        return Err(LoggingError::InvalidLogDir(raw.to_string()));
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, parse_level, parse_log_dir, LoggingError};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("memopad-log-{tag}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn parse_level_normalizes_case_whitespace_and_warning_alias() {
        assert_eq!(parse_level("INFO").unwrap(), "info");
        assert_eq!(parse_level(" warning ").unwrap(), "warn");
        assert!(matches!(
            parse_level("loud"),
            Err(LoggingError::UnknownLevel(_))
        ));
    }

    #[test]
    fn parse_log_dir_requires_absolute_path() {
        assert!(matches!(
            parse_log_dir("logs/dev"),
            Err(LoggingError::InvalidLogDir(_))
        ));
        assert!(matches!(
            parse_log_dir(""),
            Err(LoggingError::InvalidLogDir(_))
        ));
    }

    #[test]
    fn repeat_init_is_noop_for_same_config_and_rejected_otherwise() {
        let first = scratch_dir("first");
        let first_str = first.to_str().unwrap().to_string();
        let other = scratch_dir("other");
        let other_str = other.to_str().unwrap().to_string();

        init_logging("info", &first_str).unwrap();
        init_logging("info", &first_str).unwrap();

        assert!(matches!(
            init_logging("debug", &first_str),
            Err(LoggingError::AlreadyActive { setting: "level", .. })
        ));
        assert!(matches!(
            init_logging("info", &other_str),
            Err(LoggingError::AlreadyActive { setting: "log_dir", .. })
        ));

        let (level, dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(dir, first);
    }
}
