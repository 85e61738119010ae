//! Session logger — writes log output to one file per session and mirrors the
//! more important lines to stderr.
//!
//! Each call to [`init`] opens `ImageMixer_<unix-seconds>.log` inside the
//! configured log directory, or the platform data directory when none is set:
//!   Windows:  `%APPDATA%\FourierMix\`
//!   Linux:    `~/.local/share/FourierMix/`
//!   macOS:    `~/Library/Application Support/FourierMix/`
//!
//! Every level is written to the file; levels at or above the configured
//! console level are also printed to stderr.  Until `init` has run the macros
//! do nothing, so library users and tests that never initialise the logger
//! see no output.
//!
//! Usage — anywhere in the crate use `log_debug!` / `log_info!` / `log_warn!`
//! / `log_err!`, or call `crate::logger::write(...)` directly.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::MixerSettings;

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static CONSOLE_LEVEL: OnceLock<LogLevel> = OnceLock::new();

/// Severity of a log line, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Case-insensitive parse of a level name (`"warning"` is accepted for `Warn`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Write a raw line to the session log.  Silently ignores I/O errors so that
/// logging never fails a mixing operation.
pub fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Write a timestamped, level-tagged line to the session log, mirroring it to
/// stderr when the level reaches the console threshold.
pub fn write(level: LogLevel, msg: &str) {
    if LOG_FILE.get().is_none() {
        return;
    }
    let line = format!("[{}] [{}] {}", timestamp(), level.as_str(), msg);
    write_line(&line);
    if let Some(&min) = CONSOLE_LEVEL.get()
        && level >= min
    {
        eprintln!("{}", line);
    }
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::LogLevel::Debug, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::LogLevel::Info, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::LogLevel::Warn, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::LogLevel::Error, &format!($($arg)*));
    };
}

/// Initialise the session logger.  Only the first call in a process takes
/// effect.
///
/// * Creates the log directory and the session file.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the previous handler.
pub fn init(settings: &MixerSettings) {
    if LOG_FILE.get().is_some() {
        return;
    }

    let dir = settings
        .log_dir
        .clone()
        .unwrap_or_else(|| data_dir().join("FourierMix"));
    let path = session_file_path(&dir);

    if let Err(e) = fs::create_dir_all(&dir) {
        eprintln!("[logger] Failed to create log directory {:?}: {}", dir, e);
        return;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);

    match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            let _ = LOG_FILE.set(Mutex::new(f));
            let _ = CONSOLE_LEVEL.set(settings.console_level);
        }
        Err(e) => {
            // Logging stays disabled for this session
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    write_line(&format!(
        "=== FourierMix session started (unix {}) ===",
        unix_seconds()
    ));
    write_line(&format!("Log file: {}", path.display()));
    write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
}

fn session_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("ImageMixer_{}.log", unix_seconds()))
}

/// Base directory for the default log location.
fn data_dir() -> PathBuf {
    let env_dir = |key: &str| std::env::var_os(key).map(PathBuf::from);
    if cfg!(target_os = "windows")
        && let Some(dir) = env_dir("APPDATA")
    {
        return dir;
    }
    if cfg!(target_os = "macos")
        && let Some(home) = env_dir("HOME")
    {
        return home.join("Library/Application Support");
    }
    env_dir("XDG_DATA_HOME")
        .or_else(|| env_dir("HOME").map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Wall-clock time of day in UTC.
fn timestamp() -> String {
    clock_string(unix_seconds())
}

fn clock_string(unix: u64) -> String {
    let of_day = unix % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        of_day / 3_600,
        of_day % 3_600 / 60,
        of_day % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_wraps_at_midnight() {
        assert_eq!(clock_string(0), "00:00:00");
        assert_eq!(clock_string(86_399), "23:59:59");
        assert_eq!(clock_string(86_400 + 3_661), "01:01:01");
    }

    #[test]
    fn levels_parse_and_order() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" debug "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn session_file_is_named_after_the_app() {
        let path = session_file_path(Path::new("logs"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ImageMixer_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn writing_before_init_is_harmless() {
        // No session file in unit tests; must not panic.
        write(LogLevel::Error, "dropped");
    }
}
