//! Log output selection.
//!
//! Stdout carries query results, so logs never go there: they go to stderr,
//! or to a file with `--log-file`. Verbosity follows `RUST_LOG`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "surreal-bridge.log";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Truncated on every run.
    File(PathBuf),
}

impl LogTarget {
    /// Maps the `--log-file [PATH]` flag: absent means stderr, present
    /// without a path means [`default_log_path`].
    pub fn from_flag(flag: Option<Option<PathBuf>>) -> Self {
        match flag {
            None => LogTarget::Stderr,
            Some(path) => LogTarget::File(path.unwrap_or_else(default_log_path)),
        }
    }
}

/// Installs the global subscriber. A log file that cannot be opened is
/// reported on stderr and logging falls back to stderr.
pub fn init(target: LogTarget) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());

    let file = match &target {
        LogTarget::Stderr => None,
        LogTarget::File(path) => match open_log_file(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: cannot log to {}: {e}", path.display());
                None
            }
        },
    };

    match file {
        Some(file) => builder.with_writer(Mutex::new(file)).with_ansi(false).init(),
        None => builder.with_writer(io::stderr).init(),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

/// `surreal-bridge.log` under the state directory, else the config
/// directory, else the temp directory.
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("surreal-bridge").join(LOG_FILE_NAME))
        .unwrap_or_else(|| std::env::temp_dir().join(LOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_target_from_flag() {
        assert_eq!(LogTarget::from_flag(None), LogTarget::Stderr);
        assert_eq!(
            LogTarget::from_flag(Some(Some(PathBuf::from("/tmp/bridge.log")))),
            LogTarget::File(PathBuf::from("/tmp/bridge.log"))
        );
        assert_eq!(
            LogTarget::from_flag(Some(None)),
            LogTarget::File(default_log_path())
        );
    }

    #[test]
    fn test_default_log_path() {
        let path = default_log_path();
        assert!(path.is_absolute());
        assert!(path.ends_with(LOG_FILE_NAME));
    }

    #[test]
    fn test_open_log_file_creates_directories_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join(LOG_FILE_NAME);

        let mut file = open_log_file(&path).unwrap();
        writeln!(file, "first run").unwrap();
        drop(file);

        open_log_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_open_log_file_fails_under_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        assert!(open_log_file(&blocker.join(LOG_FILE_NAME)).is_err());
    }
}
