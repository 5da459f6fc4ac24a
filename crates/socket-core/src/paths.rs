//! OS-specific paths for config, logs, and the update store.

use std::env;
use std::path::PathBuf;

pub const DATA_DIR_NAME: &str = "socket";
pub const SETTINGS_FILE_NAME: &str = "settings";
pub const LOG_FILE_NAME: &str = "cli.log";

/// Per-user data directory: %LOCALAPPDATA%\socket on Windows,
/// $XDG_DATA_HOME/socket (or ~/.local/share/socket) elsewhere.
/// SOCKET_CLI_DATA_DIR overrides for tests and sandboxes.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = env::var("SOCKET_CLI_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| home_dir().join(".local").join("share"))
        .join(DATA_DIR_NAME)
}

/// Path of the persisted config blob.
pub fn settings_path() -> PathBuf {
    data_dir().join(SETTINGS_FILE_NAME)
}

pub fn log_path() -> PathBuf {
    data_dir().join(LOG_FILE_NAME)
}

pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Update-record store lives under the home dir, not the data dir, so every
/// install channel (npm wrapper, standalone binary) sees the same file.
pub fn update_store_path() -> PathBuf {
    home_dir().join(".socket").join("_socket")
}

/// Pre-migration location of the update store.
pub fn legacy_update_store_path() -> PathBuf {
    home_dir().join(".socket-update")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_and_log_live_under_data_dir() {
        assert!(settings_path().starts_with(data_dir()));
        assert!(log_path().starts_with(data_dir()));
    }

    #[test]
    fn update_store_lives_under_home() {
        let store = update_store_path();
        assert!(store.starts_with(home_dir()));
        assert!(store.ends_with(".socket/_socket") || store.ends_with("_socket"));
    }
}
