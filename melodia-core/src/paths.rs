//! Path constants for configuration, persisted state and log files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "melodia";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the persisted key/value state file
pub const STATE_FILE_NAME: &str = "state.json";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "melodia.log";

/// Get the configuration directory path (~/.config/melodia/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/melodia/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the persisted state path (`~/.config/melodia/state.json`)
#[must_use]
pub fn state_path() -> PathBuf {
    config_dir().join(STATE_FILE_NAME)
}

/// Get the log file path (`~/.config/melodia/melodia.log`)
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}
