//! Default paths for chargepool components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/chargepool/chargepool.sock` or `/tmp/chargepool-$USER/chargepool.sock`
//! - Data: `$XDG_DATA_HOME/chargepool` or `~/.local/share/chargepool`
//! - Config: `$XDG_CONFIG_HOME/chargepool/config.toml` or `~/.config/chargepool/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const CHARGEPOOL_SOCKET_ENV: &str = "CHARGEPOOL_SOCKET";

/// Environment variable for overriding the data directory
pub const CHARGEPOOL_DATA_DIR_ENV: &str = "CHARGEPOOL_DATA_DIR";

/// Environment variable for overriding the config file
pub const CHARGEPOOL_CONFIG_ENV: &str = "CHARGEPOOL_CONFIG";

const SOCKET_FILENAME: &str = "chargepool.sock";

const APP_DIR: &str = "chargepool";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$CHARGEPOOL_SOCKET`
/// 2. `$XDG_RUNTIME_DIR/chargepool/chargepool.sock`
/// 3. `/tmp/chargepool-$USER/chargepool.sock`
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(CHARGEPOOL_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Socket path ignoring `CHARGEPOOL_SOCKET`, for config defaults where the
/// env var is consulted separately.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$CHARGEPOOL_DATA_DIR`
/// 2. `$XDG_DATA_HOME/chargepool`
/// 3. `~/.local/share/chargepool`
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(CHARGEPOOL_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share").join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CHARGEPOOL_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}
