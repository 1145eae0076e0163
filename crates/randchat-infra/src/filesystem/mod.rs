//! Data directory layout.
//!
//! Everything randchat persists lives under one directory: the SQLite
//! database and the optional `config.toml`.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RANDCHAT_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `RANDCHAT_DATA_DIR` environment variable
/// 2. `~/.randchat`
/// 3. `.randchat` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".randchat");
    }

    PathBuf::from(".randchat")
}

/// Create the data directory if it does not exist yet.
pub async fn ensure_data_dir(data_dir: &Path) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(data_dir).await
}
