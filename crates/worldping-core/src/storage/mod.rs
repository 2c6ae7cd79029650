mod config;
pub mod database;
pub mod kv;

pub use config::{
    Config, ContentStoreConfig, GateConfig, GeoConfig, MessageConfig, StreakConfig,
};
pub use database::SqliteKv;
pub use kv::{keys, load_json_or_default, KvStore, MemoryKv};

use std::path::PathBuf;

/// Returns the WorldPing data directory, creating it if needed.
///
/// `WORLDPING_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/worldping[-dev]/`, with the `-dev` suffix chosen by
/// `WORLDPING_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("WORLDPING_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("WORLDPING_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("worldping-dev")
            } else {
                base_dir.join("worldping")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
