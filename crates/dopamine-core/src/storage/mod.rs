mod config;
pub mod document;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use config::{CheckoutConfig, Config, ProfileConfig, SessionConfig, TimerConfig};
pub use document::{
    collections, ChangeEvent, ChangeKind, Document, DocumentStore, DocumentStoreExt, FieldUpdate,
    Filter, OrderBy, Query,
};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the directory holding `config.toml` and `dopamine.db`.
///
/// `DOPAMINE_DATA_DIR` wins when set. Otherwise `~/.config/dopamine[-dev]/`,
/// with the `-dev` suffix selected by `DOPAMINE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("DOPAMINE_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("DOPAMINE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("dopamine-dev")
            } else {
                base_dir.join("dopamine")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
