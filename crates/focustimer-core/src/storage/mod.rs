mod config;
pub mod database;
pub mod migrations;

pub use config::{
    Config, Flag, NotificationsConfig, SettingsProvider, StatisticsConfig, TimerConfig,
    TimerType, TimerTypeUpdate, UiConfig, REST, STUDY,
};
pub use database::{
    CleanupSummary, Database, SessionFilter, SessionRecord, StatKind, TimerTypeUsage, TodoItem,
    TodoUpdate,
};

use std::path::PathBuf;

/// Returns the directory holding `config.toml` and `focustimer.db`.
///
/// `FOCUSTIMER_DATA_DIR` overrides the location outright. Otherwise
/// `~/.config/focustimer[-dev]/` is used, where the `-dev` suffix is selected
/// with `FOCUSTIMER_ENV=dev`. The directory is created if missing.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("FOCUSTIMER_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FOCUSTIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focustimer-dev")
            } else {
                base_dir.join("focustimer")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
