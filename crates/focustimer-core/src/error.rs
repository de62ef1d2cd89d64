//! Core error types for focustimer-core.
//!
//! Errors are grouped by the layer that produces them: the timer state
//! machine, the SQLite store and the TOML configuration.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerState;

/// Core error type for focustimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Timer state machine errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors raised by the timer state machine.
///
/// None of these are fatal: a rejected operation leaves the timer exactly as
/// it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The operation is not allowed from the current state.
    #[error("cannot {op} while timer is {state}")]
    InvalidTransition { op: &'static str, state: TimerState },

    /// The requested timer type is not known to the settings provider.
    #[error("unknown timer type: {0}")]
    UnknownTimerType(String),

    /// A run must last at least one second.
    #[error("timer duration must be greater than zero")]
    ZeroDuration,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A row addressed by id does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// A timer type with this id already exists
    #[error("timer type '{0}' already exists")]
    DuplicateTimerType(String),

    /// Built-in timer types cannot be removed
    #[error("timer type '{0}' is built in and cannot be removed")]
    ProtectedTimerType(String),

    /// No timer type with this id
    #[error("unknown timer type: {0}")]
    UnknownTimerType(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}
