//! # Focustimer Core Library
//!
//! Core business logic for the focustimer Pomodoro timer. The `focustimer`
//! CLI is a thin shell over this crate; everything it does goes through the
//! types exported here.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-driven state machine. The caller (normally the
//!   [`TimerDriver`]) invokes `tick()` once per second while it runs.
//! - **Session**: the recorder turns finished runs into persisted sessions;
//!   [`TimerService`] wires the engine, recorder, store, settings and event
//!   sink together.
//! - **Storage**: SQLite session/statistics/todo storage and TOML configuration.
//! - **Stats**: pure per-day aggregation of sessions.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerService`]: Engine plus best-effort session recording
//! - [`Database`]: Session and statistics persistence
//! - [`Config`]: Application configuration and [`SettingsProvider`]

pub mod error;
pub mod events;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, TimerError};
pub use events::{Event, EventSink};
pub use session::{RecordedSession, RecorderPolicy, SessionRecorder, SessionStore, TimerService};
pub use stats::{compute_daily_aggregate, DailyAggregate, TypeAggregate};
pub use storage::{Config, Database, Flag, SessionRecord, SettingsProvider, TimerType};
pub use timer::{
    format_time, Clock, ManualClock, SystemClock, TimerDriver, TimerEngine, TimerSnapshot,
    TimerState,
};
